//! Score (input) model.
//!
//! A score is a set of voices; each voice is an ordered sequence of pitched
//! events. Rests are implicit: they are the gaps between one event's end and
//! the next event's onset. The core never mutates a score.
//!
//! # Time Representation
//! Onsets and durations are in quarter notes relative to the start of the
//! piece. Measures are numbered from 1.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ArrangeError, Result};

/// A single pitched event (note, or the top note of a chord).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Pitch in semitones (MIDI numbering, fractional for microtones).
    pub pitch: f64,
    /// Onset in quarter notes from the start of the piece.
    pub offset: f64,
    /// Duration in quarter notes.
    pub duration: f64,
    /// Measure number containing the onset (1-based).
    pub measure: u32,
}

impl NoteEvent {
    /// Creates a new event.
    pub fn new(pitch: f64, offset: f64, duration: f64, measure: u32) -> Self {
        Self {
            pitch,
            offset,
            duration,
            measure,
        }
    }

    /// End of the event (offset + duration).
    #[inline]
    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }
}

/// One voice (part) of a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    /// Human-readable name (instrument or part label).
    #[serde(default)]
    pub name: String,
    /// Pitched events ordered by onset.
    pub events: Vec<NoteEvent>,
}

impl Voice {
    /// Creates an empty voice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the voice name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends an event.
    pub fn with_event(mut self, event: NoteEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Appends an event in place.
    pub fn push(&mut self, event: NoteEvent) {
        self.events.push(event);
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the voice has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pitch of every event, in order.
    pub fn pitches(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.pitch).collect()
    }

    /// Measure number of every event, in order.
    pub fn measures(&self) -> Vec<u32> {
        self.events.iter().map(|e| e.measure).collect()
    }

    /// Last measure containing an event.
    pub fn last_measure(&self) -> Option<u32> {
        self.events.iter().map(|e| e.measure).max()
    }

    /// Events whose measure lies in `[start, end]`.
    pub fn events_in_measures(&self, start: u32, end: u32) -> impl Iterator<Item = &NoteEvent> {
        self.events
            .iter()
            .filter(move |e| e.measure >= start && e.measure <= end)
    }

    /// Whether any event lies in measures `[start, end]`.
    pub fn has_events_in(&self, start: u32, end: u32) -> bool {
        self.events_in_measures(start, end).next().is_some()
    }
}

/// A multi-voice score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Voices (parts), indexed from 0.
    pub voices: Vec<Voice>,
    /// Number of measures in the score.
    pub measure_count: u32,
}

impl Score {
    /// Creates an empty score with the given number of measures.
    pub fn new(measure_count: u32) -> Self {
        Self {
            voices: Vec::new(),
            measure_count,
        }
    }

    /// Adds a voice.
    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voices.push(voice);
        self
    }

    /// Number of voices.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Returns a voice by index.
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Last measure of the score: the declared count or the last measure
    /// holding an event, whichever is larger.
    pub fn max_measure(&self) -> u32 {
        self.voices
            .iter()
            .filter_map(Voice::last_measure)
            .max()
            .unwrap_or(0)
            .max(self.measure_count)
    }

    /// Keeps only the first `measures` measures of every voice.
    pub fn truncated(&self, measures: u32) -> Self {
        let voices = self
            .voices
            .iter()
            .map(|v| Voice {
                name: v.name.clone(),
                events: v
                    .events
                    .iter()
                    .filter(|e| e.measure <= measures)
                    .copied()
                    .collect(),
            })
            .collect();
        Self {
            voices,
            measure_count: self.measure_count.min(measures),
        }
    }

    /// Loads a score from a JSON file.
    ///
    /// A missing file is [`ArrangeError::MissingScore`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ArrangeError::MissingScore(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the score as JSON.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_voice() -> Voice {
        Voice::new()
            .with_name("Violin")
            .with_event(NoteEvent::new(60.0, 0.0, 1.0, 1))
            .with_event(NoteEvent::new(62.0, 1.0, 1.0, 1))
            .with_event(NoteEvent::new(64.0, 4.0, 2.0, 2))
            .with_event(NoteEvent::new(65.0, 12.0, 4.0, 4))
    }

    #[test]
    fn test_voice_queries() {
        let v = sample_voice();
        assert_eq!(v.len(), 4);
        assert_eq!(v.pitches(), vec![60.0, 62.0, 64.0, 65.0]);
        assert_eq!(v.measures(), vec![1, 1, 2, 4]);
        assert_eq!(v.last_measure(), Some(4));
        assert_eq!(v.events_in_measures(1, 2).count(), 3);
        assert!(!v.has_events_in(3, 3));
        assert!(v.has_events_in(3, 4));
    }

    #[test]
    fn test_event_end() {
        let e = NoteEvent::new(60.0, 2.5, 1.5, 1);
        assert!((e.end() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_max_measure() {
        let s = Score::new(3).with_voice(sample_voice());
        assert_eq!(s.max_measure(), 4);
        assert_eq!(Score::new(8).with_voice(Voice::new()).max_measure(), 8);
    }

    #[test]
    fn test_score_truncated() {
        let s = Score::new(4).with_voice(sample_voice());
        let t = s.truncated(2);
        assert_eq!(t.measure_count, 2);
        assert_eq!(t.voices[0].len(), 3);
        assert_eq!(t.voices[0].name, "Violin");
    }

    #[test]
    fn test_missing_score_file() {
        let err = Score::from_json_file("/nonexistent/score.json").unwrap_err();
        assert!(matches!(err, ArrangeError::MissingScore(_)));
    }

    #[test]
    fn test_json_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.json");
        let s = Score::new(4).with_voice(sample_voice());
        s.to_json_file(&path).unwrap();
        assert_eq!(Score::from_json_file(&path).unwrap(), s);
    }
}
