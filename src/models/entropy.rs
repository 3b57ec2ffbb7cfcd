//! Shannon entropy of feature series.
//!
//! Used as an informativeness proxy for phrase weights: a phrase whose
//! pitches and inter-onset intervals vary a lot carries more information
//! than a repeated figure.

use super::Voice;

/// Shannon entropy (natural log) of the empirical distribution of values.
///
/// Values are compared exactly. Empty and single-valued series have
/// entropy 0.
pub fn shannon_entropy(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mut entropy = 0.0;
    for run in sorted.chunk_by(|a, b| a == b) {
        let p = run.len() as f64 / n;
        entropy -= p * p.ln();
    }
    // A single distinct value yields -0.0
    entropy.max(0.0)
}

/// Weight of the measure range `[start, end]` of a voice:
/// entropy of its pitches plus entropy of its inter-onset intervals.
pub fn phrase_entropy(voice: &Voice, start: u32, end: u32) -> f64 {
    let events: Vec<_> = voice.events_in_measures(start, end).collect();
    let pitches: Vec<f64> = events.iter().map(|e| e.pitch).collect();
    let ioi: Vec<f64> = events
        .windows(2)
        .map(|w| w[1].offset - w[0].offset)
        .collect();
    shannon_entropy(&pitches) + shannon_entropy(&ioi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteEvent;

    #[test]
    fn test_entropy_constant_series() {
        assert_eq!(shannon_entropy(&[4.0, 4.0, 4.0]), 0.0);
        assert_eq!(shannon_entropy(&[7.0]), 0.0);
        assert_eq!(shannon_entropy(&[]), 0.0);
    }

    #[test]
    fn test_entropy_uniform() {
        let e = shannon_entropy(&[1.0, 2.0, 3.0, 4.0]);
        assert!((e - 4.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_skewed() {
        // p = {3/4, 1/4}
        let e = shannon_entropy(&[1.0, 1.0, 1.0, 2.0]);
        let expected = -(0.75 * 0.75_f64.ln() + 0.25 * 0.25_f64.ln());
        assert!((e - expected).abs() < 1e-12);
    }

    #[test]
    fn test_phrase_entropy() {
        let v = Voice::new()
            .with_event(NoteEvent::new(60.0, 0.0, 1.0, 1))
            .with_event(NoteEvent::new(62.0, 1.0, 1.0, 1))
            .with_event(NoteEvent::new(60.0, 2.0, 1.0, 1))
            .with_event(NoteEvent::new(70.0, 8.0, 1.0, 3));

        // measure 1: pitches {60, 62, 60}, ioi {1, 1}
        let e = phrase_entropy(&v, 1, 1);
        let expected = shannon_entropy(&[60.0, 62.0, 60.0]);
        assert!((e - expected).abs() < 1e-12);

        // measure 2 is empty
        assert_eq!(phrase_entropy(&v, 2, 2), 0.0);
    }
}
