//! Adaptive-threshold phrase segmentation.
//!
//! # Algorithm
//!
//! Peaks of the boundary signal above a threshold `τ` become phrase
//! boundaries. `τ` is found by bisection over `[min nonzero, max]`:
//!
//! 1. No peak at `τ`: lower `hi` to `τ`. When the bracket collapses, return
//!    the best partition found so far, or the no-peak fallback.
//! 2. Peaks found and the longest phrase fits the length bound: remember the
//!    partition, raise `lo` to `τ` (fewer, longer phrases are preferred) and
//!    stop once `hi - τ < ε`.
//! 3. Peaks found but a phrase is too long: lower `hi` to `τ`. When the
//!    bracket collapses without any satisfying partition, the bound is
//!    relaxed by one measure and the search restarts, at most
//!    `max_escalations` times.
//!
//! The no-peak fallback splits the voice at multi-measure rests: each
//! maximal run of consecutive measures holding events is one phrase, cut
//! into chunks of at most the current length bound.
//!
//! # Complexity
//! O(n · log((max - min) / ε)) per escalation, n = signal length.

use serde::{Deserialize, Serialize};

use super::features::{BoundaryDetector, BoundaryWeights};
use crate::models::{Phrase, Score, Voice, longest_phrase};

/// Threshold-search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Upper bound on phrase length, in measures.
    pub max_phrase_len: u32,
    /// Bracket width at which the bisection stops.
    pub epsilon: f64,
    /// How many times the length bound may be relaxed by one measure.
    pub max_escalations: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_phrase_len: 4,
            epsilon: 1e-5,
            max_escalations: 32,
        }
    }
}

/// Outcome of segmenting one voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Phrases in measure order.
    pub phrases: Vec<Phrase>,
    /// Threshold that produced the phrases (`None` for the fallback).
    pub threshold: Option<f64>,
    /// Length bound in force when the search ended.
    pub max_phrase_len: u32,
    /// Number of times the bound was relaxed.
    pub escalations: u32,
    /// Whether the search gave up after `max_escalations`.
    pub escalations_exhausted: bool,
}

impl Segmentation {
    fn fallback(measures: &[u32], voice: usize, max_phrase_len: u32) -> Self {
        Self {
            phrases: split_long_phrases(consecutive_runs(measures, voice), max_phrase_len),
            threshold: None,
            max_phrase_len,
            escalations: 0,
            escalations_exhausted: false,
        }
    }
}

/// Interior local maxima of `bs` reaching `threshold`.
pub fn find_peaks(bs: &[f64], threshold: f64) -> Vec<usize> {
    if bs.len() < 3 {
        return Vec::new();
    }
    (1..bs.len() - 1)
        .filter(|&i| bs[i] > bs[i + 1] && bs[i - 1] < bs[i] && bs[i] >= threshold)
        .collect()
}

/// Maps peak indices to phrases.
///
/// Each peak index is mapped to the measure of the event at that index; the
/// distinct boundary measures close phrases. The next phrase starts at the
/// first measure after a boundary that holds an event. A trailing phrase
/// covers whatever follows the last boundary.
pub fn peaks_to_phrases(measures: &[u32], peaks: &[usize], voice: usize) -> Vec<Phrase> {
    let (Some(&first), Some(&last)) = (measures.first(), measures.iter().max()) else {
        return Vec::new();
    };
    let mut boundaries: Vec<u32> = peaks.iter().filter_map(|&p| measures.get(p).copied()).collect();
    boundaries.sort_unstable();
    boundaries.dedup();
    let Some(&last_boundary) = boundaries.last() else {
        return consecutive_runs(measures, voice);
    };

    let next_non_empty = |from: u32| measures.iter().copied().filter(|&m| m >= from).min();

    let mut phrases = Vec::with_capacity(boundaries.len() + 1);
    phrases.push(Phrase::new(first, boundaries[0], voice));
    for pair in boundaries.windows(2) {
        let start = next_non_empty(pair[0] + 1).unwrap_or(pair[1]);
        phrases.push(Phrase::new(start, pair[1], voice));
    }
    if last_boundary < last {
        if let Some(start) = next_non_empty(last_boundary + 1) {
            phrases.push(Phrase::new(start, last, voice));
        }
    }
    phrases
}

/// Splits the distinct measures into maximal runs of consecutive integers.
pub fn consecutive_runs(measures: &[u32], voice: usize) -> Vec<Phrase> {
    let mut distinct = measures.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let mut phrases = Vec::new();
    let Some(&first) = distinct.first() else {
        return phrases;
    };
    let mut run_start = first;
    for pair in distinct.windows(2) {
        if pair[1] - pair[0] != 1 {
            phrases.push(Phrase::new(run_start, pair[0], voice));
            run_start = pair[1];
        }
    }
    phrases.push(Phrase::new(run_start, distinct[distinct.len() - 1], voice));
    phrases
}

/// Cuts every phrase longer than `max_len` into consecutive chunks of
/// `max_len` measures (the last chunk may be shorter).
pub fn split_long_phrases(phrases: Vec<Phrase>, max_len: u32) -> Vec<Phrase> {
    let max_len = max_len.max(1);
    let mut out = Vec::with_capacity(phrases.len());
    for p in phrases {
        let mut start = p.start_measure;
        while p.end_measure - start >= max_len {
            out.push(Phrase::new(start, start + max_len - 1, p.voice));
            start += max_len;
        }
        out.push(Phrase::new(start, p.end_measure, p.voice));
    }
    out
}

/// Drops phrases whose measure range holds no event of the voice.
pub fn drop_silent(phrases: Vec<Phrase>, voice: &Voice) -> Vec<Phrase> {
    phrases
        .into_iter()
        .filter(|p| voice.has_events_in(p.start_measure, p.end_measure))
        .collect()
}

/// Length-bounded phrase segmenter.
///
/// # Example
///
/// ```
/// use u_arrange::segmentation::{PhraseSegmenter, SegmenterConfig};
///
/// let bs = [0.1, 0.5, 0.1, 0.1, 0.6, 0.1, 0.1];
/// let measures = [1, 1, 2, 2, 3, 3, 4, 4, 5];
/// let seg = PhraseSegmenter::new(SegmenterConfig::default()).segment(&bs, &measures, 0);
/// assert!(seg.phrases.iter().all(|p| p.len() <= seg.max_phrase_len));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PhraseSegmenter {
    config: SegmenterConfig,
    detector: BoundaryDetector,
}

impl PhraseSegmenter {
    /// Creates a segmenter with default boundary weights.
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            detector: BoundaryDetector::default(),
        }
    }

    /// Sets the boundary feature weights.
    pub fn with_weights(mut self, weights: BoundaryWeights) -> Self {
        self.detector = BoundaryDetector::new(weights);
        self
    }

    /// Search parameters.
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Boundary detector in use.
    pub fn detector(&self) -> &BoundaryDetector {
        &self.detector
    }

    /// Segments a boundary signal.
    ///
    /// `measures[i]` is the measure of event `i`; `bs[i]` is aligned to the
    /// same index. An empty `measures` yields no phrases.
    pub fn segment(&self, bs: &[f64], measures: &[u32], voice: usize) -> Segmentation {
        let mut limit = self.config.max_phrase_len;
        if measures.is_empty() {
            return Segmentation {
                phrases: Vec::new(),
                threshold: None,
                max_phrase_len: limit,
                escalations: 0,
                escalations_exhausted: false,
            };
        }
        let Some((lo0, hi0)) = search_range(bs) else {
            return Segmentation::fallback(measures, voice, limit);
        };

        let eps = self.config.epsilon;
        let (mut lo, mut hi) = (lo0, hi0);
        let mut tau = (lo + hi) / 2.0;
        let mut escalations = 0;
        let mut best: Option<(f64, Vec<Phrase>)> = None;
        let mut finest: Option<(f64, Vec<Phrase>)> = None;

        let done =
            |threshold: f64, phrases: Vec<Phrase>, limit: u32, escalations: u32| Segmentation {
                phrases,
                threshold: Some(threshold),
                max_phrase_len: limit,
                escalations,
                escalations_exhausted: false,
            };

        loop {
            let peaks = find_peaks(bs, tau);
            if peaks.is_empty() {
                hi = tau;
                tau = (lo + hi) / 2.0;
                if hi - lo < eps {
                    return match best {
                        Some((t, phrases)) => done(t, phrases, limit, escalations),
                        None => Segmentation {
                            escalations,
                            ..Segmentation::fallback(measures, voice, limit)
                        },
                    };
                }
                continue;
            }

            let phrases = peaks_to_phrases(measures, &peaks, voice);
            if finest.as_ref().is_none_or(|(t, _)| tau < *t) {
                finest = Some((tau, phrases.clone()));
            }

            if longest_phrase(&phrases) <= limit {
                log::debug!("voice {voice}: threshold {tau:.6} satisfies bound {limit}");
                best = Some((tau, phrases));
                lo = tau;
                tau = (lo + hi) / 2.0;
                if hi - tau < eps {
                    if let Some((t, phrases)) = best {
                        return done(t, phrases, limit, escalations);
                    }
                }
            } else {
                hi = tau;
                tau = (lo + hi) / 2.0;
                if hi - lo < eps {
                    if let Some((t, phrases)) = best {
                        return done(t, phrases, limit, escalations);
                    }
                    if escalations >= self.config.max_escalations {
                        log::warn!(
                            "voice {voice}: no threshold satisfies bound {limit} after {escalations} escalations"
                        );
                        let (t, phrases) = finest.unwrap_or((tau, Vec::new()));
                        return Segmentation {
                            phrases,
                            threshold: Some(t),
                            max_phrase_len: limit,
                            escalations,
                            escalations_exhausted: true,
                        };
                    }
                    escalations += 1;
                    limit += 1;
                    log::debug!("voice {voice}: relaxing phrase bound to {limit}");
                    lo = lo0;
                    hi = hi0;
                    tau = (lo + hi) / 2.0;
                }
            }
        }
    }

    /// Detects boundaries in a voice, segments it and drops silent phrases.
    pub fn segment_voice(&self, voice: &Voice, voice_index: usize) -> Segmentation {
        let bs = self.detector.detect(voice);
        let mut seg = self.segment(&bs, &voice.measures(), voice_index);
        seg.phrases = drop_silent(seg.phrases, voice);
        seg
    }

    /// Segments every voice of a score.
    pub fn segment_score(&self, score: &Score) -> Vec<Segmentation> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            score
                .voices
                .par_iter()
                .enumerate()
                .map(|(i, v)| self.segment_voice(v, i))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            score
                .voices
                .iter()
                .enumerate()
                .map(|(i, v)| self.segment_voice(v, i))
                .collect()
        }
    }
}

/// `(min nonzero, max)` over the finite values of the signal.
fn search_range(bs: &[f64]) -> Option<(f64, f64)> {
    let finite = bs.iter().copied().filter(|x| x.is_finite());
    let lo = finite.clone().filter(|&x| x != 0.0).fold(f64::INFINITY, f64::min);
    let hi = finite.fold(f64::NEG_INFINITY, f64::max);
    (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
}
