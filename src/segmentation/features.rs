//! Boundary-strength detection.
//!
//! For every pair of consecutive events three features are extracted:
//!
//! | Feature | Definition |
//! |---------|-----------|
//! | Pitch interval | `abs(semitone difference) + 1` |
//! | Inter-onset interval | `onset[k+1] - onset[k]` |
//! | Rest length | `max(0, onset[k+1] - onset[k] - duration[k]) + 1` |
//!
//! Each series `F` is turned into a degree-of-change series
//! `doc[k] = |F[k] - F[k-1]| / (F[k] + F[k-1])` (with `doc[0] = 0`, and 0
//! where the denominator vanishes), then into a local strength series
//! `s[j] = F[j+1] * (doc[j] + doc[j+1])` normalised to unit sum. The boundary
//! signal is the weighted sum of the three normalised series.
//!
//! # Reference
//! Cambouropoulos (2001), "The Local Boundary Detection Model (LBDM)"

use serde::{Deserialize, Serialize};

use crate::models::Voice;

/// Relative weights of the three feature strengths.
///
/// Expected to sum to 1; this is not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryWeights {
    /// Pitch-interval weight.
    pub pitch: f64,
    /// Inter-onset-interval weight.
    pub ioi: f64,
    /// Rest-length weight.
    pub rest: f64,
}

impl Default for BoundaryWeights {
    fn default() -> Self {
        Self {
            pitch: 0.25,
            ioi: 0.5,
            rest: 0.25,
        }
    }
}

impl BoundaryWeights {
    /// Creates a weight set.
    pub fn new(pitch: f64, ioi: f64, rest: f64) -> Self {
        Self { pitch, ioi, rest }
    }

    /// Sum of the three weights.
    pub fn total(&self) -> f64 {
        self.pitch + self.ioi + self.rest
    }
}

/// Pitch intervals between consecutive events.
pub fn pitch_intervals(voice: &Voice) -> Vec<f64> {
    voice
        .events
        .windows(2)
        .map(|w| (w[1].pitch - w[0].pitch).abs() + 1.0)
        .collect()
}

/// Inter-onset intervals between consecutive events.
pub fn inter_onset_intervals(voice: &Voice) -> Vec<f64> {
    voice
        .events
        .windows(2)
        .map(|w| w[1].offset - w[0].offset)
        .collect()
}

/// Rest lengths between consecutive events (shifted by 1).
pub fn rest_lengths(voice: &Voice) -> Vec<f64> {
    voice
        .events
        .windows(2)
        .map(|w| (w[1].offset - w[0].offset - w[0].duration).max(0.0) + 1.0)
        .collect()
}

/// Degree of change between neighbouring values of a series.
///
/// Same length as the input; `doc[0] = 0`. A zero denominator yields 0.
pub fn degree_of_change(series: &[f64]) -> Vec<f64> {
    if series.is_empty() {
        return Vec::new();
    }
    let mut doc = Vec::with_capacity(series.len());
    doc.push(0.0);
    for w in series.windows(2) {
        let denom = w[0] + w[1];
        doc.push(if denom == 0.0 {
            0.0
        } else {
            (w[1] - w[0]).abs() / denom
        });
    }
    doc
}

/// Normalised local boundary strength of a feature series.
///
/// One element shorter than the input. Left unnormalised when the
/// strengths sum to zero.
pub fn boundary_strength(series: &[f64]) -> Vec<f64> {
    if series.len() < 2 {
        return Vec::new();
    }
    let doc = degree_of_change(series);
    let mut strength: Vec<f64> = (0..series.len() - 1)
        .map(|j| series[j + 1] * (doc[j] + doc[j + 1]))
        .collect();

    let sum: f64 = strength.iter().sum();
    if sum != 0.0 {
        for s in &mut strength {
            *s /= sum;
        }
    }
    strength
}

/// Computes per-voice boundary-strength signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryDetector {
    weights: BoundaryWeights,
}

impl BoundaryDetector {
    /// Creates a detector with the given feature weights.
    pub fn new(weights: BoundaryWeights) -> Self {
        Self { weights }
    }

    /// Feature weights in use.
    pub fn weights(&self) -> &BoundaryWeights {
        &self.weights
    }

    /// Combined boundary signal of a voice.
    ///
    /// Length is `events - 2` (empty for voices with fewer than 3 events).
    pub fn detect(&self, voice: &Voice) -> Vec<f64> {
        let pitch = boundary_strength(&pitch_intervals(voice));
        let ioi = boundary_strength(&inter_onset_intervals(voice));
        let rest = boundary_strength(&rest_lengths(voice));

        pitch
            .iter()
            .zip(&ioi)
            .zip(&rest)
            .map(|((p, i), r)| {
                self.weights.pitch * p + self.weights.ioi * i + self.weights.rest * r
            })
            .collect()
    }
}
