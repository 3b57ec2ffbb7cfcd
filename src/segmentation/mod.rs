//! Phrase segmentation.
//!
//! Turns each voice of a score into a length-bounded partition of phrases:
//!
//! - **`features`**: pitch, timing and rest features and the combined
//!   boundary-strength signal (`BoundaryDetector`)
//! - **`segmenter`**: adaptive-threshold peak picking (`PhraseSegmenter`)
//! - **`cache`**: on-disk phrase cache keyed by segmentation inputs
//!
//! # References
//!
//! - Cambouropoulos (2001), "The Local Boundary Detection Model (LBDM)"
//! - Lerdahl & Jackendoff (1983), "A Generative Theory of Tonal Music"

mod cache;
mod features;
mod segmenter;

pub use cache::{PhraseCache, cache_key};
pub use features::{
    BoundaryDetector, BoundaryWeights, boundary_strength, degree_of_change,
    inter_onset_intervals, pitch_intervals, rest_lengths,
};
pub use segmenter::{
    PhraseSegmenter, SegmenterConfig, Segmentation, consecutive_runs, drop_silent, find_peaks,
    peaks_to_phrases, split_long_phrases,
};
