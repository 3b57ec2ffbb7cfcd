//! Input validation for reduction problems.
//!
//! Checks structural integrity of scores and job collections before
//! segmentation and encoding. Detects:
//! - Non-finite pitches, offsets, durations and weights
//! - Negative durations
//! - Events out of time or measure order within a voice
//! - Measure numbers outside `1..=measure_count`
//! - Jobs with empty or negative-time intervals
//!
//! All problems are collected; nothing stops at the first error.

use serde::{Deserialize, Serialize};

use crate::models::{JobCollection, Score};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// A NaN or infinite number.
    NonFiniteValue,
    /// An event with negative duration.
    NegativeDuration,
    /// An event starts before its predecessor or sits in an earlier measure.
    UnorderedEvents,
    /// A measure number of 0 or past the end of the score.
    InvalidMeasure,
    /// A job whose interval is empty or starts before time 0.
    InvalidInterval,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates a score.
///
/// Checks, per voice:
/// 1. Pitch, offset and duration are finite
/// 2. Durations are non-negative
/// 3. Offsets and measure numbers never decrease
/// 4. Measure numbers are at least 1 and, when the score declares a measure
///    count, at most that count
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_score(score: &Score) -> ValidationResult {
    let mut errors = Vec::new();

    for (v, voice) in score.voices.iter().enumerate() {
        let mut previous: Option<(f64, u32)> = None;
        for (k, e) in voice.events.iter().enumerate() {
            if ![e.pitch, e.offset, e.duration].iter().all(|x| x.is_finite()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NonFiniteValue,
                    format!("Voice {v} event {k} has a non-finite value"),
                ));
                continue;
            }
            if e.duration < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NegativeDuration,
                    format!("Voice {v} event {k} has duration {}", e.duration),
                ));
            }
            if e.measure == 0 || (score.measure_count > 0 && e.measure > score.measure_count) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidMeasure,
                    format!(
                        "Voice {v} event {k} is in measure {} (score has {})",
                        e.measure, score.measure_count
                    ),
                ));
            }
            if let Some((offset, measure)) = previous {
                if e.offset < offset || e.measure < measure {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnorderedEvents,
                        format!("Voice {v} event {k} precedes event {}", k - 1),
                    ));
                }
            }
            previous = Some((e.offset, e.measure));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a job collection.
///
/// Checks:
/// 1. Every weight is finite
/// 2. Every interval satisfies `0 <= start < end`
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_jobs(jobs: &JobCollection) -> ValidationResult {
    let mut errors = Vec::new();

    for job in jobs {
        if !job.weight.is_finite() {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonFiniteValue,
                format!("Job {} has weight {}", job.id, job.weight),
            ));
        }
        if job.start < 0 || job.start >= job.end {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!("Job {} spans {}..{}", job.id, job.start, job.end),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
