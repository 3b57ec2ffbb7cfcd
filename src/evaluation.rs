//! Sample evaluation and selection.
//!
//! Scores every solver sample by the jobs it selects and checks the track
//! limit directly on those jobs, independent of slack bits and energies.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Entropy | Σ weight of selected jobs |
//! | Cost | −entropy (minimised) |
//! | Feasible | selected active count ≤ M at every timepoint |
//! | Soft violations | timepoints where selected active count ≠ M |
//! | Hard violations | timepoints where selected active count > M |
//!
//! Only timepoints with at least one active job (selected or not) count.
//!
//! # Selection
//!
//! - **best entropy**: feasible sample with the lowest cost
//! - **best non-violating**: feasible sample with the fewest soft violations
//! - **least violating**: sample with the fewest soft violations overall, for
//!   diagnostics when nothing is feasible

use serde::{Deserialize, Serialize};

use crate::models::JobCollection;
use crate::qubo::OptimizationModel;
use crate::solver::{Sample, SampleSet};

/// One sample with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedSample {
    /// The raw sample.
    pub sample: Sample,
    /// Ids of the selected jobs.
    pub selected: Vec<u32>,
    /// Σ weight of selected jobs.
    pub entropy: f64,
    /// −entropy.
    pub cost: f64,
    /// No timepoint exceeds the track count.
    pub feasible: bool,
    /// Timepoints whose selected active count differs from the track count.
    pub soft_violations: usize,
    /// Timepoints whose selected active count exceeds the track count.
    pub hard_violations: usize,
}

/// Best samples of an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// All samples, by ascending cost (ties keep solver order).
    pub samples: Vec<EvaluatedSample>,
    /// Index of the feasible sample with the lowest cost.
    pub best_entropy: Option<usize>,
    /// Index of the feasible sample with the fewest soft violations.
    pub best_non_violating: Option<usize>,
    /// Index of the sample with the fewest soft violations overall.
    pub least_violating: Option<usize>,
}

impl EvaluationReport {
    /// The best-entropy sample.
    pub fn best_entropy(&self) -> Option<&EvaluatedSample> {
        self.best_entropy.map(|i| &self.samples[i])
    }

    /// The best non-violating sample.
    pub fn best_non_violating(&self) -> Option<&EvaluatedSample> {
        self.best_non_violating.map(|i| &self.samples[i])
    }

    /// The least-violating sample.
    pub fn least_violating(&self) -> Option<&EvaluatedSample> {
        self.least_violating.map(|i| &self.samples[i])
    }

    /// Number of feasible samples.
    pub fn feasible_count(&self) -> usize {
        self.samples.iter().filter(|s| s.feasible).count()
    }
}

/// Evaluates samples against a job collection and track count.
///
/// # Example
///
/// ```
/// use u_arrange::evaluation::ResultEvaluator;
/// use u_arrange::models::JobCollection;
/// use u_arrange::qubo::QuboEncoder;
/// use u_arrange::solver::{Sample, SampleSet};
///
/// let mut jobs = JobCollection::new();
/// jobs.new_job(0, 2, 1.0, None);
/// jobs.new_job(1, 3, 2.0, None);
/// let model = QuboEncoder::new(1).encode(&jobs).unwrap();
///
/// let mut both = vec![0u8; model.num_variables()];
/// both[0] = 1;
/// both[1] = 1;
/// let set = SampleSet::from_samples([Sample::new(both, 0.0)]);
///
/// let report = ResultEvaluator::new(&jobs, 1).evaluate(&model, &set);
/// assert!(report.best_entropy().is_none());
/// assert_eq!(report.least_violating().unwrap().hard_violations, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ResultEvaluator<'a> {
    jobs: &'a JobCollection,
    tracks: u32,
    timepoints: Vec<(i32, Vec<u32>)>,
}

impl<'a> ResultEvaluator<'a> {
    /// Creates an evaluator over all timepoints covered by `jobs`.
    pub fn new(jobs: &'a JobCollection, tracks: u32) -> Self {
        Self {
            jobs,
            tracks,
            timepoints: jobs.active_timepoints(jobs.horizon()),
        }
    }

    /// Track count.
    pub fn tracks(&self) -> u32 {
        self.tracks
    }

    /// Metrics for one selection.
    pub fn evaluate_selection(&self, sample: Sample, selected: Vec<u32>) -> EvaluatedSample {
        let entropy: f64 = selected
            .iter()
            .filter_map(|&id| self.jobs.get(id))
            .map(|j| j.weight)
            .sum();
        let m = self.tracks as usize;
        let mut soft = 0;
        let mut hard = 0;
        for (_, active) in &self.timepoints {
            let count = active.iter().filter(|id| selected.contains(id)).count();
            if count != m {
                soft += 1;
            }
            if count > m {
                hard += 1;
            }
        }
        EvaluatedSample {
            sample,
            selected,
            entropy,
            cost: -entropy,
            feasible: hard == 0,
            soft_violations: soft,
            hard_violations: hard,
        }
    }

    /// Evaluates every sample of a set and picks the best ones.
    pub fn evaluate(&self, model: &OptimizationModel, samples: &SampleSet) -> EvaluationReport {
        let eval = |s: &Sample| {
            let selected = model.variables.selected_jobs(&s.assignment);
            self.evaluate_selection(s.clone(), selected)
        };

        #[cfg(feature = "parallel")]
        let mut evaluated: Vec<EvaluatedSample> = {
            use rayon::prelude::*;
            samples.samples.par_iter().map(eval).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let mut evaluated: Vec<EvaluatedSample> = samples.iter().map(eval).collect();

        evaluated.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        let report = select(evaluated);

        log::info!(
            "evaluated {} samples: {} feasible",
            report.samples.len(),
            report.feasible_count()
        );
        if let Some(best) = report.best_entropy() {
            log::info!(
                "best entropy {:.4} with {} jobs ({} soft violations)",
                best.entropy,
                best.selected.len(),
                best.soft_violations
            );
        } else if let Some(least) = report.least_violating() {
            log::warn!(
                "no feasible sample; least violating has {} hard and {} soft violations",
                least.hard_violations,
                least.soft_violations
            );
        }
        report
    }
}

fn select(samples: Vec<EvaluatedSample>) -> EvaluationReport {
    // `samples` is sorted by cost, so the first feasible one has the lowest cost.
    let best_entropy = samples.iter().position(|s| s.feasible);
    let best_non_violating = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.feasible)
        .min_by_key(|(_, s)| s.soft_violations)
        .map(|(i, _)| i);
    let least_violating = samples
        .iter()
        .enumerate()
        .min_by_key(|(_, s)| (s.soft_violations, s.hard_violations))
        .map(|(i, _)| i);
    EvaluationReport {
        samples,
        best_entropy,
        best_non_violating,
        least_violating,
    }
}
