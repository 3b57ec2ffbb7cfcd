//! End-to-end score reduction.
//!
//! # Stages
//!
//! | Stage | Component | Output |
//! |-------|-----------|--------|
//! | 1 | [`validate_score`] | checked score, optionally truncated |
//! | 2 | [`PhraseSegmenter`] (+ [`PhraseCache`]) | phrases per voice |
//! | 3 | [`JobCollection::from_phrases`] | weighted jobs |
//! | 4 | [`QuboEncoder`] | penalty model and QUBO |
//! | 5 | [`Solver`] or [`ResultStore`] | samples |
//! | 6 | [`ResultEvaluator`] | ranked samples |
//! | 7 | [`ScheduleBuilder`] | track schedules |
//!
//! A feasible sample whose jobs cannot all be placed is an internal error
//! ([`ArrangeError::UnplacedJobs`]), never a silently shortened schedule.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ArrangeError, Result};
use crate::evaluation::{EvaluatedSample, EvaluationReport, ResultEvaluator};
use crate::models::{JobCollection, JobStatistics, Phrase, Schedule, Score};
use crate::qubo::{OptimizationModel, PenaltyWeights, Qubo, QuboEncoder};
use crate::scheduler::{ScheduleBuilder, ScheduleKpi};
use crate::segmentation::{BoundaryWeights, PhraseCache, PhraseSegmenter, SegmenterConfig};
use crate::solver::{AnnealConfig, ResultStore, SampleSet, SimulatedAnnealingSolver, Solver};
use crate::validation::{validate_jobs, validate_score};

/// Reduction parameters.
///
/// Every field has a default, so a JSON file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Output track count `M`.
    pub tracks: u32,
    /// Reduce only the first `n` measures.
    pub num_measures: Option<u32>,
    /// Boundary feature weights.
    pub weights: BoundaryWeights,
    /// Threshold-search parameters.
    pub segmenter: SegmenterConfig,
    /// Penalty weights; `None` derives them from the job weights.
    pub penalties: Option<PenaltyWeights>,
    /// Parameters for the built-in annealer.
    pub anneal: AnnealConfig,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            tracks: 2,
            num_measures: None,
            weights: BoundaryWeights::default(),
            segmenter: SegmenterConfig::default(),
            penalties: None,
            anneal: AnnealConfig::default(),
        }
    }
}

impl ReductionConfig {
    /// Loads a configuration from JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the track count.
    pub fn with_tracks(mut self, tracks: u32) -> Self {
        self.tracks = tracks;
        self
    }

    /// Limits the reduction to the first `n` measures.
    pub fn with_num_measures(mut self, n: u32) -> Self {
        self.num_measures = Some(n);
        self
    }

    /// Sets the boundary feature weights.
    pub fn with_weights(mut self, weights: BoundaryWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the threshold-search parameters.
    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Fixes the penalty weights.
    pub fn with_penalties(mut self, penalties: PenaltyWeights) -> Self {
        self.penalties = Some(penalties);
        self
    }

    /// Sets the annealer parameters.
    pub fn with_anneal(mut self, anneal: AnnealConfig) -> Self {
        self.anneal = anneal;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(ArrangeError::InvalidConfig(msg)) };
        if self.tracks == 0 {
            return invalid("tracks must be at least 1".into());
        }
        let w = &self.weights;
        if ![w.pitch, w.ioi, w.rest]
            .iter()
            .all(|x| x.is_finite() && *x >= 0.0)
            || w.total() <= 0.0
        {
            return invalid(format!(
                "boundary weights must be non-negative with a positive sum, got {w:?}"
            ));
        }
        if self.segmenter.max_phrase_len == 0 {
            return invalid("max_phrase_len must be at least 1".into());
        }
        if !(self.segmenter.epsilon.is_finite() && self.segmenter.epsilon > 0.0) {
            return invalid(format!(
                "epsilon must be positive, got {}",
                self.segmenter.epsilon
            ));
        }
        if self.num_measures == Some(0) {
            return invalid("num_measures must be at least 1".into());
        }
        Ok(())
    }

    /// Segmenter built from these parameters.
    pub fn phrase_segmenter(&self) -> PhraseSegmenter {
        PhraseSegmenter::new(self.segmenter).with_weights(self.weights)
    }
}

/// Where samples come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMode {
    /// Run the solver (and save the result if a store is attached).
    #[default]
    Solve,
    /// Load a previously saved result from the store.
    Load,
}

/// Everything a reduction produced.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// Phrases per voice.
    pub phrases: Vec<Vec<Phrase>>,
    /// Candidate jobs.
    pub jobs: JobCollection,
    /// Penalty model.
    pub model: OptimizationModel,
    /// Compiled QUBO.
    pub qubo: Qubo,
    /// Raw solver samples.
    pub samples: SampleSet,
    /// Ranked samples.
    pub report: EvaluationReport,
    /// Schedule of the best-entropy sample.
    pub best_entropy: Option<Schedule>,
    /// Schedule of the best non-violating sample.
    pub best_non_violating: Option<Schedule>,
}

impl Reduction {
    /// KPIs of the best-entropy schedule.
    pub fn kpi(&self) -> Option<ScheduleKpi> {
        self.best_entropy
            .as_ref()
            .map(|s| ScheduleKpi::calculate(s, &self.jobs))
    }
}

/// Runs the reduction pipeline with a given solver.
///
/// # Example
///
/// ```
/// use u_arrange::models::{NoteEvent, Score, Voice};
/// use u_arrange::pipeline::{ReductionConfig, Reducer};
/// use u_arrange::solver::ExhaustiveSolver;
///
/// let voice = |base: f64| {
///     let mut v = Voice::new();
///     for m in 1..=4u32 {
///         let t = f64::from(m - 1) * 4.0;
///         v.push(NoteEvent::new(base + f64::from(m), t, 2.0, m));
///         v.push(NoteEvent::new(base, t + 2.0, 2.0, m));
///     }
///     v
/// };
/// let score = Score::new(4).with_voice(voice(60.0)).with_voice(voice(48.0));
///
/// let mut reducer = Reducer::new(ReductionConfig::default(), ExhaustiveSolver::new());
/// let reduction = reducer.reduce("demo", &score).unwrap();
/// let schedule = reduction.best_entropy.unwrap();
/// assert!(schedule.is_complete());
/// assert!(!schedule.has_overlaps());
/// ```
#[derive(Debug)]
pub struct Reducer<S: Solver> {
    config: ReductionConfig,
    solver: S,
    cache: Option<PhraseCache>,
    store: Option<ResultStore>,
    mode: SolveMode,
}

impl<S: Solver> Reducer<S> {
    /// Creates a reducer without cache or result store.
    pub fn new(config: ReductionConfig, solver: S) -> Self {
        Self {
            config,
            solver,
            cache: None,
            store: None,
            mode: SolveMode::Solve,
        }
    }

    /// Attaches a phrase cache.
    pub fn with_cache(mut self, cache: PhraseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attaches a result store.
    pub fn with_store(mut self, store: ResultStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets where samples come from.
    pub fn with_mode(mut self, mode: SolveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parameters.
    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Phrases of every voice, through the cache when one is attached.
    pub fn segment(&self, score_name: &str, score: &Score) -> Result<Vec<Vec<Phrase>>> {
        let segmenter = self.config.phrase_segmenter();
        let phrases = match &self.cache {
            Some(cache) => cache.get_or_segment(score_name, score, &segmenter)?,
            None => segmenter
                .segment_score(score)
                .into_iter()
                .map(|seg| seg.phrases)
                .collect(),
        };
        for (voice, p) in phrases.iter().enumerate() {
            log::info!("voice {voice}: {} phrases", p.len());
        }
        Ok(phrases)
    }

    fn samples(&mut self, score_name: &str, qubo: &Qubo) -> Result<SampleSet> {
        let samples = match self.mode {
            SolveMode::Solve => {
                log::info!("solving with {}", self.solver.name());
                let samples = self.solver.solve(qubo)?;
                check_sample_sizes(&samples, qubo)?;
                if let Some(store) = &self.store {
                    store.save(score_name, &samples)?;
                }
                samples
            }
            SolveMode::Load => {
                let store = self.store.as_ref().ok_or_else(|| {
                    ArrangeError::InvalidConfig("load mode requires a result store".into())
                })?;
                let samples = store.load(score_name)?;
                check_sample_sizes(&samples, qubo)?;
                samples
            }
        };
        log::debug!("solver info: {}", samples.info);
        Ok(samples)
    }

    fn schedule(
        &self,
        jobs: &JobCollection,
        sample: Option<&EvaluatedSample>,
    ) -> Result<Option<Schedule>> {
        let Some(sample) = sample else {
            return Ok(None);
        };
        let selected = jobs.subset(&sample.selected);
        ScheduleBuilder::new(self.config.tracks as usize)
            .build_complete(&selected)
            .map(Some)
    }

    /// Reduces a score.
    ///
    /// # Errors
    ///
    /// - [`ArrangeError::InvalidConfig`] for out-of-range parameters
    /// - [`ArrangeError::InvalidInput`] if the score or jobs fail validation
    /// - [`ArrangeError::MissingResult`] in load mode without a saved result
    /// - [`ArrangeError::UnplacedJobs`] if a feasible sample does not fit
    /// - solver, I/O and JSON errors
    pub fn reduce(&mut self, score_name: &str, score: &Score) -> Result<Reduction> {
        self.config.validate()?;
        let truncated;
        let score = match self.config.num_measures {
            Some(n) => {
                truncated = score.truncated(n);
                &truncated
            }
            None => score,
        };
        validate_score(score).map_err(ArrangeError::InvalidInput)?;

        let phrases = self.segment(score_name, score)?;
        let jobs = JobCollection::from_phrases(score, &phrases);
        validate_jobs(&jobs).map_err(ArrangeError::InvalidInput)?;
        match JobStatistics::calculate(&jobs) {
            Some(stats) => log::info!(
                "{} jobs; weight {:.3}..{:.3} (mean {:.3}); length {}..{} (mean {:.2})",
                jobs.len(),
                stats.min_weight,
                stats.max_weight,
                stats.avg_weight,
                stats.min_length,
                stats.max_length,
                stats.avg_length
            ),
            None => log::warn!("score {score_name} produced no jobs"),
        }

        let mut encoder = QuboEncoder::new(self.config.tracks);
        if let Some(penalties) = self.config.penalties {
            encoder = encoder.with_penalties(penalties);
        }
        let model = encoder.encode(&jobs)?;
        let qubo = model.compile();
        log::info!(
            "model: {} variables, {} constraints, {} coefficients, offset {:.3}, max |coefficient| {:.3}",
            model.num_variables(),
            model.constraints.len(),
            qubo.len(),
            qubo.offset(),
            qubo.max_abs_coefficient()
        );

        let samples = self.samples(score_name, &qubo)?;
        let report = ResultEvaluator::new(&jobs, self.config.tracks).evaluate(&model, &samples);
        if report.best_entropy.is_none() {
            if let Some(least) = report.least_violating() {
                let broken: Vec<String> = model
                    .broken_constraints(&least.sample.assignment)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                log::warn!("broken constraints: {}", broken.join(", "));
            }
        }

        let best_entropy = self.schedule(&jobs, report.best_entropy())?;
        let best_non_violating = self.schedule(&jobs, report.best_non_violating())?;

        Ok(Reduction {
            phrases,
            jobs,
            model,
            qubo,
            samples,
            report,
            best_entropy,
            best_non_violating,
        })
    }
}

/// Every sample must assign all model variables.
fn check_sample_sizes(samples: &SampleSet, qubo: &Qubo) -> Result<()> {
    match samples
        .iter()
        .find(|s| s.assignment.len() != qubo.num_variables())
    {
        Some(bad) => Err(ArrangeError::Solver(format!(
            "sample has {} variables, model has {}",
            bad.assignment.len(),
            qubo.num_variables()
        ))),
        None => Ok(()),
    }
}

impl Reducer<SimulatedAnnealingSolver> {
    /// Creates a reducer using the built-in annealer with `config.anneal`.
    pub fn with_annealer(config: ReductionConfig) -> Self {
        let solver = SimulatedAnnealingSolver::new(config.anneal.clone());
        Self::new(config, solver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteEvent, Voice};
    use crate::solver::{ExhaustiveSolver, Sample};

    fn busy_voice(base: f64, measures: u32) -> Voice {
        let mut v = Voice::new();
        for m in 1..=measures {
            let t = f64::from(m - 1) * 4.0;
            v.push(NoteEvent::new(base + f64::from(m % 3), t, 1.0, m));
            v.push(NoteEvent::new(base + 4.0, t + 1.0, 1.0, m));
            v.push(NoteEvent::new(base, t + 2.0, 2.0, m));
        }
        v
    }

    fn score() -> Score {
        Score::new(6)
            .with_voice(busy_voice(60.0, 6))
            .with_voice(busy_voice(43.0, 6))
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "tracks": 3, "segmenter": { "max_phrase_len": 6 } }"#).unwrap();
        let config = ReductionConfig::from_json_file(&path).unwrap();
        assert_eq!(config.tracks, 3);
        assert_eq!(config.segmenter.max_phrase_len, 6);
        assert_eq!(config.segmenter.max_escalations, 32);
        assert_eq!(config.weights, BoundaryWeights::default());
        assert!(config.penalties.is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(ReductionConfig::default().validate().is_ok());
        assert!(ReductionConfig::default().with_tracks(0).validate().is_err());
        assert!(ReductionConfig::default()
            .with_weights(BoundaryWeights::new(0.0, 0.0, 0.0))
            .validate()
            .is_err());
        assert!(ReductionConfig::default()
            .with_segmenter(SegmenterConfig {
                max_phrase_len: 0,
                ..SegmenterConfig::default()
            })
            .validate()
            .is_err());
    }

    #[test]
    fn test_reduce_selects_full_cover() {
        let mut reducer = Reducer::new(ReductionConfig::default(), ExhaustiveSolver::new());
        let reduction = reducer.reduce("test", &score()).unwrap();

        // Every measure of both voices is covered, so selecting every job
        // meets each constraint exactly.
        let best = reduction.report.best_entropy().unwrap();
        assert_eq!(best.selected.len(), reduction.jobs.len());
        assert_eq!(best.soft_violations, 0);

        let schedule = reduction.best_entropy.as_ref().unwrap();
        assert!(schedule.is_complete());
        assert!(schedule.measure_plan().iter().all(|track| track.len() == 6));
        let kpi = reduction.kpi().unwrap();
        assert!((kpi.coverage - 1.0).abs() < 1e-12);
        assert!((kpi.fill_rate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reduce_truncates() {
        let config = ReductionConfig::default().with_num_measures(3);
        let mut reducer = Reducer::new(config, ExhaustiveSolver::new());
        let reduction = reducer.reduce("test", &score()).unwrap();
        assert!(reduction.jobs.iter().all(|j| j.end <= 3));
    }

    #[test]
    fn test_invalid_score_rejected() {
        let mut bad = score();
        bad.voices[0].events[2].duration = f64::NAN;
        let mut reducer = Reducer::new(ReductionConfig::default(), ExhaustiveSolver::new());
        assert!(matches!(
            reducer.reduce("test", &bad),
            Err(ArrangeError::InvalidInput(_))
        ));
    }

    /// Returns a single all-zero sample one variable short.
    #[derive(Debug)]
    struct ShortSolver;

    impl Solver for ShortSolver {
        fn name(&self) -> &str {
            "short"
        }

        fn solve(&mut self, qubo: &Qubo) -> Result<SampleSet> {
            let n = qubo.num_variables().saturating_sub(1);
            Ok(SampleSet::from_samples([Sample::new(vec![0; n], 0.0)]))
        }
    }

    #[test]
    fn test_solver_sample_size_checked() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        let mut reducer =
            Reducer::new(ReductionConfig::default(), ShortSolver).with_store(store.clone());
        assert!(matches!(
            reducer.reduce("test", &score()),
            Err(ArrangeError::Solver(_))
        ));
        assert!(!store.contains("test"));
    }

    #[test]
    fn test_load_mode_requires_store() {
        let mut reducer = Reducer::new(ReductionConfig::default(), ExhaustiveSolver::new())
            .with_mode(SolveMode::Load);
        assert!(matches!(
            reducer.reduce("test", &score()),
            Err(ArrangeError::InvalidConfig(_))
        ));
    }
}
