//! Job selection as a penalty model.
//!
//! # Formulation
//!
//! One binary `x_j` per job. For every timepoint `t` with at least one active
//! job, `A(t)` is the set of jobs active at `t` and `M` the track count.
//!
//! | Term | Expression |
//! |------|------------|
//! | Objective | `Σ_j −w_j · x_j` |
//! | Exact count | `p1 · (M − Σ_{A(t)} x_j)²` |
//! | Bounded count | `p2 · (M − Σ_{A(t)} x_j − s_t)²`, `s_t ∈ [0, M]` |
//!
//! `s_t` is log-encoded with `floor(log2 M) + 1` bits.
//!
//! # Penalties
//!
//! Defaults are `p1 = 2 · max|w|` and `p2 = 2 · p1`, so breaking one unit of
//! a constraint always costs more than any single weight can gain. A model
//! with all-zero weights uses a base of 1.
//!
//! # Complexity
//!
//! `O(T · (A + log M))` variables-in-terms for horizon `T` and at most `A`
//! jobs active per timepoint; the compiled QUBO has `O(T · (A + log M)²)`
//! coefficients.

use serde::{Deserialize, Serialize};

use super::{
    ConstraintKind, ConstraintLabel, LinearExpr, OptimizationModel, PenaltyConstraint,
    VariableTable,
};
use crate::error::{ArrangeError, Result};
use crate::models::JobCollection;

/// Penalty weights for the two constraint families.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    /// Weight of the exact-count constraints (`p1`).
    pub exact: f64,
    /// Weight of the bounded-count constraints (`p2`).
    pub at_most: f64,
}

impl PenaltyWeights {
    /// Creates explicit penalty weights.
    pub fn new(exact: f64, at_most: f64) -> Self {
        Self { exact, at_most }
    }

    /// Default weights for a model whose largest absolute job weight is
    /// `max_abs_weight`.
    pub fn from_max_weight(max_abs_weight: f64) -> Self {
        let base = if max_abs_weight > 0.0 && max_abs_weight.is_finite() {
            max_abs_weight
        } else {
            1.0
        };
        let exact = 2.0 * base;
        Self {
            exact,
            at_most: 2.0 * exact,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("exact", self.exact), ("at_most", self.at_most)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ArrangeError::InvalidConfig(format!(
                    "penalty weight `{name}` must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Builds an [`OptimizationModel`] from a job collection.
///
/// # Example
///
/// ```
/// use u_arrange::models::JobCollection;
/// use u_arrange::qubo::QuboEncoder;
///
/// let mut jobs = JobCollection::new();
/// jobs.new_job(0, 2, 1.5, None);
/// jobs.new_job(1, 3, 0.5, None);
///
/// let model = QuboEncoder::new(1).encode(&jobs).unwrap();
/// assert_eq!(model.variables.job_count(), 2);
/// assert_eq!(model.penalties.exact, 3.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuboEncoder {
    tracks: u32,
    penalties: Option<PenaltyWeights>,
    horizon: Option<i32>,
}

impl QuboEncoder {
    /// Creates an encoder for `tracks` tracks with default penalties.
    pub fn new(tracks: u32) -> Self {
        Self {
            tracks,
            penalties: None,
            horizon: None,
        }
    }

    /// Overrides the penalty weights.
    pub fn with_penalties(mut self, penalties: PenaltyWeights) -> Self {
        self.penalties = Some(penalties);
        self
    }

    /// Limits constraints to timepoints `1..=horizon` (default: latest job end).
    pub fn with_horizon(mut self, horizon: i32) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Track count.
    pub fn tracks(&self) -> u32 {
        self.tracks
    }

    /// Encodes the jobs.
    ///
    /// # Errors
    ///
    /// [`ArrangeError::InvalidConfig`] if the track count is zero or a
    /// penalty weight is not positive and finite.
    pub fn encode(&self, jobs: &JobCollection) -> Result<OptimizationModel> {
        if self.tracks == 0 {
            return Err(ArrangeError::InvalidConfig(
                "track count must be at least 1".into(),
            ));
        }
        let penalties = self
            .penalties
            .unwrap_or_else(|| PenaltyWeights::from_max_weight(jobs.max_abs_weight()));
        penalties.validate()?;

        let m = f64::from(self.tracks);
        let mut variables = VariableTable::with_jobs(jobs);
        let objective = LinearExpr::constant(0.0).with_terms(
            jobs.iter()
                .filter_map(|j| variables.job(j.id).map(|v| (v, -j.weight))),
        );

        let horizon = self.horizon.unwrap_or_else(|| jobs.horizon());
        let mut constraints = Vec::new();
        for (t, active) in jobs.active_timepoints(horizon) {
            let selection: Vec<_> = active
                .iter()
                .filter_map(|&id| variables.job(id))
                .map(|v| (v, -1.0))
                .collect();

            constraints.push(PenaltyConstraint {
                label: ConstraintLabel {
                    kind: ConstraintKind::Exact,
                    timepoint: t,
                },
                expr: LinearExpr::constant(m).with_terms(selection.iter().copied()),
                penalty: penalties.exact,
            });

            let slack: Vec<_> = variables
                .add_slack(t, self.tracks)
                .terms()
                .map(|(v, c)| (v, -c))
                .collect();
            constraints.push(PenaltyConstraint {
                label: ConstraintLabel {
                    kind: ConstraintKind::AtMost,
                    timepoint: t,
                },
                expr: LinearExpr::constant(m)
                    .with_terms(selection)
                    .with_terms(slack),
                penalty: penalties.at_most,
            });
        }

        log::debug!(
            "encoded {} jobs over {} timepoints: {} variables, {} constraints",
            jobs.len(),
            constraints.len() / 2,
            variables.len(),
            constraints.len()
        );

        Ok(OptimizationModel {
            variables,
            objective,
            constraints,
            tracks: self.tracks,
            penalties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubo::VarIndex;

    fn three_jobs() -> JobCollection {
        let mut jobs = JobCollection::new();
        jobs.new_job(0, 2, 1.0, None);
        jobs.new_job(1, 3, 2.0, None);
        jobs.new_job(2, 4, 0.5, None);
        jobs
    }

    fn assignments(n: usize) -> impl Iterator<Item = Vec<u8>> {
        (0u32..(1 << n)).map(move |mask| (0..n).map(|b| ((mask >> b) & 1) as u8).collect())
    }

    #[test]
    fn test_default_penalties() {
        let p = PenaltyWeights::from_max_weight(1.5);
        assert_eq!(p.exact, 3.0);
        assert_eq!(p.at_most, 6.0);
        let zero = PenaltyWeights::from_max_weight(0.0);
        assert_eq!(zero.exact, 2.0);
        assert_eq!(zero.at_most, 4.0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let jobs = three_jobs();
        assert!(matches!(
            QuboEncoder::new(0).encode(&jobs),
            Err(ArrangeError::InvalidConfig(_))
        ));
        assert!(matches!(
            QuboEncoder::new(1)
                .with_penalties(PenaltyWeights::new(-1.0, 2.0))
                .encode(&jobs),
            Err(ArrangeError::InvalidConfig(_))
        ));
        assert!(matches!(
            QuboEncoder::new(1)
                .with_penalties(PenaltyWeights::new(1.0, f64::NAN))
                .encode(&jobs),
            Err(ArrangeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_model_structure() {
        let model = QuboEncoder::new(2).encode(&three_jobs()).unwrap();
        // Timepoints 1..=4 are all covered; M = 2 needs two slack bits each.
        assert_eq!(model.constraints.len(), 8);
        assert_eq!(model.num_variables(), 3 + 4 * 2);
        assert_eq!(model.variables.slack(3).unwrap().coefficients, vec![1, 1]);

        let exact_2 = &model.constraints[2];
        assert_eq!(exact_2.label.to_string(), "exactly_M_2");
        assert_eq!(exact_2.expr.constant, 2.0);
        assert_eq!(
            exact_2.expr.merged(),
            vec![(VarIndex(0), -1.0), (VarIndex(1), -1.0)]
        );
        assert_eq!(exact_2.penalty, 4.0);
        assert_eq!(model.constraints[3].penalty, 8.0);
        assert_eq!(model.constraints[3].expr.merged().len(), 4);
    }

    #[test]
    fn test_objective_rewards_weight() {
        let jobs = three_jobs();
        let model = QuboEncoder::new(1).encode(&jobs).unwrap();
        let mut x = vec![0u8; model.num_variables()];
        x[1] = 1;
        assert!((model.objective_value(&x) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ground_state_is_feasible() {
        // With M = 1 the best selection is jobs 0 and 2 (non-overlapping).
        let jobs = three_jobs();
        let model = QuboEncoder::new(1).encode(&jobs).unwrap();
        let qubo = model.compile();
        let best = assignments(model.num_variables())
            .min_by(|a, b| qubo.energy(a).total_cmp(&qubo.energy(b)))
            .unwrap();
        let selected = model.variables.selected_jobs(&best);
        for t in 1..=4 {
            let active = selected
                .iter()
                .filter(|&&id| jobs.get(id).unwrap().is_active_at(t))
                .count();
            assert!(active <= 1, "timepoint {t}");
        }
        assert_eq!(selected, vec![0, 2]);
    }

    #[test]
    fn test_penalty_dominates_weight() {
        // Selecting an overlapping extra job never lowers the energy.
        let jobs = three_jobs();
        let model = QuboEncoder::new(1).encode(&jobs).unwrap();
        let mut feasible = vec![0u8; model.num_variables()];
        feasible[0] = 1;
        feasible[2] = 1;
        let mut overfull = feasible.clone();
        overfull[1] = 1;
        assert!(model.energy(&overfull) > model.energy(&feasible));
    }

    #[test]
    fn test_empty_collection() {
        let model = QuboEncoder::new(2).encode(&JobCollection::new()).unwrap();
        assert!(model.variables.is_empty());
        assert!(model.constraints.is_empty());
        assert!(model.compile().is_empty());
    }

    #[test]
    fn test_horizon_limits_constraints() {
        let model = QuboEncoder::new(1)
            .with_horizon(2)
            .encode(&three_jobs())
            .unwrap();
        assert_eq!(model.constraints.len(), 4);
    }
}
