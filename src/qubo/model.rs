//! Penalty model: objective, labelled constraints and variable table.
//!
//! An [`OptimizationModel`] keeps constraints symbolic so a sample can be
//! checked constraint by constraint; [`OptimizationModel::compile`] lowers it
//! to a [`Qubo`] for the solver.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{LinearExpr, PenaltyWeights, Qubo, VariableTable};
use crate::models::JobCollection;

/// Residual magnitude below which a constraint counts as satisfied.
const RESIDUAL_TOLERANCE: f64 = 1e-9;

/// Constraint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Exactly `M` jobs active.
    Exact,
    /// At most `M` jobs active (with slack).
    AtMost,
}

/// Name of a constraint: its family and timepoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintLabel {
    /// Constraint family.
    pub kind: ConstraintKind,
    /// Timepoint the constraint applies to.
    pub timepoint: i32,
}

impl fmt::Display for ConstraintLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConstraintKind::Exact => write!(f, "exactly_M_{}", self.timepoint),
            ConstraintKind::AtMost => write!(f, "less_M_{}", self.timepoint),
        }
    }
}

/// A constraint `expr == 0` enforced by the term `penalty · expr²`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConstraint {
    /// Constraint name.
    pub label: ConstraintLabel,
    /// Residual expression.
    pub expr: LinearExpr,
    /// Penalty weight.
    pub penalty: f64,
}

impl PenaltyConstraint {
    /// Residual under an assignment.
    pub fn residual(&self, assignment: &[u8]) -> f64 {
        self.expr.evaluate(assignment)
    }

    /// Penalty energy under an assignment.
    pub fn energy(&self, assignment: &[u8]) -> f64 {
        self.penalty * self.residual(assignment).powi(2)
    }

    /// Whether the residual is zero.
    pub fn is_satisfied(&self, assignment: &[u8]) -> bool {
        self.residual(assignment).abs() < RESIDUAL_TOLERANCE
    }
}

/// A sample decoded against its model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedSample {
    /// Ids of the selected jobs.
    pub selected: Vec<u32>,
    /// Slack value per timepoint.
    pub slack: BTreeMap<i32, u32>,
    /// Constraints with non-zero residual, in model order.
    pub broken: Vec<ConstraintLabel>,
}

/// Objective plus penalty constraints over a variable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationModel {
    /// Variable enumeration.
    pub variables: VariableTable,
    /// Linear objective to minimise.
    pub objective: LinearExpr,
    /// Penalty constraints, per timepoint: exact first, then at-most.
    pub constraints: Vec<PenaltyConstraint>,
    /// Track count `M`.
    pub tracks: u32,
    /// Penalty weights used.
    pub penalties: PenaltyWeights,
}

impl OptimizationModel {
    /// Number of binary variables.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Lowers the model to a QUBO.
    pub fn compile(&self) -> Qubo {
        let mut qubo = Qubo::new(self.variables.len());
        qubo.add_linear_expr(&self.objective, 1.0);
        for c in &self.constraints {
            qubo.add_squared(&c.expr, c.penalty);
        }
        qubo
    }

    /// Objective value alone.
    pub fn objective_value(&self, assignment: &[u8]) -> f64 {
        self.objective.evaluate(assignment)
    }

    /// Total energy: objective plus every penalty term.
    pub fn energy(&self, assignment: &[u8]) -> f64 {
        self.objective_value(assignment)
            + self
                .constraints
                .iter()
                .map(|c| c.energy(assignment))
                .sum::<f64>()
    }

    /// Labels of constraints with non-zero residual.
    pub fn broken_constraints(&self, assignment: &[u8]) -> Vec<ConstraintLabel> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(assignment))
            .map(|c| c.label)
            .collect()
    }

    /// Decodes selected jobs, slack values and broken constraints.
    pub fn decode(&self, assignment: &[u8]) -> DecodedSample {
        DecodedSample {
            selected: self.variables.selected_jobs(assignment),
            slack: self
                .variables
                .slacks()
                .map(|s| (s.timepoint, s.value(assignment)))
                .collect(),
            broken: self.broken_constraints(assignment),
        }
    }

    /// The selected jobs as a new collection.
    pub fn selected_jobs(&self, jobs: &JobCollection, assignment: &[u8]) -> JobCollection {
        jobs.subset(&self.variables.selected_jobs(assignment))
    }
}
