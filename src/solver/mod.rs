//! QUBO solvers.
//!
//! A [`Solver`] turns a compiled [`Qubo`] into a [`SampleSet`]: a finite
//! batch of assignments with their energies plus a free-form diagnostics
//! blob that downstream code only logs. Back ends are interchangeable; the
//! pipeline never depends on which one produced the samples.
//!
//! - **`annealing`**: [`SimulatedAnnealingSolver`], single-flip Metropolis
//! - **`exhaustive`**: [`ExhaustiveSolver`], full enumeration for small models
//! - **`store`**: [`ResultStore`], JSON persistence of sample sets

mod annealing;
mod exhaustive;
mod store;

pub use annealing::{AnnealConfig, SimulatedAnnealingSolver};
pub use exhaustive::ExhaustiveSolver;
pub use store::ResultStore;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::qubo::Qubo;

/// One assignment returned by a solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Value (0 or 1) of every variable, by index.
    pub assignment: Vec<u8>,
    /// QUBO energy of the assignment (offset included).
    pub energy: f64,
    /// How many times the solver returned this assignment.
    pub num_occurrences: u32,
}

impl Sample {
    /// Creates a sample seen once.
    pub fn new(assignment: Vec<u8>, energy: f64) -> Self {
        Self {
            assignment,
            energy,
            num_occurrences: 1,
        }
    }
}

/// Ordered batch of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    /// Samples, lowest energy first.
    pub samples: Vec<Sample>,
    /// Solver diagnostics, passed through untouched.
    #[serde(default)]
    pub info: serde_json::Value,
}

impl SampleSet {
    /// Builds a set from raw samples, merging identical assignments and
    /// ordering by energy.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut merged: Vec<Sample> = Vec::new();
        for sample in samples {
            match merged.iter_mut().find(|s| s.assignment == sample.assignment) {
                Some(existing) => existing.num_occurrences += sample.num_occurrences,
                None => merged.push(sample),
            }
        }
        merged.sort_by(|a, b| a.energy.total_cmp(&b.energy));
        Self {
            samples: merged,
            info: serde_json::Value::Null,
        }
    }

    /// Attaches diagnostics.
    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        self.info = info;
        self
    }

    /// Number of distinct samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates samples in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Lowest-energy sample.
    pub fn lowest(&self) -> Option<&Sample> {
        self.samples
            .iter()
            .min_by(|a, b| a.energy.total_cmp(&b.energy))
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// A QUBO minimiser.
pub trait Solver {
    /// Solver name, for logs and result metadata.
    fn name(&self) -> &str;

    /// Samples low-energy assignments of `qubo`.
    fn solve(&mut self, qubo: &Qubo) -> Result<SampleSet>;
}

/// Sparse view of a QUBO for single-flip moves.
#[derive(Debug, Clone)]
pub(crate) struct FlipTable {
    linear: Vec<f64>,
    neighbors: Vec<Vec<(usize, f64)>>,
}

impl FlipTable {
    pub(crate) fn new(qubo: &Qubo) -> Self {
        let n = qubo.num_variables();
        let mut linear = vec![0.0; n];
        let mut neighbors = vec![Vec::new(); n];
        for ((i, j), c) in qubo.iter() {
            if i == j {
                linear[i] += c;
            } else {
                neighbors[i].push((j, c));
                neighbors[j].push((i, c));
            }
        }
        Self { linear, neighbors }
    }

    pub(crate) fn len(&self) -> usize {
        self.linear.len()
    }

    /// Energy change from flipping variable `i`.
    pub(crate) fn delta(&self, state: &[u8], i: usize) -> f64 {
        let field = self.linear[i]
            + self.neighbors[i]
                .iter()
                .filter(|&&(j, _)| state[j] == 1)
                .map(|&(_, c)| c)
                .sum::<f64>();
        if state[i] == 1 { -field } else { field }
    }

    /// Largest possible single-flip energy change per variable, and the
    /// smallest non-zero coefficient magnitude.
    pub(crate) fn delta_range(&self) -> Option<(f64, f64)> {
        let max = self
            .linear
            .iter()
            .zip(&self.neighbors)
            .map(|(h, adj)| h.abs() + adj.iter().map(|(_, c)| c.abs()).sum::<f64>())
            .fold(0.0, f64::max);
        let min = self
            .linear
            .iter()
            .copied()
            .chain(self.neighbors.iter().flatten().map(|&(_, c)| c))
            .map(f64::abs)
            .filter(|c| *c > 0.0)
            .fold(f64::INFINITY, f64::min);
        (max > 0.0 && min.is_finite()).then_some((max, min))
    }
}
