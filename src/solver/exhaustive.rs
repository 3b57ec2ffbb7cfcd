//! Exhaustive enumeration for small models.
//!
//! Visits all `2^n` assignments in Gray-code order so consecutive
//! assignments differ in one bit and each energy is an `O(degree)` update.
//! Keeps the `num_samples` lowest energies; ties go to the assignment with
//! the smaller bit pattern (variable 0 least significant).

use super::{FlipTable, Sample, SampleSet, Solver};
use crate::error::{ArrangeError, Result};
use crate::qubo::Qubo;

/// Upper bound on `max_variables`.
const HARD_LIMIT: usize = 30;

/// Brute-force solver returning the exact lowest-energy assignments.
#[derive(Debug, Clone)]
pub struct ExhaustiveSolver {
    max_variables: usize,
    num_samples: usize,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self {
            max_variables: 24,
            num_samples: 10,
        }
    }
}

impl ExhaustiveSolver {
    /// Creates a solver with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest model accepted (capped at 30).
    pub fn with_max_variables(mut self, max_variables: usize) -> Self {
        self.max_variables = max_variables.min(HARD_LIMIT);
        self
    }

    /// Number of lowest-energy samples returned.
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples.max(1);
        self
    }
}

fn keep_lowest(best: &mut Vec<(f64, u64)>, k: usize) {
    best.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    best.truncate(k);
}

impl Solver for ExhaustiveSolver {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn solve(&mut self, qubo: &Qubo) -> Result<SampleSet> {
        let n = qubo.num_variables();
        if n > self.max_variables {
            return Err(ArrangeError::Solver(format!(
                "exhaustive search over {n} variables exceeds the limit of {}",
                self.max_variables
            )));
        }

        let table = FlipTable::new(qubo);
        let mut state = vec![0u8; n];
        let mut energy = qubo.energy(&state);
        let mut mask = 0u64;
        let mut best = vec![(energy, mask)];

        for step in 1u64..(1u64 << n) {
            let bit = step.trailing_zeros() as usize;
            energy += table.delta(&state, bit);
            state[bit] ^= 1;
            mask ^= 1 << bit;
            best.push((energy, mask));
            if best.len() >= 4 * self.num_samples {
                keep_lowest(&mut best, self.num_samples);
            }
        }
        keep_lowest(&mut best, self.num_samples);

        let samples = best.into_iter().map(|(_, mask)| {
            let assignment: Vec<u8> = (0..n).map(|b| ((mask >> b) & 1) as u8).collect();
            let energy = qubo.energy(&assignment);
            Sample::new(assignment, energy)
        });
        Ok(SampleSet::from_samples(samples).with_info(serde_json::json!({
            "solver": self.name(),
            "num_variables": n,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_exact_optimum() {
        // E = 1 - 2·x0 - x1 + 3·x0·x1 + x2
        let mut q = Qubo::new(3);
        q.add_offset(1.0);
        q.add_linear(0, -2.0);
        q.add_linear(1, -1.0);
        q.add_quadratic(0, 1, 3.0);
        q.add_linear(2, 1.0);
        let set = ExhaustiveSolver::new().with_num_samples(3).solve(&q).unwrap();
        let energies: Vec<f64> = set.iter().map(|s| s.energy).collect();
        assert_eq!(set.samples[0].assignment, vec![1, 0, 0]);
        assert_eq!(energies, vec![-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rejects_large_models() {
        let q = Qubo::new(8);
        let mut solver = ExhaustiveSolver::new().with_max_variables(4);
        assert!(matches!(solver.solve(&q), Err(ArrangeError::Solver(_))));
    }

    #[test]
    fn test_sample_count_bounded() {
        let q = Qubo::new(5);
        let set = ExhaustiveSolver::new().with_num_samples(7).solve(&q).unwrap();
        assert_eq!(set.len(), 7);
        assert!(set.iter().all(|s| s.energy == 0.0));
        // Ties go to the smaller bit pattern: all-zero first.
        assert_eq!(set.samples[0].assignment, vec![0; 5]);
    }
}
