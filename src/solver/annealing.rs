//! Simulated annealing over binary variables.
//!
//! # Algorithm
//!
//! Each read starts from a uniformly random assignment and performs
//! `num_sweeps` sweeps. A sweep visits every variable once and flips it with
//! Metropolis probability `min(1, exp(−β·ΔE))`. The inverse temperature `β`
//! rises geometrically from `beta_hot` to `beta_cold` over the sweeps.
//!
//! When not configured, the range is derived from the coefficients:
//!
//! | Bound | Value |
//! |-------|-------|
//! | `beta_hot` | `ln 2 / max ΔE` (worst move accepted with probability ½) |
//! | `beta_cold` | `ln 100 / min ΔE` (smallest move accepted with probability 1/100) |
//!
//! # Reproducibility
//!
//! Read `r` uses a `SmallRng` seeded with `seed + r`, so a seeded run gives
//! the same samples with or without the `parallel` feature.
//!
//! # Complexity
//!
//! `O(reads · sweeps · (n + nnz))` for `n` variables and `nnz` couplings.
//!
//! # Reference
//!
//! Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{FlipTable, Sample, SampleSet, Solver};
use crate::error::{ArrangeError, Result};
use crate::qubo::Qubo;

/// Annealing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealConfig {
    /// Independent restarts.
    pub num_reads: usize,
    /// Sweeps per read.
    pub num_sweeps: usize,
    /// Base seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Explicit `(beta_hot, beta_cold)`; `None` derives it from the model.
    pub beta_range: Option<(f64, f64)>,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            num_reads: 100,
            num_sweeps: 1000,
            seed: None,
            beta_range: None,
        }
    }
}

impl AnnealConfig {
    /// Sets the number of reads.
    pub fn with_num_reads(mut self, num_reads: usize) -> Self {
        self.num_reads = num_reads;
        self
    }

    /// Sets the number of sweeps per read.
    pub fn with_num_sweeps(mut self, num_sweeps: usize) -> Self {
        self.num_sweeps = num_sweeps;
        self
    }

    /// Fixes the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fixes the inverse-temperature range.
    pub fn with_beta_range(mut self, hot: f64, cold: f64) -> Self {
        self.beta_range = Some((hot, cold));
        self
    }
}

/// Single-flip Metropolis annealer.
///
/// # Example
///
/// ```
/// use u_arrange::qubo::Qubo;
/// use u_arrange::solver::{AnnealConfig, SimulatedAnnealingSolver, Solver};
///
/// // E = -x0 - x1 + 2·x0·x1: optimum has exactly one variable set.
/// let mut q = Qubo::new(2);
/// q.add_linear(0, -1.0);
/// q.add_linear(1, -1.0);
/// q.add_quadratic(0, 1, 2.0);
///
/// let mut solver = SimulatedAnnealingSolver::new(AnnealConfig::default().with_seed(7));
/// let samples = solver.solve(&q).unwrap();
/// assert_eq!(samples.lowest().unwrap().energy, -1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulatedAnnealingSolver {
    config: AnnealConfig,
}

impl SimulatedAnnealingSolver {
    /// Creates a solver.
    pub fn new(config: AnnealConfig) -> Self {
        Self { config }
    }

    /// Parameters.
    pub fn config(&self) -> &AnnealConfig {
        &self.config
    }

    fn beta_range(&self, table: &FlipTable) -> (f64, f64) {
        if let Some(range) = self.config.beta_range {
            return range;
        }
        match table.delta_range() {
            Some((max, min)) => (2f64.ln() / max, 100f64.ln() / min),
            None => (0.1, 1.0),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.config.num_reads == 0 {
            return Err(ArrangeError::InvalidConfig(
                "num_reads must be at least 1".into(),
            ));
        }
        if let Some((hot, cold)) = self.config.beta_range {
            if !(hot > 0.0 && cold >= hot && cold.is_finite()) {
                return Err(ArrangeError::InvalidConfig(format!(
                    "invalid beta range ({hot}, {cold})"
                )));
            }
        }
        Ok(())
    }
}

/// Inverse temperature of every sweep, geometric from `hot` to `cold`.
fn beta_schedule(hot: f64, cold: f64, sweeps: usize) -> Vec<f64> {
    match sweeps {
        0 => Vec::new(),
        1 => vec![cold],
        _ => {
            let ratio = (cold / hot).powf(1.0 / (sweeps - 1) as f64);
            (0..sweeps).map(|k| hot * ratio.powi(k as i32)).collect()
        }
    }
}

fn anneal_once(table: &FlipTable, betas: &[f64], seed: u64) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let n = table.len();
    let mut state: Vec<u8> = (0..n).map(|_| u8::from(rng.random::<bool>())).collect();
    for &beta in betas {
        for i in 0..n {
            let delta = table.delta(&state, i);
            if delta <= 0.0 || rng.random::<f64>() < (-beta * delta).exp() {
                state[i] ^= 1;
            }
        }
    }
    state
}

impl Solver for SimulatedAnnealingSolver {
    fn name(&self) -> &str {
        "simulated_annealing"
    }

    fn solve(&mut self, qubo: &Qubo) -> Result<SampleSet> {
        self.validate()?;
        let table = FlipTable::new(qubo);
        let (hot, cold) = self.beta_range(&table);
        let betas = beta_schedule(hot, cold, self.config.num_sweeps);
        let base = self.config.seed.unwrap_or_else(rand::random);

        log::debug!(
            "annealing {} variables: {} reads x {} sweeps, beta {hot:.4}..{cold:.4}",
            table.len(),
            self.config.num_reads,
            self.config.num_sweeps
        );

        let run = |read: usize| {
            let state = anneal_once(&table, &betas, base.wrapping_add(read as u64));
            let energy = qubo.energy(&state);
            Sample::new(state, energy)
        };

        #[cfg(feature = "parallel")]
        let samples: Vec<Sample> = {
            use rayon::prelude::*;
            (0..self.config.num_reads).into_par_iter().map(run).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let samples: Vec<Sample> = (0..self.config.num_reads).map(run).collect();

        Ok(SampleSet::from_samples(samples).with_info(serde_json::json!({
            "solver": self.name(),
            "num_reads": self.config.num_reads,
            "num_sweeps": self.config.num_sweeps,
            "beta_range": [hot, cold],
            "seed": base,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustrated() -> Qubo {
        // Pick exactly two of four, preferring 0 and 3.
        let mut q = Qubo::new(4);
        for i in 0..4 {
            q.add_linear(i, -3.0);
        }
        q.add_linear(0, -0.5);
        q.add_linear(3, -0.5);
        for i in 0..4 {
            for j in i + 1..4 {
                q.add_quadratic(i, j, 2.0);
            }
        }
        q
    }

    #[test]
    fn test_beta_schedule_geometric() {
        let s = beta_schedule(0.1, 10.0, 3);
        assert_eq!(s.len(), 3);
        assert!((s[0] - 0.1).abs() < 1e-12);
        assert!((s[1] - 1.0).abs() < 1e-9);
        assert!((s[2] - 10.0).abs() < 1e-9);
        assert_eq!(beta_schedule(0.1, 10.0, 1), vec![10.0]);
        assert!(beta_schedule(0.1, 10.0, 0).is_empty());
    }

    #[test]
    fn test_finds_ground_state() {
        let q = frustrated();
        let mut solver = SimulatedAnnealingSolver::new(
            AnnealConfig::default()
                .with_num_reads(20)
                .with_num_sweeps(200)
                .with_seed(42),
        );
        let set = solver.solve(&q).unwrap();
        let best = set.lowest().unwrap();
        assert_eq!(best.assignment, vec![1, 0, 0, 1]);
        assert!((best.energy - (-5.0)).abs() < 1e-9);
        let total: u32 = set.iter().map(|s| s.num_occurrences).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let q = frustrated();
        let config = AnnealConfig::default()
            .with_num_reads(5)
            .with_num_sweeps(50)
            .with_seed(3);
        let a = SimulatedAnnealingSolver::new(config.clone()).solve(&q).unwrap();
        let b = SimulatedAnnealingSolver::new(config).solve(&q).unwrap();
        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn test_sample_energies_are_exact() {
        let q = frustrated();
        let set = SimulatedAnnealingSolver::new(
            AnnealConfig::default().with_num_reads(8).with_num_sweeps(10).with_seed(1),
        )
        .solve(&q)
        .unwrap();
        for s in &set {
            assert!((s.energy - q.energy(&s.assignment)).abs() < 1e-12);
        }
        assert_eq!(set.info["solver"], "simulated_annealing");
    }

    #[test]
    fn test_empty_qubo() {
        let mut q = Qubo::new(0);
        q.add_offset(1.5);
        let set = SimulatedAnnealingSolver::new(AnnealConfig::default().with_seed(0))
            .solve(&q)
            .unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.samples[0].assignment.is_empty());
        assert_eq!(set.samples[0].energy, 1.5);
    }

    #[test]
    fn test_rejects_bad_config() {
        let q = frustrated();
        let mut zero_reads =
            SimulatedAnnealingSolver::new(AnnealConfig::default().with_num_reads(0));
        assert!(zero_reads.solve(&q).is_err());
        let mut inverted =
            SimulatedAnnealingSolver::new(AnnealConfig::default().with_beta_range(2.0, 1.0));
        assert!(inverted.solve(&q).is_err());
    }
}
