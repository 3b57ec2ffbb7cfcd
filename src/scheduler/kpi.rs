//! Reduction quality metrics (KPIs).
//!
//! Computes indicators of how well a schedule covers the source material
//! from a completed schedule and the candidate jobs it was selected from.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest job end on any track |
//! | Total Entropy | Sum of placed job weights |
//! | Avg Utilization | Mean track busyness over the makespan |
//! | Coverage | Fraction of candidate timepoints with at least one placed job |
//! | Fill Rate | Fraction of (timepoint, track) slots occupied |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{JobCollection, Schedule};

/// Reduction performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Latest job end across all tracks.
    pub makespan: i32,
    /// Jobs placed on a track.
    pub placed_jobs: usize,
    /// Jobs no track accepted.
    pub unplaced_jobs: usize,
    /// Sum of placed job weights.
    pub total_entropy: f64,
    /// Average track utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-track utilization, by track index.
    pub utilization_by_track: Vec<f64>,
    /// Candidate timepoints with at least one placed job.
    pub covered_timepoints: usize,
    /// Covered fraction of candidate timepoints (0.0..1.0).
    pub coverage: f64,
    /// Occupied fraction of (timepoint, track) slots (0.0..1.0).
    pub fill_rate: f64,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its candidate jobs.
    ///
    /// # Arguments
    /// * `schedule` - The completed schedule.
    /// * `candidates` - Every job the selection was made from.
    pub fn calculate(schedule: &Schedule, candidates: &JobCollection) -> Self {
        let candidate_points: BTreeSet<i32> = candidates
            .active_timepoints(candidates.horizon())
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        let placed = schedule.tracks.iter().flat_map(|t| t.jobs.iter());
        let covered: BTreeSet<i32> = placed
            .clone()
            .flat_map(|j| j.start + 1..=j.end)
            .filter(|t| candidate_points.contains(t))
            .collect();
        let occupied: usize = placed
            .map(|j| (j.start + 1..=j.end).filter(|t| candidate_points.contains(t)).count())
            .sum();

        let utilization_by_track = schedule.all_utilizations();
        let avg_utilization = if utilization_by_track.is_empty() {
            0.0
        } else {
            utilization_by_track.iter().sum::<f64>() / utilization_by_track.len() as f64
        };

        let coverage = if candidate_points.is_empty() {
            0.0
        } else {
            covered.len() as f64 / candidate_points.len() as f64
        };
        let slots = candidate_points.len() * schedule.track_count();
        let fill_rate = if slots == 0 {
            0.0
        } else {
            occupied as f64 / slots as f64
        };

        Self {
            makespan: schedule.makespan(),
            placed_jobs: schedule.job_count(),
            unplaced_jobs: schedule.unplaced.len(),
            total_entropy: schedule.total_weight(),
            avg_utilization,
            utilization_by_track,
            covered_timepoints: covered.len(),
            coverage,
            fill_rate,
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_coverage: f64, min_utilization: f64) -> bool {
        self.unplaced_jobs == 0
            && self.coverage >= min_coverage
            && self.avg_utilization >= min_utilization
    }
}
