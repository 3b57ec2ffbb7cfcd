//! Greedy earliest-start track assignment.
//!
//! # Algorithm
//!
//! 1. Sort jobs by start time (stable, so equal starts keep input order).
//! 2. Keep the last job of each of the `M` tracks.
//! 3. Put each job on the first track, in index order, that is empty or whose
//!    last job ends at or before the job's start.
//! 4. A job no track accepts is recorded as unplaced.
//!
//! For a selection with at most `M` jobs active at any timepoint this never
//! leaves a job unplaced (interval-graph colouring in start order).
//!
//! # Complexity
//! O(n log n + n · M) for n jobs.
//!
//! # Reference
//! Kleinberg & Tardos (2005), "Algorithm Design", §4.1: Interval Partitioning

use crate::error::{ArrangeError, Result};
use crate::models::{Job, JobCollection, Schedule};

/// Assigns selected jobs to a fixed number of tracks.
///
/// # Example
///
/// ```
/// use u_arrange::models::JobCollection;
/// use u_arrange::scheduler::ScheduleBuilder;
///
/// let mut jobs = JobCollection::new();
/// jobs.new_job(0, 2, 1.0, Some(0));
/// jobs.new_job(1, 4, 1.0, Some(1));
/// jobs.new_job(2, 5, 1.0, Some(0));
///
/// let schedule = ScheduleBuilder::new(2).build(&jobs);
/// assert!(schedule.is_complete());
/// assert_eq!(schedule.track_for_job(2), Some(0));
/// assert_eq!(schedule.track_for_job(1), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleBuilder {
    tracks: usize,
}

impl ScheduleBuilder {
    /// Creates a builder for `tracks` tracks.
    pub fn new(tracks: usize) -> Self {
        Self { tracks }
    }

    /// Track count.
    pub fn tracks(&self) -> usize {
        self.tracks
    }

    /// Builds a schedule; jobs that fit nowhere go to `unplaced`.
    pub fn build(&self, jobs: &JobCollection) -> Schedule {
        let mut schedule = Schedule::new(self.tracks);
        let mut ordered: Vec<&Job> = jobs.iter().collect();
        ordered.sort_by_key(|j| j.start);

        for job in ordered {
            let slot = schedule
                .tracks
                .iter()
                .position(|t| t.last_end().is_none_or(|end| end <= job.start));
            match slot {
                Some(i) => schedule.tracks[i].jobs.push(job.clone()),
                None => {
                    log::warn!(
                        "job {} ({}..{}) fits on none of {} tracks",
                        job.id,
                        job.start,
                        job.end,
                        self.tracks
                    );
                    schedule.unplaced.push(job.clone());
                }
            }
        }
        schedule
    }

    /// Builds a schedule that must place every job.
    ///
    /// # Errors
    ///
    /// [`ArrangeError::UnplacedJobs`] if any job was left out.
    pub fn build_complete(&self, jobs: &JobCollection) -> Result<Schedule> {
        let schedule = self.build(jobs);
        if schedule.is_complete() {
            Ok(schedule)
        } else {
            Err(ArrangeError::UnplacedJobs {
                job_ids: schedule.unplaced.iter().map(|j| j.id).collect(),
                tracks: self.tracks,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_first_fit_in_start_order() {
        let mut jobs = JobCollection::new();
        jobs.new_job(2, 4, 1.0, None); // id 0
        jobs.new_job(0, 2, 1.0, None); // id 1
        jobs.new_job(0, 3, 1.0, None); // id 2
        jobs.new_job(3, 5, 1.0, None); // id 3

        let schedule = ScheduleBuilder::new(2).build(&jobs);
        assert!(schedule.is_complete());
        let ids = |t: usize| -> Vec<u32> {
            schedule.tracks[t].jobs.iter().map(|j| j.id).collect()
        };
        assert_eq!(ids(0), vec![1, 0]);
        assert_eq!(ids(1), vec![2, 3]);
        assert!(!schedule.has_overlaps());
    }

    #[test]
    fn test_overfull_selection_drops_job() {
        let mut jobs = JobCollection::new();
        jobs.new_job(0, 2, 1.0, None);
        jobs.new_job(0, 2, 1.0, None);
        jobs.new_job(1, 3, 1.0, None);

        let schedule = ScheduleBuilder::new(2).build(&jobs);
        assert_eq!(schedule.job_count(), 2);
        assert_eq!(schedule.unplaced.len(), 1);
        assert_eq!(schedule.unplaced[0].id, 2);

        match ScheduleBuilder::new(2).build_complete(&jobs) {
            Err(ArrangeError::UnplacedJobs { job_ids, tracks }) => {
                assert_eq!(job_ids, vec![2]);
                assert_eq!(tracks, 2);
            }
            other => panic!("expected UnplacedJobs, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let schedule = ScheduleBuilder::new(3).build(&JobCollection::new());
        assert_eq!(schedule.track_count(), 3);
        assert_eq!(schedule.job_count(), 0);
        assert!(schedule.is_complete());
    }

    #[test]
    fn test_feasible_selection_always_fits() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..50 {
            let all = JobCollection::random(12, 10, 1.0, &mut rng);
            // Keep jobs greedily while every timepoint stays within 3.
            let mut kept = JobCollection::new();
            for job in &all {
                let fits = (job.start + 1..=job.end).all(|t| kept.active_at(t).len() < 3);
                if fits {
                    kept.insert(job.clone());
                }
            }
            let schedule = ScheduleBuilder::new(3).build(&kept);
            assert!(schedule.is_complete());
            assert!(!schedule.has_overlaps());
            assert_eq!(schedule.job_count(), kept.len());
        }
    }
}
