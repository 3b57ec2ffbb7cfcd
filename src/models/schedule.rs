//! Schedule (solution) model.
//!
//! A schedule assigns selected jobs to a fixed number of tracks (the voices
//! of the reduced score). Jobs on one track never overlap. Jobs that could
//! not be placed are kept apart in `unplaced` so callers can surface them.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 5
//! (parallel machine models)

use serde::{Deserialize, Serialize};

use super::Job;

/// Jobs assigned to tracks `0..M`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// One entry per track, in track-index order.
    pub tracks: Vec<Track>,
    /// Jobs no track could accept.
    pub unplaced: Vec<Job>,
}

/// One output track: jobs ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track index.
    pub index: usize,
    /// Jobs in playing order.
    pub jobs: Vec<Job>,
}

/// Reference to one measure of one source voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRef {
    /// Source voice (`None` for jobs not built from phrases).
    pub voice: Option<u32>,
    /// Measure number.
    pub measure: i32,
}

impl Track {
    /// Creates an empty track.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            jobs: Vec::new(),
        }
    }

    /// End time of the last job, if any.
    pub fn last_end(&self) -> Option<i32> {
        self.jobs.last().map(|j| j.end)
    }

    /// Time units occupied on this track.
    pub fn busy(&self) -> i32 {
        self.jobs.iter().map(Job::length).sum()
    }

    /// Whether any two jobs on this track overlap.
    pub fn has_overlaps(&self) -> bool {
        self.jobs
            .iter()
            .enumerate()
            .any(|(i, a)| self.jobs[i + 1..].iter().any(|b| a.overlaps(b)))
    }
}

impl Schedule {
    /// Creates a schedule with `track_count` empty tracks.
    pub fn new(track_count: usize) -> Self {
        Self {
            tracks: (0..track_count).map(Track::new).collect(),
            unplaced: Vec::new(),
        }
    }

    /// Number of tracks.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Returns a track by index.
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Number of placed jobs.
    pub fn job_count(&self) -> usize {
        self.tracks.iter().map(|t| t.jobs.len()).sum()
    }

    /// Whether every job handed to the builder was placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Latest end time across all tracks (0 when empty).
    pub fn makespan(&self) -> i32 {
        self.tracks
            .iter()
            .filter_map(Track::last_end)
            .max()
            .unwrap_or(0)
    }

    /// Track holding the given job.
    pub fn track_for_job(&self, job_id: u32) -> Option<usize> {
        self.tracks
            .iter()
            .find(|t| t.jobs.iter().any(|j| j.id == job_id))
            .map(|t| t.index)
    }

    /// Sum of the weights of all placed jobs.
    pub fn total_weight(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.jobs.iter())
            .map(|j| j.weight)
            .sum()
    }

    /// Track utilization: busy time / horizon.
    ///
    /// Returns `None` if `horizon` is not positive or the track is unknown.
    pub fn track_utilization(&self, index: usize, horizon: i32) -> Option<f64> {
        if horizon <= 0 {
            return None;
        }
        self.track(index)
            .map(|t| f64::from(t.busy()) / f64::from(horizon))
    }

    /// Utilization of every track, using the makespan as horizon.
    pub fn all_utilizations(&self) -> Vec<f64> {
        let horizon = self.makespan();
        (0..self.tracks.len())
            .map(|i| self.track_utilization(i, horizon).unwrap_or(0.0))
            .collect()
    }

    /// Whether any track holds overlapping jobs.
    pub fn has_overlaps(&self) -> bool {
        self.tracks.iter().any(Track::has_overlaps)
    }

    /// Per-track list of source measures in playing order.
    ///
    /// Each job contributes measures `start+1 ..= end` of its voice.
    pub fn measure_plan(&self) -> Vec<Vec<MeasureRef>> {
        self.tracks
            .iter()
            .map(|t| {
                t.jobs
                    .iter()
                    .flat_map(|j| {
                        j.measures().map(move |measure| MeasureRef {
                            voice: j.voice,
                            measure,
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u32, start: i32, end: i32, weight: f64, voice: u32) -> Job {
        Job::new(id, start, end, weight).unwrap().with_voice(voice)
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new(2);
        s.tracks[0].jobs.push(job(0, 0, 2, 1.0, 0));
        s.tracks[0].jobs.push(job(2, 2, 4, 2.0, 1));
        s.tracks[1].jobs.push(job(1, 0, 3, 0.5, 1));
        s
    }

    #[test]
    fn test_schedule_makespan() {
        assert_eq!(sample_schedule().makespan(), 4);
        assert_eq!(Schedule::new(3).makespan(), 0);
    }

    #[test]
    fn test_job_count_and_complete() {
        let mut s = sample_schedule();
        assert_eq!(s.job_count(), 3);
        assert!(s.is_complete());
        s.unplaced.push(job(9, 0, 1, 1.0, 0));
        assert!(!s.is_complete());
    }

    #[test]
    fn test_track_for_job() {
        let s = sample_schedule();
        assert_eq!(s.track_for_job(2), Some(0));
        assert_eq!(s.track_for_job(1), Some(1));
        assert_eq!(s.track_for_job(7), None);
    }

    #[test]
    fn test_track_utilization() {
        let s = sample_schedule();
        // Track 0: busy 4 over horizon 4 → 1.0
        assert!((s.track_utilization(0, 4).unwrap() - 1.0).abs() < 1e-10);
        // Track 1: busy 3 over horizon 4 → 0.75
        assert!((s.track_utilization(1, 4).unwrap() - 0.75).abs() < 1e-10);
        assert!(s.track_utilization(0, 0).is_none());
        assert!(s.track_utilization(5, 4).is_none());

        let all = s.all_utilizations();
        assert_eq!(all.len(), 2);
        assert!((all[1] - 0.75).abs() < 1e-10);
    }

    #[test]
    fn test_total_weight() {
        assert!((sample_schedule().total_weight() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_detection() {
        let mut s = sample_schedule();
        assert!(!s.has_overlaps());
        s.tracks[1].jobs.push(job(3, 2, 5, 1.0, 0));
        assert!(s.has_overlaps());
    }

    #[test]
    fn test_measure_plan() {
        let plan = sample_schedule().measure_plan();
        let track0: Vec<(Option<u32>, i32)> =
            plan[0].iter().map(|m| (m.voice, m.measure)).collect();
        assert_eq!(
            track0,
            vec![(Some(0), 1), (Some(0), 2), (Some(1), 3), (Some(1), 4)]
        );
        assert_eq!(plan[1].len(), 3);
    }
}
