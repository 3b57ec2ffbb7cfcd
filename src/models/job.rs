//! Job (weighted interval) model.
//!
//! A job is the interval representation of a phrase: it occupies the
//! half-open time range `(start, end]`, i.e. measures `start+1 ..= end`,
//! and carries the phrase's weight.
//!
//! # Activity Convention
//! Job `j` is active at integer time `t` iff `j.start < t <= j.end`.
//! Two jobs on one track are compatible iff `a.end <= b.start`.
//!
//! # Reference
//! Kleinberg & Tardos (2005), "Algorithm Design", Ch. 4.1 (Interval Partitioning)

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Phrase, Score, entropy::phrase_entropy};

/// A weighted interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier.
    pub id: u32,
    /// Start time (exclusive).
    pub start: i32,
    /// End time (inclusive). Always `> start`.
    pub end: i32,
    /// Informativeness weight (higher = more desirable).
    pub weight: f64,
    /// Originating voice index, if the job was built from a phrase.
    pub voice: Option<u32>,
}

impl Job {
    /// Creates a job. Returns `None` unless `start < end`.
    pub fn new(id: u32, start: i32, end: i32, weight: f64) -> Option<Self> {
        (start < end).then_some(Self {
            id,
            start,
            end,
            weight,
            voice: None,
        })
    }

    /// Sets the originating voice.
    pub fn with_voice(mut self, voice: u32) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Number of time units covered.
    #[inline]
    pub fn length(&self) -> i32 {
        self.end - self.start
    }

    /// Whether the job is active at time `t`.
    #[inline]
    pub fn is_active_at(&self, t: i32) -> bool {
        t > self.start && t <= self.end
    }

    /// Whether two jobs occupy a common time unit.
    #[inline]
    pub fn overlaps(&self, other: &Job) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Measures covered by this job (`start+1 ..= end`).
    pub fn measures(&self) -> impl Iterator<Item = i32> {
        (self.start + 1)..=self.end
    }
}

/// A set of jobs keyed by id.
///
/// Stored as a dense arena in insertion order plus an id → position index.
/// Serializes as a plain list of jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Job>", into = "Vec<Job>")]
pub struct JobCollection {
    jobs: Vec<Job>,
    index: HashMap<u32, usize>,
    next_id: u32,
}

impl JobCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a job with the next free id and inserts it.
    ///
    /// Returns `None` if `start >= end`.
    pub fn new_job(
        &mut self,
        start: i32,
        end: i32,
        weight: f64,
        voice: Option<u32>,
    ) -> Option<u32> {
        while self.index.contains_key(&self.next_id) {
            self.next_id += 1;
        }
        let mut job = Job::new(self.next_id, start, end, weight)?;
        job.voice = voice;
        let id = job.id;
        self.insert(job);
        Some(id)
    }

    /// Inserts a job.
    ///
    /// An id collision is logged and the insertion is a no-op; returns
    /// whether the job was added.
    pub fn insert(&mut self, job: Job) -> bool {
        if self.index.contains_key(&job.id) {
            log::warn!("job id {} already exists; insertion ignored", job.id);
            return false;
        }
        self.next_id = self.next_id.max(job.id.saturating_add(1));
        self.index.insert(job.id, self.jobs.len());
        self.jobs.push(job);
        true
    }

    /// Looks up a job by id.
    pub fn get(&self, id: u32) -> Option<&Job> {
        self.index.get(&id).map(|&pos| &self.jobs[pos])
    }

    /// Whether a job with this id exists.
    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Jobs in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    /// Jobs as a slice.
    pub fn as_slice(&self) -> &[Job] {
        &self.jobs
    }

    /// Number of jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Ids of the jobs active at time `t`, in insertion order.
    pub fn active_at(&self, t: i32) -> Vec<u32> {
        self.jobs
            .iter()
            .filter(|j| j.is_active_at(t))
            .map(|j| j.id)
            .collect()
    }

    /// Latest end time (0 when empty).
    pub fn horizon(&self) -> i32 {
        self.jobs.iter().map(|j| j.end).max().unwrap_or(0)
    }

    /// Timepoints `1..=horizon` with at least one active job, paired with
    /// the ids active there.
    pub fn active_timepoints(&self, horizon: i32) -> Vec<(i32, Vec<u32>)> {
        (1..=horizon)
            .map(|t| (t, self.active_at(t)))
            .filter(|(_, ids)| !ids.is_empty())
            .collect()
    }

    /// Largest absolute weight (0 when empty).
    pub fn max_abs_weight(&self) -> f64 {
        self.jobs.iter().map(|j| j.weight.abs()).fold(0.0, f64::max)
    }

    /// Collection of the jobs whose ids are listed, in this collection's order.
    pub fn subset(&self, ids: &[u32]) -> JobCollection {
        let mut out = JobCollection::new();
        for job in &self.jobs {
            if ids.contains(&job.id) {
                out.insert(job.clone());
            }
        }
        out
    }

    /// Builds one job per phrase, weighted by phrase entropy.
    ///
    /// Phrase `[a, b]` becomes the job `(a - 1, b]`. Ids are assigned in
    /// voice order, then phrase order. Phrases whose voice is unknown or
    /// whose measures or voice index do not fit the job's integer range are
    /// skipped with a warning.
    pub fn from_phrases(score: &Score, phrases: &[Vec<Phrase>]) -> Self {
        let mut jobs = JobCollection::new();
        for voice_phrases in phrases {
            for phrase in voice_phrases {
                let Some(voice) = score.voice(phrase.voice) else {
                    log::warn!("phrase references unknown voice {}", phrase.voice);
                    continue;
                };
                let Some((start, end, voice_index)) = phrase_bounds(phrase) else {
                    log::warn!("phrase {phrase:?} is out of the job time range; skipped");
                    continue;
                };
                let weight = phrase_entropy(voice, phrase.start_measure, phrase.end_measure);
                jobs.new_job(start, end, weight, Some(voice_index));
            }
        }
        jobs
    }

    /// Random benchmark instance.
    ///
    /// `start ∈ [0, max_time)`, `end ∈ (start, max_time]`,
    /// `weight ∈ [0, max_weight)`.
    pub fn random<R: Rng>(num_jobs: usize, max_time: i32, max_weight: f64, rng: &mut R) -> Self {
        let mut jobs = JobCollection::new();
        if max_time < 1 {
            return jobs;
        }
        for _ in 0..num_jobs {
            let start = rng.random_range(0..max_time);
            let end = rng.random_range(start + 1..=max_time);
            let weight = rng.random::<f64>() * max_weight;
            jobs.new_job(start, end, weight, None);
        }
        jobs
    }
}

/// `(start, end, voice)` of the job built from a phrase.
fn phrase_bounds(phrase: &Phrase) -> Option<(i32, i32, u32)> {
    let start = i32::try_from(phrase.start_measure).ok()?.checked_sub(1)?;
    let end = i32::try_from(phrase.end_measure).ok()?;
    let voice = u32::try_from(phrase.voice).ok()?;
    Some((start, end, voice))
}

impl From<Vec<Job>> for JobCollection {
    fn from(jobs: Vec<Job>) -> Self {
        jobs.into_iter().collect()
    }
}

impl From<JobCollection> for Vec<Job> {
    fn from(jobs: JobCollection) -> Self {
        jobs.jobs
    }
}

impl<'a> IntoIterator for &'a JobCollection {
    type Item = &'a Job;
    type IntoIter = std::slice::Iter<'a, Job>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.iter()
    }
}

impl FromIterator<Job> for JobCollection {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        let mut jobs = JobCollection::new();
        for job in iter {
            jobs.insert(job);
        }
        jobs
    }
}

/// Summary statistics over a job collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatistics {
    /// Smallest weight.
    pub min_weight: f64,
    /// Largest weight.
    pub max_weight: f64,
    /// Mean weight.
    pub avg_weight: f64,
    /// Shortest job length.
    pub min_length: i32,
    /// Longest job length.
    pub max_length: i32,
    /// Mean job length.
    pub avg_length: f64,
}

impl JobStatistics {
    /// Computes statistics. Returns `None` for an empty collection.
    pub fn calculate(jobs: &JobCollection) -> Option<Self> {
        if jobs.is_empty() {
            return None;
        }
        let n = jobs.len() as f64;
        let weights = jobs.iter().map(|j| j.weight);
        let lengths = jobs.iter().map(Job::length);
        Some(Self {
            min_weight: weights.clone().fold(f64::INFINITY, f64::min),
            max_weight: weights.clone().fold(f64::NEG_INFINITY, f64::max),
            avg_weight: weights.sum::<f64>() / n,
            min_length: lengths.clone().min().unwrap_or(0),
            max_length: lengths.clone().max().unwrap_or(0),
            avg_length: lengths.map(f64::from).sum::<f64>() / n,
        })
    }
}
