//! Track scheduling and KPI evaluation.
//!
//! Places a selected set of jobs onto the fixed output tracks and measures
//! the result.
//!
//! # Algorithm
//!
//! `ScheduleBuilder` uses greedy earliest-start interval partitioning. It is
//! exact for selections that respect the track limit at every timepoint.
//!
//! # KPI
//!
//! `ScheduleKpi` computes reduction metrics: makespan, total entropy,
//! utilization, coverage, and fill rate.
//!
//! # References
//!
//! - Kleinberg & Tardos (2005), "Algorithm Design", Ch. 4
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1

mod greedy;
mod kpi;

pub use greedy::ScheduleBuilder;
pub use kpi::ScheduleKpi;
