//! Polyphonic score reduction for the U-Engine ecosystem.
//!
//! Reduces a many-voice score to a fixed number of output tracks by
//! splitting every voice into phrases, weighting phrases by how much
//! information they carry, choosing the most informative set that never
//! needs more than `M` simultaneous tracks, and laying the chosen phrases
//! out on the tracks.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Score`, `Voice`, `NoteEvent`, `Phrase`,
//!   `Job`, `JobCollection`, `Schedule`
//! - **`segmentation`**: Boundary detection and length-bounded phrase search
//! - **`qubo`**: Penalty model of the phrase selection and its QUBO form
//! - **`solver`**: `Solver` trait, annealing and exhaustive back ends,
//!   result persistence
//! - **`evaluation`**: Feasibility, violation counts and best-sample selection
//! - **`scheduler`**: Greedy track assignment and KPIs
//! - **`validation`**: Input integrity checks
//! - **`pipeline`**: `Reducer`, the end-to-end run
//!
//! # Architecture
//!
//! Every stage is a pure function of its inputs. The solver is the only
//! pluggable stage: hardware or hybrid back ends implement `Solver` and the
//! rest of the pipeline is unchanged.
//!
//! # Features
//!
//! - `parallel`: per-voice segmentation, annealing reads and sample
//!   evaluation run on `rayon`. Results are identical to the sequential path.
//!
//! # References
//!
//! - Cambouropoulos (2001), "The Local Boundary Detection Model (LBDM)"
//! - Lucas (2014), "Ising formulations of many NP problems"
//! - Kleinberg & Tardos (2005), "Algorithm Design", Ch. 4

pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod qubo;
pub mod scheduler;
pub mod segmentation;
pub mod solver;
pub mod validation;

pub use error::{ArrangeError, Result};
