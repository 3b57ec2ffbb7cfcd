//! Quadratic unconstrained binary optimisation.
//!
//! Encodes weighted job selection under a per-timepoint track limit as a
//! penalty model and compiles it to QUBO coefficients:
//!
//! - **`variable`**: dense variable table (jobs, log-encoded slack bits)
//! - **`polynomial`**: linear expressions and the compiled [`Qubo`]
//! - **`model`**: labelled penalty constraints, decoding and energy
//! - **`encoder`**: [`QuboEncoder`] building the model from jobs
//!
//! # References
//!
//! - Lucas (2014), "Ising formulations of many NP problems"
//! - Glover, Kochenberger & Du (2019), "Quantum Bridge Analytics I: a tutorial
//!   on formulating and using QUBO models"

mod encoder;
mod model;
mod polynomial;
mod variable;

pub use encoder::{PenaltyWeights, QuboEncoder};
pub use model::{
    ConstraintKind, ConstraintLabel, DecodedSample, OptimizationModel, PenaltyConstraint,
};
pub use polynomial::{LinearExpr, Qubo};
pub use variable::{SlackEncoding, VarIndex, Variable, VariableTable, log_coefficients};
