//! Score-reduction domain models.
//!
//! Provides the data types flowing through the reduction pipeline: the
//! input score, the phrases found in each voice, the weighted intervals
//! (jobs) handed to the optimizer, and the final track schedule.
//!
//! # Domain Mappings
//!
//! | u-arrange | Music | Scheduling |
//! |-----------|-------|------------|
//! | Voice | Instrument part | - |
//! | Phrase | Measure range of one part | - |
//! | Job | Phrase with informativeness weight | Interval job |
//! | Track | Output voice | Machine |
//! | Schedule | Reduced arrangement | Machine assignment |

pub(crate) mod entropy;
mod job;
mod phrase;
mod schedule;
mod score;

pub use entropy::{phrase_entropy, shannon_entropy};
pub use job::{Job, JobCollection, JobStatistics};
pub use phrase::{Phrase, longest_phrase};
pub use schedule::{MeasureRef, Schedule, Track};
pub use score::{NoteEvent, Score, Voice};
