//! Binary variable table.
//!
//! Every binary variable of a model has a dense index. Job variables come
//! first, in job insertion order; slack bits follow, grouped per timepoint.
//! The table maps both ways so solver assignments can be decoded back into
//! job ids and slack values.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::JobCollection;

/// Dense index of a binary variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarIndex(pub usize);

/// What a binary variable stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variable {
    /// Selection of the job with this id.
    Job { id: u32 },
    /// One bit of the slack integer at a timepoint.
    SlackBit { timepoint: i32, bit: usize },
}

/// Coefficients of the logarithmic encoding of an integer in `[0, upper]`.
///
/// Uses `floor(log2(upper)) + 1` bits: `1, 2, 4, …` for all but the last bit,
/// whose coefficient is chosen so the coefficients sum to exactly `upper`.
/// `upper == 0` needs no bits.
pub fn log_coefficients(upper: u32) -> Vec<u32> {
    if upper == 0 {
        return Vec::new();
    }
    let n = (u32::BITS - upper.leading_zeros()) as usize;
    let mut coefficients: Vec<u32> = (0..n - 1).map(|i| 1u32 << i).collect();
    coefficients.push(upper - ((1u32 << (n - 1)) - 1));
    coefficients
}

/// A bounded integer slack variable `s ∈ [0, upper]` built from binary bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackEncoding {
    /// Timepoint of the constraint this slack belongs to.
    pub timepoint: i32,
    /// Upper bound of the encoded integer.
    pub upper: u32,
    /// Index of the first bit; bits are contiguous.
    pub first: VarIndex,
    /// Coefficient of each bit.
    pub coefficients: Vec<u32>,
}

impl SlackEncoding {
    /// `(variable, coefficient)` pairs of the encoding.
    pub fn terms(&self) -> impl Iterator<Item = (VarIndex, f64)> + '_ {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(bit, &c)| (VarIndex(self.first.0 + bit), f64::from(c)))
    }

    /// Integer value under an assignment.
    pub fn value(&self, assignment: &[u8]) -> u32 {
        self.coefficients
            .iter()
            .enumerate()
            .filter(|(bit, _)| assignment.get(self.first.0 + bit).copied().unwrap_or(0) == 1)
            .map(|(_, &c)| c)
            .sum()
    }
}

/// Bidirectional variable table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableTable {
    variables: Vec<Variable>,
    jobs: HashMap<u32, VarIndex>,
    slacks: BTreeMap<i32, SlackEncoding>,
}

impl VariableTable {
    /// Creates a table with one variable per job, in insertion order.
    pub fn with_jobs(jobs: &JobCollection) -> Self {
        let mut table = Self::default();
        for job in jobs {
            let index = VarIndex(table.variables.len());
            table.variables.push(Variable::Job { id: job.id });
            table.jobs.insert(job.id, index);
        }
        table
    }

    /// Adds the slack bits for `timepoint`. Re-adding returns the existing encoding.
    pub fn add_slack(&mut self, timepoint: i32, upper: u32) -> &SlackEncoding {
        let next = VarIndex(self.variables.len());
        let variables = &mut self.variables;
        self.slacks.entry(timepoint).or_insert_with(|| {
            let coefficients = log_coefficients(upper);
            for bit in 0..coefficients.len() {
                variables.push(Variable::SlackBit { timepoint, bit });
            }
            SlackEncoding {
                timepoint,
                upper,
                first: next,
                coefficients,
            }
        })
    }

    /// Variable of a job.
    pub fn job(&self, id: u32) -> Option<VarIndex> {
        self.jobs.get(&id).copied()
    }

    /// Slack encoding at a timepoint.
    pub fn slack(&self, timepoint: i32) -> Option<&SlackEncoding> {
        self.slacks.get(&timepoint)
    }

    /// All slack encodings, by timepoint.
    pub fn slacks(&self) -> impl Iterator<Item = &SlackEncoding> {
        self.slacks.values()
    }

    /// Describes a variable.
    pub fn get(&self, index: VarIndex) -> Option<&Variable> {
        self.variables.get(index.0)
    }

    /// Number of binary variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Number of job variables.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Ids of the jobs set to 1, in variable order.
    pub fn selected_jobs(&self, assignment: &[u8]) -> Vec<u32> {
        self.variables
            .iter()
            .zip(assignment)
            .filter_map(|(v, &x)| match v {
                Variable::Job { id } if x == 1 => Some(*id),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_coefficients_cover_range() {
        assert!(log_coefficients(0).is_empty());
        assert_eq!(log_coefficients(1), vec![1]);
        assert_eq!(log_coefficients(2), vec![1, 1]);
        assert_eq!(log_coefficients(3), vec![1, 2]);
        assert_eq!(log_coefficients(4), vec![1, 2, 1]);
        assert_eq!(log_coefficients(7), vec![1, 2, 4]);
        for upper in 1..40u32 {
            let c = log_coefficients(upper);
            assert_eq!(c.iter().sum::<u32>(), upper);
            // Every value in [0, upper] is reachable.
            let mut reachable = vec![false; upper as usize + 1];
            for mask in 0u32..(1 << c.len()) {
                let v: u32 = (0..c.len()).filter(|b| mask >> b & 1 == 1).map(|b| c[b]).sum();
                reachable[v as usize] = true;
            }
            assert!(reachable.iter().all(|&r| r), "upper {upper}");
        }
    }

    #[test]
    fn test_table_layout() {
        let mut jobs = JobCollection::new();
        jobs.new_job(0, 2, 1.0, None);
        jobs.new_job(1, 3, 1.0, None);
        let mut table = VariableTable::with_jobs(&jobs);
        assert_eq!(table.job(1), Some(VarIndex(1)));

        let slack = table.add_slack(2, 3).clone();
        assert_eq!(slack.first, VarIndex(2));
        assert_eq!(slack.coefficients, vec![1, 2]);
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.get(VarIndex(3)),
            Some(&Variable::SlackBit { timepoint: 2, bit: 1 })
        );

        // Re-adding is a no-op.
        table.add_slack(2, 3);
        assert_eq!(table.len(), 4);
        assert_eq!(table.job_count(), 2);
    }

    #[test]
    fn test_decode_assignment() {
        let mut jobs = JobCollection::new();
        jobs.new_job(0, 2, 1.0, None);
        jobs.new_job(1, 3, 1.0, None);
        let mut table = VariableTable::with_jobs(&jobs);
        table.add_slack(1, 3);

        let assignment = [0, 1, 1, 1];
        assert_eq!(table.selected_jobs(&assignment), vec![1]);
        assert_eq!(table.slack(1).unwrap().value(&assignment), 3);
        assert!(table.slack(9).is_none());
    }
}
