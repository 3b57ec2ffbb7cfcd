//! Linear expressions and compiled QUBO coefficient maps.
//!
//! # Expansion
//!
//! A penalty `p · (c + Σ aᵢxᵢ)²` over binary `xᵢ` (so `xᵢ² = xᵢ`) expands to
//!
//! ```text
//! p·c²  +  Σᵢ p·(2c·aᵢ + aᵢ²)·xᵢ  +  Σᵢ<ⱼ 2p·aᵢaⱼ·xᵢxⱼ
//! ```
//!
//! after merging repeated variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::VarIndex;

/// `constant + Σ coefficient · x`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    /// `(variable, coefficient)` terms; may repeat a variable.
    pub terms: Vec<(VarIndex, f64)>,
    /// Constant part.
    pub constant: f64,
}

impl LinearExpr {
    /// Creates a constant expression.
    pub fn constant(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// Adds a term.
    pub fn with_term(mut self, var: VarIndex, coefficient: f64) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    /// Adds several terms.
    pub fn with_terms(mut self, terms: impl IntoIterator<Item = (VarIndex, f64)>) -> Self {
        self.terms.extend(terms);
        self
    }

    /// Terms with repeated variables merged and zero coefficients removed,
    /// ordered by variable.
    pub fn merged(&self) -> Vec<(VarIndex, f64)> {
        let mut acc: BTreeMap<VarIndex, f64> = BTreeMap::new();
        for &(v, c) in &self.terms {
            *acc.entry(v).or_insert(0.0) += c;
        }
        acc.into_iter().filter(|&(_, c)| c != 0.0).collect()
    }

    /// Value under a 0/1 assignment (missing variables read as 0).
    pub fn evaluate(&self, assignment: &[u8]) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| assignment.get(v.0).copied().unwrap_or(0) == 1)
            .map(|&(_, c)| c)
            .sum::<f64>()
            + self.constant
    }
}

/// Upper-triangular QUBO: `E(x) = offset + Σᵢ≤ⱼ Qᵢⱼ xᵢ xⱼ`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuboRepr", into = "QuboRepr")]
pub struct Qubo {
    num_variables: usize,
    coefficients: BTreeMap<(usize, usize), f64>,
    offset: f64,
}

#[derive(Serialize, Deserialize)]
struct QuboRepr {
    num_variables: usize,
    offset: f64,
    terms: Vec<(usize, usize, f64)>,
}

impl From<Qubo> for QuboRepr {
    fn from(q: Qubo) -> Self {
        Self {
            num_variables: q.num_variables,
            offset: q.offset,
            terms: q.coefficients.into_iter().map(|((i, j), c)| (i, j, c)).collect(),
        }
    }
}

impl From<QuboRepr> for Qubo {
    fn from(r: QuboRepr) -> Self {
        let mut q = Qubo::new(r.num_variables);
        q.offset = r.offset;
        for (i, j, c) in r.terms {
            q.add_quadratic(i, j, c);
        }
        q
    }
}

impl Qubo {
    /// Creates an all-zero QUBO over `num_variables` variables.
    pub fn new(num_variables: usize) -> Self {
        Self {
            num_variables,
            coefficients: BTreeMap::new(),
            offset: 0.0,
        }
    }

    /// Number of variables.
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Constant offset.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Number of stored (non-zero) coefficients.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Whether no coefficient is stored.
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Adds to the constant offset.
    pub fn add_offset(&mut self, value: f64) {
        self.offset += value;
    }

    /// Adds to the diagonal coefficient of `i`.
    pub fn add_linear(&mut self, i: usize, value: f64) {
        self.add_quadratic(i, i, value);
    }

    /// Adds to the coefficient of the unordered pair `{i, j}`.
    pub fn add_quadratic(&mut self, i: usize, j: usize, value: f64) {
        if value == 0.0 {
            return;
        }
        let key = (i.min(j), i.max(j));
        self.num_variables = self.num_variables.max(key.1 + 1);
        let entry = self.coefficients.entry(key).or_insert(0.0);
        *entry += value;
        if *entry == 0.0 {
            self.coefficients.remove(&key);
        }
    }

    /// Coefficient of the unordered pair `{i, j}`.
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        self.coefficients
            .get(&(i.min(j), i.max(j)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Iterates `((i, j), Qᵢⱼ)` with `i <= j`.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.coefficients.iter().map(|(&k, &c)| (k, c))
    }

    /// Adds `weight · expr`.
    pub fn add_linear_expr(&mut self, expr: &LinearExpr, weight: f64) {
        self.offset += weight * expr.constant;
        for (v, c) in expr.merged() {
            self.add_linear(v.0, weight * c);
        }
    }

    /// Adds `weight · expr²`.
    pub fn add_squared(&mut self, expr: &LinearExpr, weight: f64) {
        let c = expr.constant;
        let terms = expr.merged();
        self.offset += weight * c * c;
        for (k, &(vi, ai)) in terms.iter().enumerate() {
            self.add_linear(vi.0, weight * (2.0 * c * ai + ai * ai));
            for &(vj, aj) in &terms[k + 1..] {
                self.add_quadratic(vi.0, vj.0, 2.0 * weight * ai * aj);
            }
        }
    }

    /// Energy of a 0/1 assignment (missing variables read as 0).
    pub fn energy(&self, assignment: &[u8]) -> f64 {
        let on = |i: usize| assignment.get(i).copied().unwrap_or(0) == 1;
        self.coefficients
            .iter()
            .filter(|(&(i, j), _)| on(i) && on(j))
            .map(|(_, &c)| c)
            .sum::<f64>()
            + self.offset
    }

    /// Largest absolute coefficient (0 when empty).
    ///
    /// Hardware back ends scale chain strength from this value.
    pub fn max_abs_coefficient(&self) -> f64 {
        self.coefficients.values().map(|c| c.abs()).fold(0.0, f64::max)
    }
}
