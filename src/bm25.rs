//! BM25 ranking over an in-memory corpus of text units.
//!
//! [`Bm25Stats`](stats::Bm25Stats) holds the corpus statistics and the scoring
//! arithmetic; [`Bm25Index`](index::Bm25Index) wraps them behind a
//! read-write lock together with the segmenter used on both sides.
//!
//! Scores follow Okapi BM25 with an additive `epsilon` inside the IDF
//! logarithm:
//!
//! ```text
//! idf(t)      = ln((N - df(t) + 0.5) / (df(t) + 0.5) + epsilon)
//! norm(u)     = (1 - b) + b * len(u) / avg_len
//! score(q, u) = Σ idf(t) * tf(t, u) * (k1 + 1) / (tf(t, u) + k1 * norm(u))
//! ```
//!
//! IDF is not clamped: terms present in most units get a negative weight.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WenkuError};

pub mod index;
pub mod stats;

pub use index::{Bm25Index, IndexSummary};
pub use stats::Bm25Stats;

/// Tunable BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,

    /// Length normalization strength, from 0 (none) to 1 (full).
    pub b: f64,

    /// Added to the IDF ratio before taking the logarithm.
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(WenkuError::invalid_config(format!(
                "k1 must be a non-negative number, got {}",
                self.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(WenkuError::invalid_config(format!(
                "b must lie in [0, 1], got {}",
                self.b
            )));
        }
        if !self.epsilon.is_finite() {
            return Err(WenkuError::invalid_config("epsilon must be finite"));
        }
        Ok(())
    }
}
