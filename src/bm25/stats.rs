//! Corpus statistics and BM25 arithmetic.
//!
//! `Bm25Stats` is a plain single-owner structure: it knows nothing about
//! segmentation or locking. Units arrive as already-filtered term lists.
//!
//! The structure is append-only. Adding the same unit id twice counts it
//! twice in `total_units` and in the document frequencies of its terms;
//! callers are expected not to do that.

use std::collections::HashSet;

use ahash::AHashMap;

use super::Bm25Params;
use crate::error::{Result, WenkuError};

/// Term and length statistics of an indexed corpus.
#[derive(Debug, Clone, Default)]
pub struct Bm25Stats {
    params: Bm25Params,

    /// term → number of units containing it
    doc_freqs: AHashMap<String, usize>,

    /// term → unit id → occurrences in that unit
    term_freqs: AHashMap<String, AHashMap<String, usize>>,

    /// unit id → number of terms
    unit_lengths: AHashMap<String, usize>,

    /// Mean of `unit_lengths`, valid while `index_built` holds.
    avg_unit_length: f64,

    total_units: usize,

    index_built: bool,
}

impl Bm25Stats {
    pub fn new(params: Bm25Params) -> Self {
        Bm25Stats {
            params,
            ..Default::default()
        }
    }

    pub fn params(&self) -> &Bm25Params {
        &self.params
    }

    /// Record a unit's terms. Marks the statistics stale.
    pub fn add_terms(&mut self, unit_id: &str, terms: Vec<String>) {
        self.unit_lengths.insert(unit_id.to_string(), terms.len());

        let mut counts: AHashMap<String, usize> = AHashMap::new();
        for term in terms {
            *counts.entry(term).or_insert(0) += 1;
        }

        for (term, tf) in counts {
            *self.doc_freqs.entry(term.clone()).or_insert(0) += 1;
            self.term_freqs
                .entry(term)
                .or_default()
                .insert(unit_id.to_string(), tf);
        }

        self.total_units += 1;
        self.index_built = false;
    }

    /// Recompute the average unit length.
    ///
    /// A no-op on an empty corpus, which stays unbuilt.
    pub fn build_index(&mut self) {
        if self.total_units == 0 {
            return;
        }
        let total_length: usize = self.unit_lengths.values().sum();
        self.avg_unit_length = total_length as f64 / self.total_units as f64;
        self.index_built = true;
    }

    /// Drop every unit, keeping the parameters.
    pub fn clear(&mut self) {
        *self = Bm25Stats::new(self.params);
    }

    pub fn is_built(&self) -> bool {
        self.index_built
    }

    pub fn total_units(&self) -> usize {
        self.total_units
    }

    /// Average unit length as of the last build.
    ///
    /// Only meaningful while [`is_built`](Self::is_built) returns true.
    pub fn avg_unit_length(&self) -> f64 {
        self.avg_unit_length
    }

    /// Number of distinct terms.
    pub fn vocabulary_size(&self) -> usize {
        self.doc_freqs.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.doc_freqs.keys().map(String::as_str)
    }

    /// Number of units containing `term`.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freqs.get(term).copied().unwrap_or(0)
    }

    /// Occurrences of `term` in `unit_id`.
    pub fn term_freq(&self, term: &str, unit_id: &str) -> usize {
        self.term_freqs
            .get(term)
            .and_then(|units| units.get(unit_id))
            .copied()
            .unwrap_or(0)
    }

    /// Number of units with a posting for `term`.
    pub fn posting_count(&self, term: &str) -> usize {
        self.term_freqs.get(term).map_or(0, |units| units.len())
    }

    pub fn unit_length(&self, unit_id: &str) -> Option<usize> {
        self.unit_lengths.get(unit_id).copied()
    }

    /// IDF of an indexed term, `None` for unknown terms.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.doc_freqs
            .get(term)
            .map(|&df| idf(self.total_units, df, self.params.epsilon))
    }

    /// Score every unit sharing a term with the query.
    ///
    /// Query terms are deduplicated; unknown terms contribute nothing. Units
    /// are ranked by descending score, ties by ascending unit id. `top_k` of
    /// `None` or `Some(0)` returns the full ranking.
    pub fn score_terms(&self, query_terms: &[String], top_k: Option<usize>) -> Result<Vec<(String, f64)>> {
        if self.total_units == 0 {
            return Ok(Vec::new());
        }
        if !self.index_built {
            return Err(WenkuError::scoring("statistics are stale, rebuild before scoring"));
        }

        let Bm25Params { k1, b, epsilon } = self.params;
        let mut seen = HashSet::new();
        let mut scores: AHashMap<&str, f64> = AHashMap::new();

        for term in query_terms {
            if !seen.insert(term.as_str()) {
                continue;
            }
            let (Some(&df), Some(postings)) = (self.doc_freqs.get(term), self.term_freqs.get(term))
            else {
                continue;
            };

            let idf = idf(self.total_units, df, epsilon);
            for (unit_id, &tf) in postings {
                let unit_length = self.unit_lengths.get(unit_id).ok_or_else(|| {
                    WenkuError::scoring(format!("unit {unit_id} has postings but no length"))
                })?;
                let relative_length = if self.avg_unit_length > 0.0 {
                    *unit_length as f64 / self.avg_unit_length
                } else {
                    0.0
                };
                let length_norm = (1.0 - b) + b * relative_length;
                let tf = tf as f64;
                let contribution = idf * (tf * (k1 + 1.0)) / (tf + k1 * length_norm);

                *scores.entry(unit_id.as_str()).or_insert(0.0) += contribution;
            }
        }

        let mut ranked: Vec<(String, f64)> = Vec::with_capacity(scores.len());
        for (unit_id, score) in scores {
            if !score.is_finite() {
                return Err(WenkuError::scoring(format!(
                    "non-finite score {score} for unit {unit_id}"
                )));
            }
            ranked.push((unit_id.to_string(), score));
        }

        ranked.sort_by(|left, right| right.1.total_cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
        if let Some(k) = top_k
            && k > 0
        {
            ranked.truncate(k);
        }
        Ok(ranked)
    }
}

fn idf(total_units: usize, doc_freq: usize, epsilon: f64) -> f64 {
    let n = total_units as f64;
    let df = doc_freq as f64;
    ((n - df + 0.5) / (df + 0.5) + epsilon).ln()
}
