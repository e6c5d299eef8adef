//! Thread-safe BM25 index.
//!
//! Writers take the lock only to merge already-tokenized units, so
//! segmentation never blocks readers. A query against stale statistics
//! rebuilds them under the write lock and then downgrades to a read lock
//! for scoring, so no writer can slip in between the rebuild and the scan.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Bm25Params, Bm25Stats};
use crate::analysis::segmenter::Segmenter;
use crate::analysis::token::TagFilter;
use crate::config::WenkuConfig;
use crate::error::{Result, WenkuError};

/// Snapshot of index statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub total_units: usize,
    pub vocabulary_size: usize,
    pub avg_unit_length: f64,
    pub index_built: bool,
    pub params: Bm25Params,
}

/// BM25 index shared between ingestion and query threads.
pub struct Bm25Index {
    stats: RwLock<Bm25Stats>,
    segmenter: Arc<dyn Segmenter>,
    tag_filter: TagFilter,
}

impl std::fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Index")
            .field("segmenter", &self.segmenter.name())
            .field("summary", &self.stats())
            .finish()
    }
}

impl Bm25Index {
    /// Create an empty index with the default tag filter.
    pub fn new(segmenter: Arc<dyn Segmenter>, params: Bm25Params) -> Result<Self> {
        Self::with_tag_filter(segmenter, params, TagFilter::default())
    }

    pub fn with_tag_filter(
        segmenter: Arc<dyn Segmenter>,
        params: Bm25Params,
        tag_filter: TagFilter,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Bm25Index {
            stats: RwLock::new(Bm25Stats::new(params)),
            segmenter,
            tag_filter,
        })
    }

    pub fn from_config(config: &WenkuConfig, segmenter: Arc<dyn Segmenter>) -> Result<Self> {
        Self::with_tag_filter(segmenter, config.bm25, config.tag_filter.clone())
    }

    pub fn segmenter(&self) -> &Arc<dyn Segmenter> {
        &self.segmenter
    }

    pub fn tag_filter(&self) -> &TagFilter {
        &self.tag_filter
    }

    /// Segment and filter text into index terms.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let tokens = self.segmenter.segment(text)?;
        Ok(self.tag_filter.terms(tokens))
    }

    /// Add one unit. The index is left stale until the next build.
    ///
    /// A segmentation failure leaves the index untouched.
    pub fn add_unit(&self, unit_id: &str, text: &str) -> Result<()> {
        let terms = self
            .tokenize(text)
            .map_err(|e| WenkuError::index_mutation(format!("unit {unit_id}: {e}")))?;

        let term_count = terms.len();
        self.stats.write().add_terms(unit_id, terms);
        debug!(unit = unit_id, terms = term_count, "indexed unit");
        Ok(())
    }

    /// Add a batch of units and rebuild.
    ///
    /// Every unit is tokenized before the lock is taken; if any fails, none
    /// are added.
    pub fn add_units<I, K, T>(&self, units: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: AsRef<str>,
    {
        let mut tokenized = Vec::new();
        for (unit_id, text) in units {
            let unit_id = unit_id.into();
            let terms = self
                .tokenize(text.as_ref())
                .map_err(|e| WenkuError::index_mutation(format!("unit {unit_id}: {e}")))?;
            tokenized.push((unit_id, terms));
        }

        Ok(self.add_tokenized(tokenized))
    }

    /// Add units that were already run through [`tokenize`](Self::tokenize),
    /// then rebuild. Returns the number of units added.
    pub fn add_tokenized(&self, units: Vec<(String, Vec<String>)>) -> usize {
        let count = units.len();
        let mut stats = self.stats.write();
        for (unit_id, terms) in units {
            stats.add_terms(&unit_id, terms);
        }
        stats.build_index();
        debug!(units = count, total = stats.total_units(), "indexed batch");
        count
    }

    /// Recompute the length statistics. Idempotent.
    pub fn build_index(&self) {
        self.stats.write().build_index();
    }

    /// Rank units against a query.
    ///
    /// Stale statistics are rebuilt first. `top_k` of `None` or `Some(0)`
    /// returns every matching unit. Segmentation errors propagate.
    pub fn try_score(&self, query: &str, top_k: Option<usize>) -> Result<Vec<(String, f64)>> {
        let terms = self.tokenize(query)?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        self.fresh_stats().score_terms(&terms, top_k)
    }

    /// Like [`try_score`](Self::try_score) but logs failures and returns an
    /// empty ranking.
    pub fn score(&self, query: &str, top_k: Option<usize>) -> Vec<(String, f64)> {
        match self.try_score(query, top_k) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, "scoring failed, returning no results");
                Vec::new()
            }
        }
    }

    /// Remove every unit.
    pub fn clear(&self) {
        self.stats.write().clear();
    }

    pub fn len(&self) -> usize {
        self.stats.read().total_units()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_built(&self) -> bool {
        self.stats.read().is_built()
    }

    pub fn stats(&self) -> IndexSummary {
        let stats = self.stats.read();
        IndexSummary {
            total_units: stats.total_units(),
            vocabulary_size: stats.vocabulary_size(),
            avg_unit_length: stats.avg_unit_length(),
            index_built: stats.is_built(),
            params: *stats.params(),
        }
    }

    /// Run `f` against the statistics under a read lock.
    pub fn with_stats<R>(&self, f: impl FnOnce(&Bm25Stats) -> R) -> R {
        f(&self.stats.read())
    }

    fn fresh_stats(&self) -> RwLockReadGuard<'_, Bm25Stats> {
        {
            let stats = self.stats.read();
            if stats.is_built() || stats.total_units() == 0 {
                return stats;
            }
        }

        let mut stats = self.stats.write();
        if !stats.is_built() {
            stats.build_index();
        }
        RwLockWriteGuard::downgrade(stats)
    }
}
