//! Configuration for chunking, enrichment and scoring.
//!
//! Every section has working defaults and a `validate` method. Structural
//! problems are rejected here, before any document is processed.
//!
//! # Examples
//!
//! ```
//! use wenku::config::WenkuConfig;
//!
//! let config = WenkuConfig::from_json_str(r#"{ "chunker": { "chunk_size": 300 } }"#).unwrap();
//! assert_eq!(config.chunker.chunk_size, 300);
//! assert_eq!(config.chunker.max_chunk_size, 1000);
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::analysis::token::TagFilter;
use crate::bm25::Bm25Params;
use crate::document::DocType;
use crate::error::{Result, WenkuError};

/// Size bounds for the chunker, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Smallest chunk emitted anywhere but at the end of a document.
    pub min_chunk_size: usize,

    /// Target size when accumulating paragraphs; also the sliding-window width.
    pub chunk_size: usize,

    /// Hard cap; longer paragraphs are split into sentences and windows.
    pub max_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            min_chunk_size: 50,
            chunk_size: 500,
            max_chunk_size: 1000,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(WenkuError::chunking("chunk_size must be positive"));
        }
        if self.min_chunk_size > self.chunk_size {
            return Err(WenkuError::chunking(format!(
                "min_chunk_size ({}) exceeds chunk_size ({})",
                self.min_chunk_size, self.chunk_size
            )));
        }
        if self.chunk_size > self.max_chunk_size {
            return Err(WenkuError::chunking(format!(
                "chunk_size ({}) exceeds max_chunk_size ({})",
                self.chunk_size, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// Text cleaning switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Strip characters outside the word/whitespace/punctuation whitelist.
    pub remove_special_chars: bool,

    /// Map ASCII punctuation to the full-width CJK forms.
    pub unify_punctuation: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        CleanerConfig {
            remove_special_chars: true,
            unify_punctuation: true,
        }
    }
}

/// Per-category base weights for chunk enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnricherConfig {
    /// Base weight per document category.
    ///
    /// Entries read from configuration override the built-in weights one
    /// category at a time. A category absent from the map weighs 1.0.
    #[serde(deserialize_with = "merge_type_weights")]
    pub type_weights: HashMap<DocType, f64>,
}

fn default_type_weights() -> HashMap<DocType, f64> {
    DocType::ALL
        .iter()
        .map(|doc_type| (*doc_type, doc_type.base_weight()))
        .collect()
}

fn merge_type_weights<'de, D>(deserializer: D) -> std::result::Result<HashMap<DocType, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = HashMap::<DocType, f64>::deserialize(deserializer)?;
    let mut weights = default_type_weights();
    weights.extend(overrides);
    Ok(weights)
}

impl Default for EnricherConfig {
    fn default() -> Self {
        EnricherConfig {
            type_weights: default_type_weights(),
        }
    }
}

impl EnricherConfig {
    /// Base weight for a category.
    pub fn type_weight(&self, doc_type: DocType) -> f64 {
        self.type_weights.get(&doc_type).copied().unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<()> {
        for (doc_type, weight) in &self.type_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(WenkuError::invalid_config(format!(
                    "type weight for {doc_type} must be a non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Top-level configuration bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WenkuConfig {
    pub chunker: ChunkerConfig,
    pub cleaner: CleanerConfig,
    pub enricher: EnricherConfig,
    pub bm25: Bm25Params,
    pub tag_filter: TagFilter,

    /// Result count used when a caller does not pass one.
    pub default_top_k: usize,
}

impl Default for WenkuConfig {
    fn default() -> Self {
        WenkuConfig {
            chunker: ChunkerConfig::default(),
            cleaner: CleanerConfig::default(),
            enricher: EnricherConfig::default(),
            bm25: Bm25Params::default(),
            tag_filter: TagFilter::default(),
            default_top_k: 10,
        }
    }
}

impl WenkuConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WenkuConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunker.validate()?;
        self.enricher.validate()?;
        self.bm25.validate()?;
        Ok(())
    }
}
