//! Segmenters: the word segmentation and part-of-speech tagging boundary.
//!
//! The retrieval core never segments text itself. It asks a [`Segmenter`] for
//! `(token, tag)` pairs, so a production deployment can plug in a full
//! statistical segmenter while tests and small corpora use the bundled
//! [`DictionarySegmenter`].
//!
//! # Examples
//!
//! ```
//! use wenku::analysis::segmenter::{DictionarySegmenter, Segmenter};
//!
//! let segmenter = DictionarySegmenter::default();
//! let tokens = segmenter.segment("气虚体质").unwrap();
//! let words: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(words, vec!["气虚", "体质"]);
//! ```

use crate::analysis::token::TaggedToken;
use crate::error::Result;

/// Trait for segmenters that split text into tagged tokens.
///
/// Implementations must be deterministic: the same input always yields the
/// same token sequence. Failures are reported as `Err`; what happens next is
/// the caller's policy (the enricher degrades, the index propagates).
pub trait Segmenter: Send + Sync {
    /// Segment `text` into ordered `(token, tag)` pairs.
    fn segment(&self, text: &str) -> Result<Vec<TaggedToken>>;

    /// Get the name of this segmenter (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod dictionary;

pub use dictionary::DictionarySegmenter;
