//! Text analysis for Wenku.
//!
//! This module defines the segmenter boundary the rest of the crate consumes:
//! a [`Segmenter`](segmenter::Segmenter) turns text into part-of-speech tagged
//! tokens, and a [`TagFilter`](token::TagFilter) decides which of those tokens
//! count as index terms.

pub mod segmenter;
pub mod token;

pub use segmenter::{DictionarySegmenter, Segmenter};
pub use token::{PosClass, TagFilter, TaggedToken};
