//! # Wenku
//!
//! BM25 retrieval over chunked, domain-enriched Chinese documents.
//!
//! ## Features
//!
//! - Paragraph, sentence and sliding-window chunking with size bounds
//! - Domain-term extraction and chunk weighting by document category
//! - Thread-safe Okapi BM25 index with deterministic ranking
//! - Retrieval with store join, metadata filters and result bounds
//! - Pluggable word segmenter and record store

pub mod analysis;
pub mod bm25;
pub mod chunking;
pub mod config;
pub mod document;
pub mod enrich;
pub mod error;
pub mod pipeline;
pub mod retrieval;
pub mod store;

pub mod prelude {
    pub use crate::analysis::{DictionarySegmenter, Segmenter, TagFilter, TaggedToken};
    pub use crate::bm25::{Bm25Index, Bm25Params};
    pub use crate::chunking::Chunker;
    pub use crate::config::WenkuConfig;
    pub use crate::document::{Chunk, DocType, Document};
    pub use crate::enrich::{EntityCategory, EntityLexicon, Enrichment, TermEnricher};
    pub use crate::error::{Result, WenkuError};
    pub use crate::pipeline::DocumentProcessor;
    pub use crate::retrieval::{RecordFilter, Retriever, SearchHit};
    pub use crate::store::{DocumentStore, MemoryStore, Record};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
