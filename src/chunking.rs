//! Text cleaning and chunking.
//!
//! [`TextCleaner`](cleaner::TextCleaner) normalises raw document text and
//! [`Chunker`](chunker::Chunker) splits the cleaned text into bounded-size
//! chunks along paragraph and sentence boundaries.

pub mod chunker;
pub mod cleaner;

pub use chunker::Chunker;
pub use cleaner::TextCleaner;
