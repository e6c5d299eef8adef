//! Paragraph, sentence and sliding-window chunking.
//!
//! Sizes are counted in characters. The chunker never drops text: every
//! non-whitespace character of the input lands in exactly one chunk.
//!
//! 1. Paragraphs (lines) accumulate into a buffer until the next one would
//!    push it past `chunk_size`; the buffer is then emitted as a chunk.
//! 2. A paragraph longer than `max_chunk_size` is split into sentences, and
//!    each sentence becomes its own chunk. The paragraph's last sentence is
//!    never packed together with the paragraphs that follow.
//! 3. A sentence longer than `max_chunk_size` is cut into windows of exactly
//!    `chunk_size` characters, without overlap.
//!
//! Pieces shorter than `min_chunk_size` are never emitted on their own in the
//! middle of a document: they are joined with whatever follows. Only the final
//! chunk may be short, and only when the chunk before it has no room left.
//!
//! # Examples
//!
//! ```
//! use wenku::chunking::Chunker;
//! use wenku::config::ChunkerConfig;
//!
//! let chunker = Chunker::new(ChunkerConfig {
//!     min_chunk_size: 2,
//!     chunk_size: 8,
//!     max_chunk_size: 16,
//! })
//! .unwrap();
//!
//! let chunks = chunker.chunk("气虚体质\n养生建议\n阴虚体质调理");
//! assert_eq!(chunks, vec!["气虚体质", "养生建议", "阴虚体质调理"]);
//! ```

use crate::config::ChunkerConfig;
use crate::error::Result;

const PARAGRAPH_SEPARATOR: &str = "\n";

/// Splits cleaned text into bounded-size chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a chunker, rejecting inconsistent size bounds.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Chunker { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `text` into chunks, in document order.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut packer = Packer::new(&self.config);

        for paragraph in text.lines().map(str::trim).filter(|p| !p.is_empty()) {
            if char_len(paragraph) > self.config.max_chunk_size {
                packer.flush_if_full();
                for sentence in split_sentences(paragraph) {
                    packer.push_sentence(sentence);
                }
                packer.flush_if_full();
            } else {
                packer.push(paragraph, PARAGRAPH_SEPARATOR);
            }
        }

        packer.finish()
    }
}

/// Accumulates pieces and emits chunks within the configured bounds.
struct Packer<'a> {
    config: &'a ChunkerConfig,
    buffer: String,
    buffer_len: usize,
    /// Separator that belongs in front of the buffer if it is ever appended
    /// to the previous chunk.
    buffer_separator: &'static str,
    chunks: Vec<String>,
}

impl<'a> Packer<'a> {
    fn new(config: &'a ChunkerConfig) -> Self {
        Packer {
            config,
            buffer: String::new(),
            buffer_len: 0,
            buffer_separator: "",
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str, separator: &'static str) {
        let piece_len = char_len(piece);
        if self.buffer.is_empty() {
            self.start(piece, piece_len, separator);
            return;
        }

        let joined_len = self.buffer_len + char_len(separator) + piece_len;
        if joined_len <= self.config.chunk_size {
            self.buffer.push_str(separator);
            self.buffer.push_str(piece);
            self.buffer_len = joined_len;
        } else if self.buffer_len < self.config.min_chunk_size {
            // Too short to stand alone: absorb the piece even past chunk_size.
            let mut joined = std::mem::take(&mut self.buffer);
            joined.push_str(separator);
            joined.push_str(piece);
            if joined_len <= self.config.max_chunk_size {
                self.buffer = joined;
                self.buffer_len = joined_len;
            } else {
                self.buffer_len = 0;
                self.window(&joined);
            }
        } else {
            self.flush();
            self.start(piece, piece_len, separator);
        }
    }

    /// Sentences of an oversized paragraph each stand alone once the buffer
    /// is long enough.
    fn push_sentence(&mut self, sentence: &str) {
        self.flush_if_full();
        self.push(sentence, "");
    }

    fn start(&mut self, piece: &str, piece_len: usize, separator: &'static str) {
        if piece_len > self.config.max_chunk_size {
            self.window(piece);
        } else {
            self.buffer = piece.to_string();
            self.buffer_len = piece_len;
            self.buffer_separator = separator;
        }
    }

    /// Cut `text` into `chunk_size` windows; the remainder stays buffered.
    fn window(&mut self, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        let width = self.config.chunk_size;

        for window in chars.chunks(width) {
            if window.len() == width {
                self.chunks.push(window.iter().collect());
            } else {
                self.buffer = window.iter().collect();
                self.buffer_len = window.len();
                self.buffer_separator = "";
            }
        }
    }

    fn flush_if_full(&mut self) {
        if !self.buffer.is_empty() && self.buffer_len >= self.config.min_chunk_size {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.chunks.push(std::mem::take(&mut self.buffer));
        }
        self.buffer_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        if self.buffer.is_empty() {
            return self.chunks;
        }

        if self.buffer_len < self.config.min_chunk_size
            && let Some(last) = self.chunks.last_mut()
        {
            let merged_len = char_len(last) + char_len(self.buffer_separator) + self.buffer_len;
            if merged_len <= self.config.max_chunk_size {
                last.push_str(self.buffer_separator);
                last.push_str(&self.buffer);
                return self.chunks;
            }
        }

        self.flush();
        self.chunks
    }
}

/// Split a paragraph after runs of sentence-ending punctuation.
///
/// Closing quotes and brackets directly after the punctuation stay with the
/// sentence they close.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_tail = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if is_terminator(c) || (in_tail && is_closer(c)) {
            in_tail = true;
            let continues = chars
                .peek()
                .is_some_and(|(_, next)| is_terminator(*next) || is_closer(*next));
            if !continues {
                let end = i + c.len_utf8();
                sentences.push(&text[start..end]);
                start = end;
                in_tail = false;
            }
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

fn is_terminator(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '!' | '?' | '；' | ';')
}

fn is_closer(c: char) -> bool {
    matches!(c, '”' | '’' | '」' | '』' | '）' | ')')
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
