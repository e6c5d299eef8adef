//! Dictionary-based forward maximum matching segmenter.
//!
//! Text is first split on Unicode word boundaries (UAX #29). Runs of CJK
//! ideographs are then segmented greedily against a word→tag dictionary,
//! longest match first; ideographs with no dictionary entry are emitted one
//! at a time with the tag `un`. Latin words are tagged `eng`, numbers `m`
//! and punctuation `x`.
//!
//! Dictionaries use the jieba line format, `word [freq] [tag]`, one entry per
//! line. Frequencies are accepted and ignored; a missing tag defaults to `n`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashMap;
use unicode_segmentation::UnicodeSegmentation;

use super::Segmenter;
pub use crate::analysis::token::UNKNOWN_TAG;
use crate::analysis::token::TaggedToken;
use crate::error::{Result, WenkuError};

const DEFAULT_WORD_TAG: &str = "n";

/// Built-in lexicon: constitutions, symptoms, organs, herbs, formulas and the
/// function words needed to keep them apart.
const DEFAULT_LEXICON: &[(&str, &str)] = &[
    // constitutions
    ("体质", "n"),
    ("平和", "a"),
    ("平和质", "n"),
    ("气虚", "n"),
    ("气虚质", "n"),
    ("阳虚", "n"),
    ("阳虚质", "n"),
    ("阴虚", "n"),
    ("阴虚质", "n"),
    ("痰湿", "n"),
    ("痰湿质", "n"),
    ("湿热", "n"),
    ("湿热质", "n"),
    ("血瘀", "n"),
    ("血瘀质", "n"),
    ("气郁", "n"),
    ("气郁质", "n"),
    ("特禀", "n"),
    ("特禀质", "n"),
    // symptoms
    ("症状", "n"),
    ("头痛", "n"),
    ("发热", "v"),
    ("咳嗽", "v"),
    ("胸闷", "n"),
    ("腹痛", "n"),
    ("失眠", "v"),
    ("乏力", "a"),
    ("气短", "a"),
    ("自汗", "v"),
    ("畏寒", "v"),
    // organs
    ("脏腑", "n"),
    ("心", "n"),
    ("肝", "n"),
    ("脾", "n"),
    ("肺", "n"),
    ("肾", "n"),
    ("胆", "n"),
    ("胃", "n"),
    ("大肠", "n"),
    ("小肠", "n"),
    ("膀胱", "n"),
    ("三焦", "n"),
    // herbs
    ("中药", "n"),
    ("人参", "n"),
    ("黄芪", "n"),
    ("当归", "n"),
    ("川芎", "n"),
    ("白术", "n"),
    ("茯苓", "n"),
    ("甘草", "n"),
    ("生姜", "n"),
    ("大枣", "n"),
    ("山药", "n"),
    // formulas
    ("方剂", "n"),
    ("四君子汤", "nz"),
    ("四物汤", "nz"),
    ("逍遥散", "nz"),
    ("补中益气汤", "nz"),
    ("六味地黄丸", "nz"),
    // care vocabulary
    ("养生", "vn"),
    ("建议", "n"),
    ("调理", "v"),
    ("治疗", "v"),
    ("饮食", "n"),
    ("运动", "vn"),
    ("睡眠", "vn"),
    ("补气", "v"),
    ("健脾", "v"),
    ("益气", "v"),
    ("滋阴", "v"),
    ("温阳", "v"),
    ("虚弱", "a"),
    ("温和", "a"),
    ("寒凉", "a"),
    ("温热", "a"),
    ("适量", "a"),
    ("患者", "n"),
    ("人群", "n"),
    ("方法", "n"),
    ("可以", "v"),
    ("适合", "v"),
    ("容易", "a"),
    ("多", "a"),
    ("宜", "v"),
    ("忌", "v"),
    // function words
    ("的", "uj"),
    ("了", "ul"),
    ("地", "uv"),
    ("得", "ud"),
    ("着", "uz"),
    ("和", "c"),
    ("与", "c"),
    ("及", "c"),
    ("或", "c"),
    ("在", "p"),
    ("对", "p"),
    ("以", "p"),
    ("于", "p"),
    ("是", "v"),
    ("者", "k"),
];

/// A forward maximum matching segmenter over a word→tag dictionary.
#[derive(Clone, Debug)]
pub struct DictionarySegmenter {
    words: AHashMap<String, String>,
    max_word_chars: usize,
}

impl DictionarySegmenter {
    /// Create a segmenter with an empty dictionary.
    pub fn new() -> Self {
        DictionarySegmenter {
            words: AHashMap::new(),
            max_word_chars: 1,
        }
    }

    /// Create a segmenter preloaded with the built-in domain lexicon.
    pub fn with_default_lexicon() -> Self {
        let mut segmenter = Self::new();
        for (word, tag) in DEFAULT_LEXICON {
            segmenter.add_word(*word, *tag);
        }
        segmenter
    }

    /// Load a jieba-format dictionary from a reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut segmenter = Self::new();
        segmenter.extend_from_reader(reader)?;
        Ok(segmenter)
    }

    /// Load a jieba-format dictionary file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Add or replace a dictionary entry.
    pub fn add_word<S: Into<String>, T: Into<String>>(&mut self, word: S, tag: T) {
        let word = word.into();
        let chars = word.chars().count();
        if chars == 0 {
            return;
        }
        self.max_word_chars = self.max_word_chars.max(chars);
        self.words.insert(word, tag.into());
    }

    /// Merge entries from a jieba-format dictionary.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let word = parts
                .next()
                .ok_or_else(|| WenkuError::analysis(format!("empty entry on line {}", line_no + 1)))?;
            let mut tag = DEFAULT_WORD_TAG;
            for part in parts {
                if part.parse::<u64>().is_ok() {
                    continue;
                }
                tag = part;
            }
            self.add_word(word, tag);
        }
        Ok(())
    }

    /// Number of dictionary entries.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Tag for a dictionary word, if present.
    pub fn tag_of(&self, word: &str) -> Option<&str> {
        self.words.get(word).map(String::as_str)
    }

    /// Greedy longest-match segmentation of one run of ideographs.
    ///
    /// `run` holds `(byte_offset, char)` pairs relative to `text`; `run_end`
    /// is the byte offset just past the run.
    fn segment_cjk_run(
        &self,
        text: &str,
        run: &[(usize, char)],
        run_end: usize,
        out: &mut Vec<TaggedToken>,
    ) {
        let byte_at = |i: usize| run.get(i).map_or(run_end, |(offset, _)| *offset);

        let mut i = 0;
        while i < run.len() {
            let start = byte_at(i);
            let longest = self.max_word_chars.min(run.len() - i);

            let mut matched = None;
            for len in (1..=longest).rev() {
                let end = byte_at(i + len);
                if let Some(tag) = self.words.get(&text[start..end]) {
                    matched = Some((len, end, tag.as_str()));
                    break;
                }
            }

            let (len, end, tag) = matched.unwrap_or((1, byte_at(i + 1), UNKNOWN_TAG));
            out.push(TaggedToken::with_offsets(&text[start..end], tag, start, end));
            i += len;
        }
    }
}

impl Default for DictionarySegmenter {
    fn default() -> Self {
        Self::with_default_lexicon()
    }
}

impl Segmenter for DictionarySegmenter {
    fn segment(&self, text: &str) -> Result<Vec<TaggedToken>> {
        let mut tokens = Vec::new();
        let mut run: Vec<(usize, char)> = Vec::new();
        let mut run_end = 0;

        for (offset, segment) in text.split_word_bound_indices() {
            let mut chars = segment.chars();
            let first = chars.next();
            let single_ideograph = matches!(first, Some(c) if is_cjk(c)) && chars.next().is_none();

            if single_ideograph {
                if let Some(c) = first {
                    run.push((offset, c));
                }
                run_end = offset + segment.len();
                continue;
            }

            if !run.is_empty() {
                self.segment_cjk_run(text, &run, run_end, &mut tokens);
                run.clear();
            }

            if segment.chars().all(char::is_whitespace) {
                continue;
            }

            let end = offset + segment.len();
            let tag = if let Some(tag) = self.words.get(segment) {
                tag.as_str()
            } else if segment.chars().all(char::is_numeric) {
                "m"
            } else if segment.chars().any(char::is_alphanumeric) {
                "eng"
            } else {
                "x"
            };
            tokens.push(TaggedToken::with_offsets(segment, tag, offset, end));
        }

        if !run.is_empty() {
            self.segment_cjk_run(text, &run, run_end, &mut tokens);
        }

        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "dictionary"
    }
}

/// CJK unified ideographs, extension A and compatibility ideographs.
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}
