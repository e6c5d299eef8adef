//! Tagged token types.
//!
//! A segmenter produces [`TaggedToken`]s: a surface string plus a
//! part-of-speech tag in the jieba / ICTCLAS tag set (`n`, `nr`, `v`, `vn`,
//! `a`, `x`, `uj`, ...). Tags stay plain strings so any external segmenter can
//! be plugged in; [`PosClass`] gives the coarse reading of a tag.
//!
//! # Examples
//!
//! ```
//! use wenku::analysis::token::{PosClass, TaggedToken};
//!
//! let token = TaggedToken::new("气虚", "n");
//! assert_eq!(token.pos_class(), PosClass::Noun);
//! assert_eq!(token.char_len(), 2);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Tags excluded from index terms by default: punctuation and stopword-class
/// particles, prepositions, conjunctions, interjections and onomatopoeia.
pub const DEFAULT_EXCLUDED_TAGS: &[&str] = &[
    "x", "w", "u", "uj", "ul", "uv", "uz", "ud", "ug", "p", "c", "e", "y", "o",
];

/// Tag for ideographs a segmenter could not place in any word.
pub const UNKNOWN_TAG: &str = "un";

/// A single segmented token with its part-of-speech tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedToken {
    /// The surface text of the token
    pub text: String,

    /// Part-of-speech tag
    pub tag: String,

    /// The byte offset where this token starts in the segmented text
    pub start_offset: usize,

    /// The byte offset where this token ends in the segmented text
    pub end_offset: usize,
}

impl TaggedToken {
    /// Create a token without offset information.
    pub fn new<S: Into<String>, T: Into<String>>(text: S, tag: T) -> Self {
        let text = text.into();
        let end_offset = text.len();
        TaggedToken {
            text,
            tag: tag.into(),
            start_offset: 0,
            end_offset,
        }
    }

    /// Create a token with byte offsets into the source text.
    pub fn with_offsets<S: Into<String>, T: Into<String>>(
        text: S,
        tag: T,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        TaggedToken {
            text: text.into(),
            tag: tag.into(),
            start_offset,
            end_offset,
        }
    }

    /// Length of the token in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Coarse part-of-speech class of this token's tag.
    pub fn pos_class(&self) -> PosClass {
        PosClass::from_tag(&self.tag)
    }
}

/// Coarse part-of-speech classes, read from the leading letter of a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosClass {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Pronoun,
    Numeral,
    Particle,
    Preposition,
    Conjunction,
    Punctuation,
    Foreign,
    Other,
}

impl PosClass {
    /// Classify a jieba / ICTCLAS style tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "eng" => return PosClass::Foreign,
            UNKNOWN_TAG => return PosClass::Other,
            _ => {}
        }
        match tag.chars().next() {
            Some('n') => PosClass::Noun,
            Some('v') => PosClass::Verb,
            Some('a') => PosClass::Adjective,
            Some('d') => PosClass::Adverb,
            Some('r') => PosClass::Pronoun,
            Some('m') => PosClass::Numeral,
            Some('u') => PosClass::Particle,
            Some('p') => PosClass::Preposition,
            Some('c') => PosClass::Conjunction,
            Some('x') | Some('w') => PosClass::Punctuation,
            _ => PosClass::Other,
        }
    }
}

/// Decides which tagged tokens become index terms.
///
/// Both unit insertion and query scoring go through the same filter so the
/// two sides of the index always agree on the term space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    /// Tags whose tokens are dropped.
    pub excluded_tags: HashSet<String>,

    /// Drop tokens that are empty after trimming whitespace.
    pub skip_blank: bool,
}

impl TagFilter {
    /// Create a filter with a custom excluded tag set.
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagFilter {
            excluded_tags: excluded.into_iter().map(Into::into).collect(),
            skip_blank: true,
        }
    }

    /// Returns true when the token is kept as a term.
    pub fn accepts(&self, token: &TaggedToken) -> bool {
        if self.skip_blank && token.text.trim().is_empty() {
            return false;
        }
        !self.excluded_tags.contains(&token.tag)
    }

    /// Keep only accepted tokens, returning their text.
    pub fn terms(&self, tokens: Vec<TaggedToken>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|token| self.accepts(token))
            .map(|token| token.text)
            .collect()
    }
}

impl Default for TagFilter {
    fn default() -> Self {
        TagFilter::new(DEFAULT_EXCLUDED_TAGS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_is_not_a_particle() {
        assert_eq!(PosClass::from_tag(UNKNOWN_TAG), PosClass::Other);
        assert_eq!(TaggedToken::new("龘", UNKNOWN_TAG).pos_class(), PosClass::Other);
        assert_eq!(PosClass::from_tag("uj"), PosClass::Particle);
    }

    #[test]
    fn test_pos_class_from_tag() {
        assert_eq!(PosClass::from_tag("n"), PosClass::Noun);
        assert_eq!(PosClass::from_tag("nr"), PosClass::Noun);
        assert_eq!(PosClass::from_tag("vn"), PosClass::Verb);
        assert_eq!(PosClass::from_tag("ad"), PosClass::Adjective);
        assert_eq!(PosClass::from_tag("uj"), PosClass::Particle);
        assert_eq!(PosClass::from_tag("x"), PosClass::Punctuation);
        assert_eq!(PosClass::from_tag("eng"), PosClass::Foreign);
        assert_eq!(PosClass::from_tag(""), PosClass::Other);
    }

    #[test]
    fn test_default_filter_drops_punctuation_and_particles() {
        let filter = TagFilter::default();
        let tokens = vec![
            TaggedToken::new("气虚", "n"),
            TaggedToken::new("的", "uj"),
            TaggedToken::new("。", "x"),
            TaggedToken::new("调理", "v"),
            TaggedToken::new(" ", "un"),
        ];

        assert_eq!(filter.terms(tokens), vec!["气虚", "调理"]);
    }

    #[test]
    fn test_custom_filter() {
        let filter = TagFilter::new(["n"]);
        assert!(!filter.accepts(&TaggedToken::new("体质", "n")));
        assert!(filter.accepts(&TaggedToken::new("。", "x")));
    }

    #[test]
    fn test_token_offsets() {
        let token = TaggedToken::with_offsets("养生", "vn", 3, 9);
        assert_eq!(token.start_offset, 3);
        assert_eq!(token.end_offset, 9);
        assert_eq!(token.char_len(), 2);
        assert_eq!(token.pos_class(), PosClass::Verb);
    }
}
