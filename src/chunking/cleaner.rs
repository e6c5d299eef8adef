//! Text cleaning ahead of chunking.
//!
//! Cleaning keeps line breaks: the chunker splits paragraphs on them.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::CleanerConfig;

/// Everything outside word characters, whitespace and the punctuation whitelist.
static SPECIAL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s，。！？；：、（）“”‘’《》「」\-.%/]").expect("special character pattern is valid")
});

/// Runs of horizontal whitespace, including the ideographic space.
static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{3000}\u{00A0}]+").expect("whitespace pattern is valid"));

/// ASCII punctuation and its full-width replacement.
const PUNCTUATION_MAP: &[(char, char)] = &[
    (',', '，'),
    (';', '；'),
    (':', '：'),
    ('?', '？'),
    ('!', '！'),
    ('(', '（'),
    (')', '）'),
];

/// Normalises whitespace and punctuation and strips special characters.
#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    config: CleanerConfig,
}

impl TextCleaner {
    pub fn new(config: CleanerConfig) -> Self {
        TextCleaner { config }
    }

    /// Clean `text`.
    ///
    /// Line endings are normalised to `\n`, every line is trimmed with inner
    /// whitespace runs collapsed to one space, and empty lines are dropped.
    pub fn clean(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");

        let text = if self.config.unify_punctuation {
            text.chars()
                .map(|c| {
                    PUNCTUATION_MAP
                        .iter()
                        .find(|(ascii, _)| *ascii == c)
                        .map_or(c, |(_, wide)| *wide)
                })
                .collect()
        } else {
            text
        };

        let text = if self.config.remove_special_chars {
            SPECIAL_CHARS.replace_all(&text, "").into_owned()
        } else {
            text
        };

        text.lines()
            .map(|line| HORIZONTAL_SPACE.replace_all(line, " "))
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
