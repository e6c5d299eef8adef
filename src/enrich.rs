//! Domain-term extraction and chunk weighting.
//!
//! The [`TermEnricher`] segments a chunk, keeps the tokens a
//! [`DomainTermClassifier`] accepts, and turns their density into a weight:
//!
//! ```text
//! term_density = domain_terms / chunk_chars
//! term_weight  = min(term_density * 2, 1)
//! weight       = type_weight(doc_type) * (0.7 + 0.3 * term_weight)
//! ```
//!
//! Enrichment never loses a chunk. When the segmenter fails the result is
//! [`Enrichment::Degraded`], which carries no terms and a neutral weight.

pub mod entities;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::segmenter::Segmenter;
use crate::analysis::token::{PosClass, TaggedToken};
use crate::config::EnricherConfig;
use crate::document::DocType;

pub use self::entities::{EntityCategory, EntityLexicon, EntityMap, entity_count};

/// Weight of a chunk whose enrichment failed.
pub const DEGRADED_WEIGHT: f64 = 1.0;

/// Share of the weight every chunk gets regardless of its terms.
const BASE_SHARE: f64 = 0.7;

/// Share of the weight earned by term density.
const TERM_SHARE: f64 = 0.3;

/// Decides whether a tagged token is a domain term.
pub trait DomainTermClassifier: Send + Sync + std::fmt::Debug {
    fn is_domain_term(&self, token: &TaggedToken) -> bool;

    fn name(&self) -> &str;
}

/// Accepts content words of a minimum length by part of speech.
#[derive(Debug, Clone)]
pub struct PosTermClassifier {
    /// Minimum token length in characters.
    pub min_chars: usize,

    pub accepted: HashSet<PosClass>,
}

impl Default for PosTermClassifier {
    fn default() -> Self {
        PosTermClassifier {
            min_chars: 2,
            accepted: [PosClass::Noun, PosClass::Verb, PosClass::Adjective]
                .into_iter()
                .collect(),
        }
    }
}

impl DomainTermClassifier for PosTermClassifier {
    fn is_domain_term(&self, token: &TaggedToken) -> bool {
        token.char_len() >= self.min_chars && self.accepted.contains(&token.pos_class())
    }

    fn name(&self) -> &str {
        "pos"
    }
}

/// Accepts tokens listed in a domain lexicon, whatever their tag.
#[derive(Debug, Clone, Default)]
pub struct LexiconTermClassifier {
    terms: HashSet<String>,
}

impl LexiconTermClassifier {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LexiconTermClassifier {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl DomainTermClassifier for LexiconTermClassifier {
    fn is_domain_term(&self, token: &TaggedToken) -> bool {
        self.terms.contains(&token.text)
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Accepts a token when any inner classifier does.
#[derive(Debug, Default)]
pub struct AnyOf {
    classifiers: Vec<Box<dyn DomainTermClassifier>>,
}

impl AnyOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, classifier: Box<dyn DomainTermClassifier>) -> Self {
        self.classifiers.push(classifier);
        self
    }
}

impl DomainTermClassifier for AnyOf {
    fn is_domain_term(&self, token: &TaggedToken) -> bool {
        self.classifiers.iter().any(|c| c.is_domain_term(token))
    }

    fn name(&self) -> &str {
        "any_of"
    }
}

/// Outcome of enriching one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Enrichment {
    Enriched {
        domain_terms: Vec<String>,
        weight: f64,
    },
    Degraded {
        reason: String,
    },
}

impl Enrichment {
    pub fn weight(&self) -> f64 {
        match self {
            Enrichment::Enriched { weight, .. } => *weight,
            Enrichment::Degraded { .. } => DEGRADED_WEIGHT,
        }
    }

    pub fn domain_terms(&self) -> &[String] {
        match self {
            Enrichment::Enriched { domain_terms, .. } => domain_terms,
            Enrichment::Degraded { .. } => &[],
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Enrichment::Degraded { .. })
    }

    /// Split into terms, weight and the degradation reason, if any.
    pub fn into_parts(self) -> (Vec<String>, f64, Option<String>) {
        match self {
            Enrichment::Enriched {
                domain_terms,
                weight,
            } => (domain_terms, weight, None),
            Enrichment::Degraded { reason } => (Vec::new(), DEGRADED_WEIGHT, Some(reason)),
        }
    }
}

/// Annotates chunks with domain terms and an importance weight.
#[derive(Clone)]
pub struct TermEnricher {
    segmenter: Arc<dyn Segmenter>,
    classifier: Arc<dyn DomainTermClassifier>,
    config: EnricherConfig,
}

impl std::fmt::Debug for TermEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermEnricher")
            .field("segmenter", &self.segmenter.name())
            .field("classifier", &self.classifier.name())
            .field("config", &self.config)
            .finish()
    }
}

impl TermEnricher {
    /// Create an enricher with the part-of-speech classifier.
    pub fn new(segmenter: Arc<dyn Segmenter>, config: EnricherConfig) -> Self {
        Self::with_classifier(segmenter, Arc::new(PosTermClassifier::default()), config)
    }

    /// Create an enricher that also accepts every term of `lexicon`,
    /// including single-character organ names the POS rule rejects.
    pub fn with_entity_lexicon(
        segmenter: Arc<dyn Segmenter>,
        lexicon: &EntityLexicon,
        config: EnricherConfig,
    ) -> Self {
        let classifier = AnyOf::new()
            .with(Box::new(lexicon.classifier()))
            .with(Box::new(PosTermClassifier::default()));
        Self::with_classifier(segmenter, Arc::new(classifier), config)
    }

    pub fn with_classifier(
        segmenter: Arc<dyn Segmenter>,
        classifier: Arc<dyn DomainTermClassifier>,
        config: EnricherConfig,
    ) -> Self {
        TermEnricher {
            segmenter,
            classifier,
            config,
        }
    }

    /// Enrich one chunk of a document of the given category.
    pub fn enrich(&self, chunk: &str, doc_type: DocType) -> Enrichment {
        let tokens = match self.segmenter.segment(chunk) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(segmenter = self.segmenter.name(), error = %e, "enrichment degraded");
                return Enrichment::Degraded {
                    reason: e.to_string(),
                };
            }
        };

        let domain_terms: Vec<String> = tokens
            .into_iter()
            .filter(|token| self.classifier.is_domain_term(token))
            .map(|token| token.text)
            .collect();

        let weight = chunk_weight(
            self.config.type_weight(doc_type),
            domain_terms.len(),
            chunk.chars().count(),
        );

        Enrichment::Enriched {
            domain_terms,
            weight,
        }
    }
}

/// Weight of a chunk from its base weight, term count and length.
pub fn chunk_weight(base_weight: f64, term_count: usize, chunk_chars: usize) -> f64 {
    let term_density = if chunk_chars == 0 {
        0.0
    } else {
        term_count as f64 / chunk_chars as f64
    };
    let term_weight = (term_density * 2.0).min(1.0);
    round3(base_weight * (BASE_SHARE + TERM_SHARE * term_weight))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::segmenter::DictionarySegmenter;
    use crate::error::{Result, WenkuError};

    #[derive(Debug)]
    struct BrokenSegmenter;

    impl Segmenter for BrokenSegmenter {
        fn segment(&self, _text: &str) -> Result<Vec<TaggedToken>> {
            Err(WenkuError::analysis("dictionary not loaded"))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn enricher() -> TermEnricher {
        TermEnricher::new(
            Arc::new(DictionarySegmenter::default()),
            EnricherConfig::default(),
        )
    }

    #[test]
    fn test_terms_by_part_of_speech() {
        let enrichment = enricher().enrich("气虚体质的调理建议。", DocType::ClassicText);

        assert!(!enrichment.is_degraded());
        assert_eq!(enrichment.domain_terms(), ["气虚", "体质", "调理", "建议"]);
    }

    #[test]
    fn test_duplicates_preserved() {
        let enrichment = enricher().enrich("气虚气虚", DocType::General);
        assert_eq!(enrichment.domain_terms(), ["气虚", "气虚"]);
    }

    #[test]
    fn test_single_char_words_rejected() {
        // 脾 and 胃 are nouns but too short to count as domain terms.
        let enrichment = enricher().enrich("脾胃", DocType::General);
        assert!(enrichment.domain_terms().is_empty());
    }

    #[test]
    fn test_weight_formula() {
        // 4 terms over 10 chars: density 0.4, term weight 0.8.
        let enrichment = enricher().enrich("气虚体质的调理建议。", DocType::ClassicText);
        assert_eq!(enrichment.weight(), round3(1.0 * (0.7 + 0.3 * 0.8)));
    }

    #[test]
    fn test_term_weight_saturates() {
        assert_eq!(chunk_weight(0.9, 10, 4), 0.9);
    }

    #[test]
    fn test_zero_terms_gives_base_share() {
        let enrichment = enricher().enrich("的了。", DocType::HealthEducation);
        assert!(enrichment.domain_terms().is_empty());
        assert_eq!(enrichment.weight(), round3(DocType::HealthEducation.base_weight() * 0.7));
    }

    #[test]
    fn test_empty_chunk() {
        assert_eq!(chunk_weight(1.0, 0, 0), 0.7);
        let enrichment = enricher().enrich("", DocType::ClassicText);
        assert_eq!(enrichment.weight(), 0.7);
    }

    #[test]
    fn test_weight_rounded_to_three_places() {
        let weight = chunk_weight(0.95, 1, 7);
        assert_eq!(weight, (weight * 1000.0).round() / 1000.0);
    }

    #[test]
    fn test_segmenter_failure_degrades() {
        let enricher = TermEnricher::new(Arc::new(BrokenSegmenter), EnricherConfig::default());
        let enrichment = enricher.enrich("气虚体质", DocType::ClassicText);

        assert!(enrichment.is_degraded());
        assert_eq!(enrichment.weight(), DEGRADED_WEIGHT);
        assert!(enrichment.domain_terms().is_empty());

        let (terms, weight, reason) = enrichment.into_parts();
        assert!(terms.is_empty());
        assert_eq!(weight, 1.0);
        assert!(reason.unwrap().contains("dictionary not loaded"));
    }

    #[test]
    fn test_lexicon_classifier() {
        let classifier = AnyOf::new()
            .with(Box::new(LexiconTermClassifier::new(["脾", "胃"])))
            .with(Box::new(PosTermClassifier::default()));
        let enricher = TermEnricher::with_classifier(
            Arc::new(DictionarySegmenter::default()),
            Arc::new(classifier),
            EnricherConfig::default(),
        );

        let enrichment = enricher.enrich("脾胃虚弱", DocType::General);
        assert_eq!(enrichment.domain_terms(), ["脾", "胃", "虚弱"]);
    }

    #[test]
    fn test_entity_lexicon_enricher() {
        let enricher = TermEnricher::with_entity_lexicon(
            Arc::new(DictionarySegmenter::default()),
            &EntityLexicon::default(),
            EnricherConfig::default(),
        );

        let enrichment = enricher.enrich("脾胃虚弱", DocType::General);
        assert_eq!(enrichment.domain_terms(), ["脾", "胃", "虚弱"]);
    }

    #[test]
    fn test_enrichment_serializes_with_status_tag() {
        let json = serde_json::to_value(Enrichment::Degraded {
            reason: "timeout".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["reason"], "timeout");
    }
}
