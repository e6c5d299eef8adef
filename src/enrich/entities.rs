//! Categorised domain entities.
//!
//! An [`EntityLexicon`] maps known TCM terms to an [`EntityCategory`].
//! Extraction is a plain containment test over the text, so it needs no
//! segmenter and works the same on chunks and on queries. A term found
//! inside a longer one (`心` in `心悸`) counts for both.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::LexiconTermClassifier;

/// Category of a domain entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Symptom,
    Constitution,
    Organ,
    Herb,
    Formula,
    Pathology,
    Therapy,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 7] = [
        EntityCategory::Symptom,
        EntityCategory::Constitution,
        EntityCategory::Organ,
        EntityCategory::Herb,
        EntityCategory::Formula,
        EntityCategory::Pathology,
        EntityCategory::Therapy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityCategory::Symptom => "symptom",
            EntityCategory::Constitution => "constitution",
            EntityCategory::Organ => "organ",
            EntityCategory::Herb => "herb",
            EntityCategory::Formula => "formula",
            EntityCategory::Pathology => "pathology",
            EntityCategory::Therapy => "therapy",
        }
    }

    /// Chinese display label.
    pub fn label(self) -> &'static str {
        match self {
            EntityCategory::Symptom => "症状",
            EntityCategory::Constitution => "体质",
            EntityCategory::Organ => "脏腑",
            EntityCategory::Herb => "中药",
            EntityCategory::Formula => "方剂",
            EntityCategory::Pathology => "病理",
            EntityCategory::Therapy => "治法",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entities found in a text, grouped by category in lexicon order.
pub type EntityMap = BTreeMap<EntityCategory, Vec<String>>;

/// Total number of entities in a map.
pub fn entity_count(entities: &EntityMap) -> usize {
    entities.values().map(Vec::len).sum()
}

const DEFAULT_ENTITIES: &[(EntityCategory, &[&str])] = &[
    (
        EntityCategory::Symptom,
        &[
            "头痛", "发热", "咳嗽", "胸闷", "腹痛", "失眠", "乏力", "心悸", "便秘", "腹泻",
        ],
    ),
    (
        EntityCategory::Constitution,
        &[
            "气虚质", "阳虚质", "阴虚质", "痰湿质", "湿热质", "血瘀质", "气郁质", "特禀质", "平和质",
        ],
    ),
    (
        EntityCategory::Organ,
        &[
            "心", "肝", "脾", "肺", "肾", "胆", "胃", "大肠", "小肠", "膀胱", "三焦",
        ],
    ),
    (
        EntityCategory::Herb,
        &[
            "人参", "黄芪", "当归", "川芎", "白术", "茯苓", "甘草", "生姜", "大枣",
        ],
    ),
    (
        EntityCategory::Formula,
        &["四君子汤", "四物汤", "逍遥散", "补中益气汤", "六味地黄丸"],
    ),
    (
        EntityCategory::Pathology,
        &["气虚", "血瘀", "痰湿", "阴虚", "阳虚", "湿热", "寒湿"],
    ),
    (
        EntityCategory::Therapy,
        &["补气", "活血", "化痰", "清热", "温阳", "滋阴", "祛湿"],
    ),
];

/// Domain terms grouped by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLexicon {
    categories: BTreeMap<EntityCategory, Vec<String>>,
}

impl Default for EntityLexicon {
    fn default() -> Self {
        Self::with_default_entities()
    }
}

impl EntityLexicon {
    /// An empty lexicon.
    pub fn new() -> Self {
        EntityLexicon {
            categories: BTreeMap::new(),
        }
    }

    /// The built-in TCM lexicon.
    pub fn with_default_entities() -> Self {
        let mut lexicon = Self::new();
        for (category, terms) in DEFAULT_ENTITIES {
            for term in *terms {
                lexicon.add(*category, *term);
            }
        }
        lexicon
    }

    /// Add a term to a category. Repeats are ignored.
    pub fn add<S: Into<String>>(&mut self, category: EntityCategory, term: S) {
        let term = term.into();
        let terms = self.categories.entry(category).or_default();
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.categories.values().flatten().map(String::as_str)
    }

    /// First category listing `term`.
    pub fn category_of(&self, term: &str) -> Option<EntityCategory> {
        self.categories
            .iter()
            .find(|(_, terms)| terms.iter().any(|t| t == term))
            .map(|(category, _)| *category)
    }

    /// Entities contained in `text`. Categories without a match are absent.
    pub fn extract(&self, text: &str) -> EntityMap {
        self.categories
            .iter()
            .filter_map(|(category, terms)| {
                let found: Vec<String> = terms
                    .iter()
                    .filter(|term| text.contains(term.as_str()))
                    .cloned()
                    .collect();
                (!found.is_empty()).then_some((*category, found))
            })
            .collect()
    }

    /// Distinct entity terms contained in `text`, in lexicon order.
    pub fn find_terms(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for term in self.extract(text).into_values().flatten() {
            if !found.contains(&term) {
                found.push(term);
            }
        }
        found
    }

    /// A classifier accepting every term of the lexicon.
    pub fn classifier(&self) -> LexiconTermClassifier {
        LexiconTermClassifier::new(self.terms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TaggedToken;
    use crate::enrich::DomainTermClassifier;

    #[test]
    fn test_extract_groups_by_category() {
        let lexicon = EntityLexicon::default();
        let entities = lexicon.extract("气虚质人群乏力，宜服补中益气汤，加黄芪。");

        assert_eq!(entities[&EntityCategory::Constitution], vec!["气虚质"]);
        assert_eq!(entities[&EntityCategory::Symptom], vec!["乏力"]);
        assert_eq!(entities[&EntityCategory::Formula], vec!["补中益气汤"]);
        assert_eq!(entities[&EntityCategory::Herb], vec!["黄芪"]);
        assert_eq!(entities[&EntityCategory::Pathology], vec!["气虚"]);
        assert!(!entities.contains_key(&EntityCategory::Organ));
        assert_eq!(entity_count(&entities), 5);
    }

    #[test]
    fn test_no_entities() {
        let entities = EntityLexicon::default().extract("今天天气很好。");
        assert!(entities.is_empty());
        assert_eq!(entity_count(&entities), 0);
    }

    #[test]
    fn test_nested_terms_both_count() {
        let entities = EntityLexicon::default().extract("心悸");
        assert_eq!(entities[&EntityCategory::Symptom], vec!["心悸"]);
        assert_eq!(entities[&EntityCategory::Organ], vec!["心"]);
    }

    #[test]
    fn test_find_terms_in_query() {
        let lexicon = EntityLexicon::default();
        assert_eq!(lexicon.find_terms("阴虚失眠怎么调理"), vec!["失眠", "阴虚"]);
        assert!(lexicon.find_terms("你好").is_empty());
    }

    #[test]
    fn test_custom_lexicon() {
        let mut lexicon = EntityLexicon::new();
        lexicon.add(EntityCategory::Therapy, "艾灸");
        lexicon.add(EntityCategory::Therapy, "艾灸");
        lexicon.add(EntityCategory::Herb, "");

        assert_eq!(lexicon.len(), 1);
        assert_eq!(lexicon.category_of("艾灸"), Some(EntityCategory::Therapy));
        assert_eq!(lexicon.category_of("针刺"), None);
    }

    #[test]
    fn test_default_lexicon_classifier() {
        let lexicon = EntityLexicon::default();
        let classifier = lexicon.classifier();

        assert_eq!(classifier.len(), lexicon.len());
        assert!(classifier.is_domain_term(&TaggedToken::new("脾", "n")));
        assert!(!classifier.is_domain_term(&TaggedToken::new("建议", "n")));
    }

    #[test]
    fn test_category_serde_names() {
        for category in EntityCategory::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::Value::String(category.as_str().to_string()));
        }
    }
}
