//! Documents, chunks and their stored record form.
//!
//! A [`Document`] is created by the caller and filled with [`Chunk`]s by the
//! processing pipeline. Chunks are the indexed and retrieved units; each is
//! flattened into a [`Record`] for the document store.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enrich::entities::{EntityMap, entity_count};
use crate::store::Record;

/// Document categories, each with a base relevance weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// Classical texts and canonical commentaries
    ClassicText,
    /// Clinical practice guidelines
    ClinicalGuideline,
    /// Prescriptions and formula descriptions
    Prescription,
    /// Single-herb monographs
    HerbMonograph,
    /// Research papers
    ResearchPaper,
    /// Case records
    MedicalRecord,
    /// Health education material for the public
    HealthEducation,
    /// Anything else
    General,
}

impl DocType {
    /// Every document category.
    pub const ALL: [DocType; 8] = [
        DocType::ClassicText,
        DocType::ClinicalGuideline,
        DocType::Prescription,
        DocType::HerbMonograph,
        DocType::ResearchPaper,
        DocType::MedicalRecord,
        DocType::HealthEducation,
        DocType::General,
    ];

    /// Default base weight of this category.
    pub fn base_weight(self) -> f64 {
        match self {
            DocType::ClassicText => 1.0,
            DocType::ClinicalGuideline => 0.95,
            DocType::Prescription => 0.9,
            DocType::HerbMonograph => 0.9,
            DocType::ResearchPaper => 0.85,
            DocType::MedicalRecord => 0.85,
            DocType::HealthEducation => 0.8,
            DocType::General => 0.7,
        }
    }

    /// Serialized name, as stored in records and used in filters.
    pub fn as_str(self) -> &'static str {
        match self {
            DocType::ClassicText => "classic_text",
            DocType::ClinicalGuideline => "clinical_guideline",
            DocType::Prescription => "prescription",
            DocType::HerbMonograph => "herb_monograph",
            DocType::ResearchPaper => "research_paper",
            DocType::MedicalRecord => "medical_record",
            DocType::HealthEducation => "health_education",
            DocType::General => "general",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: String,

    /// Raw text
    pub content: String,

    /// Category of the document
    pub doc_type: DocType,

    pub title: String,

    pub source: String,

    /// Free-form string attributes, copied onto every chunk
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Chunks, in document order. Empty until processed.
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl Document {
    /// Create an unprocessed document.
    pub fn new<I: Into<String>, C: Into<String>>(id: I, content: C, doc_type: DocType) -> Self {
        Document {
            id: id.into(),
            content: content.into(),
            doc_type,
            title: String::new(),
            source: String::new(),
            metadata: BTreeMap::new(),
            chunks: Vec::new(),
        }
    }

    /// A fresh random identifier for callers without their own ids.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = source.into();
        self
    }

    /// Add a metadata attribute.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns true once the pipeline has produced chunks.
    pub fn is_processed(&self) -> bool {
        !self.chunks.is_empty()
    }

    /// Store identifier of the chunk at `index`.
    pub fn chunk_id(&self, index: usize) -> String {
        chunk_id(&self.id, index)
    }
}

/// Store identifier of a document's chunk.
pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{document_id}_chunk_{index}")
}

/// A bounded span of a document's cleaned text with its enrichment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,

    /// Domain terms in order of appearance, duplicates preserved
    pub domain_terms: Vec<String>,

    /// Importance weight used for downstream relevance boosting
    pub weight: f64,

    pub doc_type: DocType,

    pub source: String,

    pub title: String,

    pub metadata: BTreeMap<String, String>,

    /// Lexicon entities contained in the content, by category
    #[serde(default)]
    pub entities: EntityMap,

    /// Why enrichment fell back to defaults, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl Chunk {
    /// Flatten into a store record.
    ///
    /// Metadata keys sit next to the core fields so filters can address them
    /// directly; a metadata key never overrides a core field.
    pub fn to_record(&self, document_id: &str, index: usize) -> Record {
        let mut record = Record::new();
        for (key, value) in &self.metadata {
            record.insert(key.clone(), Value::String(value.clone()));
        }

        record.insert("id".into(), Value::String(chunk_id(document_id, index)));
        record.insert("document_id".into(), Value::String(document_id.to_string()));
        record.insert("chunk_index".into(), Value::from(index));
        record.insert("content".into(), Value::String(self.content.clone()));
        record.insert("doc_type".into(), Value::String(self.doc_type.as_str().into()));
        record.insert("title".into(), Value::String(self.title.clone()));
        record.insert("source".into(), Value::String(self.source.clone()));
        record.insert(
            "domain_terms".into(),
            Value::Array(
                self.domain_terms
                    .iter()
                    .map(|term| Value::String(term.clone()))
                    .collect(),
            ),
        );
        record.insert("weight".into(), Value::from(self.weight));
        record.insert(
            "entities".into(),
            Value::Object(
                self.entities
                    .iter()
                    .map(|(category, terms)| {
                        (
                            category.as_str().to_string(),
                            Value::Array(terms.iter().map(|t| Value::String(t.clone())).collect()),
                        )
                    })
                    .collect(),
            ),
        );
        record.insert("entity_count".into(), Value::from(entity_count(&self.entities)));
        if let Some(reason) = &self.degraded {
            record.insert("degraded".into(), Value::String(reason.clone()));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::entities::EntityCategory;

    fn sample_chunk() -> Chunk {
        let mut metadata = BTreeMap::new();
        metadata.insert("category".to_string(), "constitution".to_string());
        metadata.insert("title".to_string(), "metadata must not win".to_string());

        Chunk {
            content: "气虚体质宜补气".to_string(),
            domain_terms: vec!["气虚".to_string(), "体质".to_string()],
            weight: 0.814,
            doc_type: DocType::ClinicalGuideline,
            source: "guideline-2021".to_string(),
            title: "气虚体质调理".to_string(),
            metadata,
            entities: [
                (EntityCategory::Pathology, vec!["气虚".to_string()]),
                (EntityCategory::Therapy, vec!["补气".to_string()]),
            ]
            .into_iter()
            .collect(),
            degraded: None,
        }
    }

    #[test]
    fn test_doc_type_serde_names() {
        for doc_type in DocType::ALL {
            let json = serde_json::to_value(doc_type).unwrap();
            assert_eq!(json, Value::String(doc_type.as_str().to_string()));
        }
    }

    #[test]
    fn test_base_weights_in_range() {
        for doc_type in DocType::ALL {
            let weight = doc_type.base_weight();
            assert!(weight > 0.0 && weight <= 1.0, "{doc_type}: {weight}");
        }
    }

    #[test]
    fn test_chunk_record_fields() {
        let record = sample_chunk().to_record("doc-7", 2);

        assert_eq!(record["id"], "doc-7_chunk_2");
        assert_eq!(record["document_id"], "doc-7");
        assert_eq!(record["chunk_index"], 2);
        assert_eq!(record["doc_type"], "clinical_guideline");
        assert_eq!(record["category"], "constitution");
        assert_eq!(record["title"], "气虚体质调理");
        assert_eq!(record["domain_terms"], serde_json::json!(["气虚", "体质"]));
        assert!(!record.contains_key("degraded"));
    }

    #[test]
    fn test_chunk_record_entities() {
        let record = sample_chunk().to_record("doc-7", 0);

        assert_eq!(
            record["entities"],
            serde_json::json!({"pathology": ["气虚"], "therapy": ["补气"]})
        );
        assert_eq!(record["entity_count"], 2);

        let mut bare = sample_chunk();
        bare.entities.clear();
        let record = bare.to_record("doc-7", 0);
        assert_eq!(record["entities"], serde_json::json!({}));
        assert_eq!(record["entity_count"], 0);
    }

    #[test]
    fn test_chunk_without_entities_deserializes() {
        let mut json = serde_json::to_value(sample_chunk()).unwrap();
        json.as_object_mut().unwrap().remove("entities");
        let chunk: Chunk = serde_json::from_value(json).unwrap();
        assert!(chunk.entities.is_empty());
    }

    #[test]
    fn test_document_builder() {
        let doc = Document::new("d1", "正文", DocType::General)
            .with_title("标题")
            .with_source("manual")
            .with_metadata("lang", "zh");

        assert_eq!(doc.title, "标题");
        assert_eq!(doc.metadata.get("lang").map(String::as_str), Some("zh"));
        assert!(!doc.is_processed());
        assert_eq!(doc.chunk_id(0), "d1_chunk_0");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(Document::generate_id(), Document::generate_id());
    }
}
