//! Query-time retrieval: rank, join with the store, filter, bound.
//!
//! [`Retriever`] is the single entry point callers use. It owns the shared
//! [`Bm25Index`], a [`DocumentStore`] holding the chunk records, and the
//! [`DocumentProcessor`] used to ingest new documents.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use wenku::analysis::DictionarySegmenter;
//! use wenku::config::WenkuConfig;
//! use wenku::document::{DocType, Document};
//! use wenku::retrieval::{RecordFilter, Retriever};
//! use wenku::store::MemoryStore;
//!
//! let retriever = Retriever::new(
//!     &WenkuConfig::default(),
//!     Arc::new(DictionarySegmenter::default()),
//!     Arc::new(MemoryStore::new()),
//! )
//! .unwrap();
//!
//! retriever
//!     .ingest(vec![
//!         Document::new("a", "气虚体质宜补气养生。", DocType::ClinicalGuideline),
//!         Document::new("b", "阴虚体质宜滋阴调理。", DocType::HealthEducation),
//!     ])
//!     .unwrap();
//!
//! let filter = RecordFilter::new().eq("doc_type", "clinical_guideline");
//! let hits = retriever.search("体质", 5, Some(&filter));
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].id, "a_chunk_0");
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analysis::segmenter::Segmenter;
use crate::bm25::Bm25Index;
use crate::config::WenkuConfig;
use crate::document::Document;
use crate::enrich::EntityMap;
use crate::error::{Result, WenkuError};
use crate::pipeline::DocumentProcessor;
use crate::store::{DocumentStore, Record};

/// Equality constraints over record fields.
///
/// A record matches when every constrained key is present with an equal
/// value. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordFilter {
    conditions: BTreeMap<String, Value>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `record[key] == value`.
    pub fn eq<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(key, value)| record.get(key) == Some(value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RecordFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RecordFilter {
            conditions: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// One retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,

    /// The stored record with a `score` field added.
    pub record: Record,
}

/// Outcome of [`Retriever::ingest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents_indexed: usize,
    pub chunks_indexed: usize,

    /// Documents left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Ranks, joins and filters over a shared index and store.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<Bm25Index>,
    store: Arc<dyn DocumentStore>,
    processor: DocumentProcessor,
    default_top_k: usize,
}

impl Retriever {
    /// Build a retriever with a fresh index.
    ///
    /// The same segmenter serves enrichment, indexing and queries.
    pub fn new(
        config: &WenkuConfig,
        segmenter: Arc<dyn Segmenter>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let processor = DocumentProcessor::new(config, segmenter.clone())?;
        let index = Arc::new(Bm25Index::from_config(config, segmenter)?);
        Ok(Self::from_parts(index, store, processor, config.default_top_k))
    }

    pub fn from_parts(
        index: Arc<Bm25Index>,
        store: Arc<dyn DocumentStore>,
        processor: DocumentProcessor,
        default_top_k: usize,
    ) -> Self {
        Retriever {
            index,
            store,
            processor,
            default_top_k,
        }
    }

    pub fn index(&self) -> &Arc<Bm25Index> {
        &self.index
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn processor(&self) -> &DocumentProcessor {
        &self.processor
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Lexicon entities mentioned by a query, by category.
    pub fn query_entities(&self, query: &str) -> EntityMap {
        self.processor.entity_lexicon().extract(query)
    }

    /// Search with the configured default result count.
    pub fn search_default(&self, query: &str, filter: Option<&RecordFilter>) -> Vec<SearchHit> {
        self.search(query, self.default_top_k, filter)
    }

    /// Rank units for `query` and return at most `top_k` stored records
    /// that pass `filter`, best first. `top_k == 0` means no limit.
    ///
    /// Ranked ids missing from the store are skipped, as are records the
    /// store fails to read.
    pub fn search(&self, query: &str, top_k: usize, filter: Option<&RecordFilter>) -> Vec<SearchHit> {
        let ranked = self.index.score(query, None);
        let candidates = ranked.len();
        let mut hits = Vec::new();

        for (id, score) in ranked {
            let mut record = match self.store.get(&id) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!(unit = %id, "ranked unit missing from store");
                    continue;
                }
                Err(e) => {
                    warn!(unit = %id, error = %e, "failed to read ranked unit");
                    continue;
                }
            };
            record.insert("score".to_string(), Value::from(score));

            if let Some(filter) = filter
                && !filter.matches(&record)
            {
                continue;
            }

            hits.push(SearchHit { id, score, record });
            if top_k > 0 && hits.len() >= top_k {
                break;
            }
        }

        debug!(query, candidates, hits = hits.len(), "search finished");
        hits
    }

    /// Process documents, store their chunk records and index the chunks.
    ///
    /// Failures stay contained to one document, which is skipped and
    /// reported: chunks that cannot be tokenized, an id that is already
    /// stored or repeated within the call, or a store write error. Records
    /// written for a skipped document are removed again. Units of all
    /// surviving documents go into the index as one batch.
    pub fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport> {
        let processed = self.processor.process_documents(documents);
        let mut report = IngestReport::default();
        let mut seen = HashSet::new();
        let mut batch = Vec::new();

        for document in processed {
            match self.stage_document(&document, &mut seen) {
                Ok(units) => {
                    report.documents_indexed += 1;
                    batch.extend(units);
                }
                Err(e) => {
                    warn!(document = %document.id, error = %e, "skipping document");
                    report.skipped.push((document.id.clone(), e.to_string()));
                }
            }
        }

        report.chunks_indexed = self.index.add_tokenized(batch);
        info!(
            documents = report.documents_indexed,
            chunks = report.chunks_indexed,
            skipped = report.skipped.len(),
            "ingest finished"
        );
        Ok(report)
    }

    /// Tokenize a document's chunks and write their records.
    ///
    /// On error nothing of the document remains in the store.
    fn stage_document(
        &self,
        document: &Document,
        seen: &mut HashSet<String>,
    ) -> Result<Vec<(String, Vec<String>)>> {
        if !seen.insert(document.id.clone()) {
            return Err(WenkuError::index_mutation(format!(
                "document {} appears more than once in the batch",
                document.id
            )));
        }

        let ids: Vec<String> = (0..document.chunks.len())
            .map(|i| document.chunk_id(i))
            .collect();
        for id in &ids {
            if self.store.contains(id)? {
                return Err(WenkuError::index_mutation(format!(
                    "document {} is already indexed ({id} exists)",
                    document.id
                )));
            }
        }

        let mut units = Vec::with_capacity(ids.len());
        for (id, chunk) in ids.iter().zip(&document.chunks) {
            units.push((id.clone(), self.index.tokenize(&chunk.content)?));
        }

        for (i, chunk) in document.chunks.iter().enumerate() {
            if let Err(e) = self.store.put(&ids[i], chunk.to_record(&document.id, i)) {
                for written in &ids[..i] {
                    if let Err(rollback) = self.store.remove(written) {
                        warn!(unit = %written, error = %rollback, "failed to remove partial record");
                    }
                }
                return Err(e);
            }
        }

        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::segmenter::DictionarySegmenter;
    use crate::analysis::token::TaggedToken;
    use crate::config::ChunkerConfig;
    use crate::document::DocType;
    use crate::store::MemoryStore;
    use serde_json::json;

    struct PickySegmenter;

    impl Segmenter for PickySegmenter {
        fn segment(&self, text: &str) -> Result<Vec<TaggedToken>> {
            if text.contains("坏") {
                return Err(WenkuError::analysis("unreadable text"));
            }
            DictionarySegmenter::default().segment(text)
        }

        fn name(&self) -> &'static str {
            "picky"
        }
    }

    fn retriever_with(segmenter: Arc<dyn Segmenter>) -> (Retriever, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let retriever = Retriever::new(&WenkuConfig::default(), segmenter, store.clone()).unwrap();
        (retriever, store)
    }

    fn retriever() -> (Retriever, Arc<MemoryStore>) {
        retriever_with(Arc::new(DictionarySegmenter::default()))
    }

    /// Rejects writes to ids containing a marker.
    #[derive(Debug)]
    struct RejectingStore {
        inner: MemoryStore,
        marker: &'static str,
    }

    impl DocumentStore for RejectingStore {
        fn get(&self, id: &str) -> Result<Option<Record>> {
            self.inner.get(id)
        }

        fn put(&self, id: &str, record: Record) -> Result<()> {
            if id.contains(self.marker) {
                return Err(WenkuError::storage(format!("disk full writing {id}")));
            }
            self.inner.put(id, record)
        }

        fn remove(&self, id: &str) -> Result<bool> {
            self.inner.remove(id)
        }
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_filter_matching() {
        let filter = RecordFilter::new().eq("category", "constitution").eq("year", 2021);

        assert!(filter.matches(&record(json!({"category": "constitution", "year": 2021, "x": 1}))));
        assert!(!filter.matches(&record(json!({"category": "constitution", "year": "2021"}))));
        assert!(!filter.matches(&record(json!({"category": "constitution"}))));
        assert!(RecordFilter::new().matches(&Record::new()));
    }

    #[test]
    fn test_filter_from_iter() {
        let filter: RecordFilter = [("doc_type", "general")].into_iter().collect();
        assert_eq!(filter, RecordFilter::new().eq("doc_type", "general"));
    }

    #[test]
    fn test_search_joins_and_adds_score() {
        let (retriever, _) = retriever();
        retriever.index().add_unit("u1", "气虚体质").unwrap();
        retriever.index().add_unit("u2", "阴虚体质").unwrap();
        retriever.index().add_unit("u3", "调理").unwrap();
        retriever
            .store()
            .put("u1", record(json!({"content": "气虚体质"})))
            .unwrap();

        let hits = retriever.search("气虚", 10, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "u1");
        assert_eq!(hits[0].record["content"], "气虚体质");
        assert_eq!(hits[0].record["score"], json!(hits[0].score));
    }

    #[test]
    fn test_missing_records_skipped() {
        let (retriever, store) = retriever();
        for id in ["a", "b", "c"] {
            retriever.index().add_unit(id, "气虚").unwrap();
        }
        retriever.index().add_unit("z", "阴虚").unwrap();
        store.put("b", Record::new()).unwrap();

        let hits = retriever.search("气虚", 0, None);
        let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_top_k_stops_after_filtering() {
        let (retriever, store) = retriever();
        for (id, text) in [("a", "气虚"), ("b", "气虚 体质"), ("c", "气虚 体质 调理")] {
            retriever.index().add_unit(id, text).unwrap();
        }
        for i in 0..5 {
            retriever.index().add_unit(&format!("z{i}"), "阴虚").unwrap();
        }
        store.put("a", record(json!({"keep": false}))).unwrap();
        store.put("b", record(json!({"keep": true}))).unwrap();
        store.put("c", record(json!({"keep": true}))).unwrap();

        // "a" is the shortest unit and ranks first, but the filter drops it.
        let filter = RecordFilter::new().eq("keep", true);
        let hits = retriever.search("气虚", 1, Some(&filter));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[test]
    fn test_no_results() {
        let (retriever, _) = retriever();
        assert!(retriever.search("气虚", 5, None).is_empty());
        retriever.index().add_unit("a", "阴虚").unwrap();
        assert!(retriever.search("气虚", 5, None).is_empty());
        assert!(retriever.search("", 5, None).is_empty());
    }

    #[test]
    fn test_ingest_stores_and_indexes_chunks() {
        let (retriever, store) = retriever();
        let document = Document::new("d1", "气虚体质宜补气。\n\n阴虚体质宜滋阴。", DocType::ClassicText)
            .with_metadata("category", "constitution");

        let report = retriever.ingest(vec![document]).unwrap();

        assert_eq!(report.documents_indexed, 1);
        assert_eq!(report.chunks_indexed, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(store.ids(), vec!["d1_chunk_0"]);

        let hits = retriever.search("阴虚", 5, Some(&RecordFilter::new().eq("category", "constitution")));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record["document_id"], "d1");
        assert_eq!(hits[0].record["doc_type"], "classic_text");
        assert_eq!(
            hits[0].record["entities"],
            json!({"pathology": ["气虚", "阴虚"], "therapy": ["补气", "滋阴"]})
        );
        assert_eq!(hits[0].record["entity_count"], 4);
    }

    #[test]
    fn test_query_entities() {
        use crate::enrich::EntityCategory;

        let (retriever, _) = retriever();
        let entities = retriever.query_entities("气虚质乏力吃什么");

        assert_eq!(entities[&EntityCategory::Constitution], vec!["气虚质"]);
        assert_eq!(entities[&EntityCategory::Symptom], vec!["乏力"]);
        assert!(retriever.query_entities("今天天气").is_empty());
    }

    #[test]
    fn test_ingest_skips_untokenizable_documents() {
        let (retriever, store) = retriever_with(Arc::new(PickySegmenter));

        let report = retriever
            .ingest(vec![
                Document::new("good", "气虚体质", DocType::General),
                Document::new("bad", "坏的内容", DocType::General),
            ])
            .unwrap();

        assert_eq!(report.documents_indexed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "bad");
        assert_eq!(store.ids(), vec!["good_chunk_0"]);
        assert_eq!(retriever.index().len(), 1);
    }

    #[test]
    fn test_reingest_leaves_index_statistics_intact() {
        let (retriever, store) = retriever();
        let documents = || {
            vec![
                Document::new("d1", "气虚体质养生建议", DocType::General),
                Document::new("d2", "阴虚体质调理", DocType::General),
            ]
        };

        let first = retriever.ingest(documents()).unwrap();
        assert_eq!(first.documents_indexed, 2);

        let second = retriever.ingest(documents()).unwrap();
        assert_eq!(second.documents_indexed, 0);
        assert_eq!(second.chunks_indexed, 0);
        let skipped: Vec<&str> = second.skipped.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(skipped, vec!["d1", "d2"]);

        assert_eq!(store.len(), 2);
        retriever.index().with_stats(|stats| {
            assert_eq!(stats.total_units(), 2);
            assert_eq!(stats.avg_unit_length(), 3.5);
            assert_eq!(stats.doc_freq("体质"), 2);
            for term in stats.terms() {
                assert_eq!(stats.doc_freq(term), stats.posting_count(term));
            }
        });
    }

    #[test]
    fn test_repeated_id_within_one_ingest() {
        let (retriever, store) = retriever();
        let report = retriever
            .ingest(vec![
                Document::new("same", "气虚体质", DocType::General),
                Document::new("same", "阴虚体质", DocType::General),
            ])
            .unwrap();

        assert_eq!(report.documents_indexed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(retriever.index().len(), 1);
        assert_eq!(store.get("same_chunk_0").unwrap().unwrap()["content"], "气虚体质");
    }

    #[test]
    fn test_store_failure_contained_to_one_document() {
        let store = Arc::new(RejectingStore {
            inner: MemoryStore::new(),
            marker: "partial_chunk_1",
        });
        let config = WenkuConfig {
            chunker: ChunkerConfig {
                min_chunk_size: 2,
                chunk_size: 10,
                max_chunk_size: 20,
            },
            ..WenkuConfig::default()
        };
        let retriever =
            Retriever::new(&config, Arc::new(DictionarySegmenter::default()), store.clone()).unwrap();

        let report = retriever
            .ingest(vec![
                Document::new("first", "气虚体质", DocType::General),
                Document::new("partial", "气虚体质养生建议\n阴虚体质调理滋阴补气", DocType::General),
                Document::new("last", "阴虚调理", DocType::General),
            ])
            .unwrap();

        assert_eq!(report.documents_indexed, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "partial");
        assert!(report.skipped[0].1.contains("disk full"));

        assert_eq!(store.inner.ids(), vec!["first_chunk_0", "last_chunk_0"]);
        assert_eq!(retriever.index().len(), 2);
        let ids: Vec<String> = retriever
            .search("气虚", 0, None)
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        assert_eq!(ids, vec!["first_chunk_0"]);
    }
}
