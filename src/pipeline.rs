//! Document processing: clean, chunk and enrich.
//!
//! [`DocumentProcessor`] is stateless once built, so documents can be
//! processed in parallel. [`DocumentProcessor::process_documents`] fans out
//! over a rayon pool and returns documents in input order.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::analysis::segmenter::Segmenter;
use crate::chunking::{Chunker, TextCleaner};
use crate::config::WenkuConfig;
use crate::document::{Chunk, Document};
use crate::enrich::{DomainTermClassifier, EntityLexicon, TermEnricher};
use crate::error::Result;

/// The chunking and enrichment pipeline.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    cleaner: TextCleaner,
    chunker: Chunker,
    enricher: TermEnricher,
    entities: Arc<EntityLexicon>,
}

impl DocumentProcessor {
    /// Build a processor, validating the configuration up front.
    pub fn new(config: &WenkuConfig, segmenter: Arc<dyn Segmenter>) -> Result<Self> {
        config.validate()?;
        Ok(DocumentProcessor {
            cleaner: TextCleaner::new(config.cleaner),
            chunker: Chunker::new(config.chunker)?,
            enricher: TermEnricher::new(segmenter, config.enricher.clone()),
            entities: Arc::new(EntityLexicon::default()),
        })
    }

    /// Build a processor with a custom domain-term classifier.
    pub fn with_classifier(
        config: &WenkuConfig,
        segmenter: Arc<dyn Segmenter>,
        classifier: Arc<dyn DomainTermClassifier>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(DocumentProcessor {
            cleaner: TextCleaner::new(config.cleaner),
            chunker: Chunker::new(config.chunker)?,
            enricher: TermEnricher::with_classifier(segmenter, classifier, config.enricher.clone()),
            entities: Arc::new(EntityLexicon::default()),
        })
    }

    /// Replace the lexicon used to fill [`Chunk::entities`].
    pub fn with_entity_lexicon(mut self, lexicon: EntityLexicon) -> Self {
        self.entities = Arc::new(lexicon);
        self
    }

    pub fn entity_lexicon(&self) -> &EntityLexicon {
        &self.entities
    }

    /// Clean, chunk and enrich a document, replacing any previous chunks.
    pub fn process_document(&self, mut document: Document) -> Document {
        let cleaned = self.cleaner.clean(&document.content);

        document.chunks = self
            .chunker
            .chunk(&cleaned)
            .into_iter()
            .map(|content| {
                let (domain_terms, weight, degraded) =
                    self.enricher.enrich(&content, document.doc_type).into_parts();
                Chunk {
                    entities: self.entities.extract(&content),
                    content,
                    domain_terms,
                    weight,
                    doc_type: document.doc_type,
                    source: document.source.clone(),
                    title: document.title.clone(),
                    metadata: document.metadata.clone(),
                    degraded,
                }
            })
            .collect();

        debug!(document = %document.id, chunks = document.chunks.len(), "processed document");
        document
    }

    /// Process documents in parallel, preserving order.
    pub fn process_documents(&self, documents: Vec<Document>) -> Vec<Document> {
        documents
            .into_par_iter()
            .map(|document| self.process_document(document))
            .collect()
    }
}
