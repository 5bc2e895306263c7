//! In-memory knowledge base.
//!
//! Holds chunked source documents and the embeddings a caller attaches to
//! them. Embedding generation is external: callers pull pending chunks with
//! [`KnowledgeBase::embedding_batches`], embed them, and hand the vectors back.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::rank::{apply_threshold, mmr_select, rank_top_k, Candidate};
use crate::backend::Dispatcher;
use crate::chunker::ChunkParams;
use crate::config::{Config, RetrievalConfig};
use crate::error::{CoreError, Result};

/// Already-extracted text of one document or page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub source: String,
    pub page: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// Sources skipped because they had no text
    pub skipped: Vec<String>,
}

/// A chunk still waiting for its embedding
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChunk {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub chunk_id: String,
    pub source: String,
    pub page: Option<u32>,
    pub content: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStats {
    pub documents: usize,
    pub chunks: usize,
    pub embedded: usize,
}

struct StoredChunk {
    id: String,
    source: String,
    page: Option<u32>,
    content: String,
    embedding: Option<Vec<f64>>,
}

#[derive(Default)]
struct KnowledgeStore {
    documents: usize,
    chunks: Vec<StoredChunk>,
    by_id: HashMap<String, usize>,
    dimension: Option<usize>,
}

pub struct KnowledgeBase<'d> {
    dispatcher: &'d Dispatcher,
    params: ChunkParams,
    batch_size: usize,
    store: RwLock<KnowledgeStore>,
}

impl<'d> KnowledgeBase<'d> {
    pub fn new(dispatcher: &'d Dispatcher, params: ChunkParams, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(CoreError::InvalidParameter(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            dispatcher,
            params,
            batch_size,
            store: RwLock::new(KnowledgeStore::default()),
        })
    }

    pub fn from_config(dispatcher: &'d Dispatcher, config: &Config) -> Result<Self> {
        let params = ChunkParams::new(config.chunking.max_size, config.chunking.overlap)?;
        Self::new(dispatcher, params, config.ingest.batch_size)
    }

    /// Chunk and store `documents`. Blank documents are skipped; if nothing
    /// at all is produced the store is left untouched and `NoContent` returned.
    pub fn ingest(&self, documents: &[SourceDocument]) -> Result<IngestReport> {
        let mut staged = Vec::new();
        let mut skipped = Vec::new();
        let mut ingested = 0;

        for doc in documents {
            let chunks = self.dispatcher.chunk_with(&doc.text, self.params);
            if chunks.is_empty() {
                warn!(source = %doc.source, page = ?doc.page, "Document has no text, skipping");
                skipped.push(doc.source.clone());
                continue;
            }
            ingested += 1;
            for chunk in chunks {
                staged.push(StoredChunk {
                    id: Ulid::new().to_string(),
                    source: doc.source.clone(),
                    page: doc.page,
                    content: chunk.content,
                    embedding: None,
                });
            }
        }

        if staged.is_empty() {
            return Err(CoreError::NoContent);
        }

        let count = staged.len();
        let mut store = self.store.write();
        store.documents += ingested;
        for chunk in staged {
            let position = store.chunks.len();
            store.by_id.insert(chunk.id.clone(), position);
            store.chunks.push(chunk);
        }

        info!(documents = ingested, chunks = count, skipped = skipped.len(), "Ingested documents");
        Ok(IngestReport {
            documents: ingested,
            chunks: count,
            skipped,
        })
    }

    /// Chunks without an embedding, grouped into batches of `batch_size`
    pub fn embedding_batches(&self) -> Vec<Vec<PendingChunk>> {
        let store = self.store.read();
        let pending: Vec<PendingChunk> = store
            .chunks
            .iter()
            .filter(|c| c.embedding.is_none())
            .map(|c| PendingChunk {
                id: c.id.clone(),
                content: c.content.clone(),
            })
            .collect();

        pending
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect()
    }

    /// Attach one vector per id. Either every vector is stored or none is.
    pub fn attach_embeddings(&self, ids: &[String], vectors: Vec<Vec<f64>>) -> Result<usize> {
        if ids.len() != vectors.len() {
            return Err(CoreError::InvalidParameter(format!(
                "{} ids but {} vectors",
                ids.len(),
                vectors.len()
            )));
        }

        let mut store = self.store.write();
        let mut dimension = store.dimension;
        let mut positions = Vec::with_capacity(ids.len());

        for (id, vector) in ids.iter().zip(&vectors) {
            let position = *store
                .by_id
                .get(id)
                .ok_or_else(|| CoreError::UnknownChunk(id.clone()))?;
            match dimension {
                Some(expected) if expected != vector.len() => {
                    return Err(CoreError::LengthMismatch {
                        left: expected,
                        right: vector.len(),
                    });
                }
                _ => dimension = Some(vector.len()),
            }
            positions.push(position);
        }

        store.dimension = dimension;
        for (position, vector) in positions.into_iter().zip(vectors) {
            store.chunks[position].embedding = Some(vector);
        }

        debug!(count = ids.len(), dimension = ?dimension, "Attached embeddings");
        Ok(ids.len())
    }

    /// Rank embedded chunks against `query`.
    pub fn search(&self, query: &[f64], config: &RetrievalConfig) -> Result<Vec<SearchHit>> {
        if config.top_k == 0 {
            return Err(CoreError::InvalidParameter(
                "top_k must be greater than 0".to_string(),
            ));
        }

        let store = self.store.read();
        let candidates: Vec<Candidate<'_>> = store
            .chunks
            .iter()
            .filter_map(|c| {
                c.embedding.as_deref().map(|vector| Candidate {
                    id: c.id.as_str(),
                    vector,
                })
            })
            .collect();

        let mut ranked = if config.use_mmr {
            mmr_select(
                self.dispatcher,
                query,
                &candidates,
                config.top_k,
                config.fetch_k,
                config.lambda,
            )?
        } else {
            rank_top_k(self.dispatcher, query, &candidates, config.top_k)?
        };
        if let Some(min_score) = config.min_score {
            ranked = apply_threshold(ranked, min_score);
        }

        let hits: Vec<SearchHit> = ranked
            .into_iter()
            .filter_map(|r| {
                let chunk = &store.chunks[*store.by_id.get(&r.id)?];
                Some(SearchHit {
                    chunk_id: r.id,
                    source: chunk.source.clone(),
                    page: chunk.page,
                    content: chunk.content.clone(),
                    score: r.score,
                })
            })
            .collect();

        debug!(candidates = candidates.len(), hits = hits.len(), mmr = config.use_mmr, "Searched knowledge base");
        Ok(hits)
    }

    pub fn stats(&self) -> KnowledgeStats {
        let store = self.store.read();
        KnowledgeStats {
            documents: store.documents,
            chunks: store.chunks.len(),
            embedded: store.chunks.iter().filter(|c| c.embedding.is_some()).count(),
        }
    }

    pub fn clear(&self) {
        *self.store.write() = KnowledgeStore::default();
    }
}
