//! Retrieval
//!
//! Ranking built on the dispatcher's similarity, and an in-memory
//! knowledge base that ties chunking, embeddings and search together.

pub mod knowledge;
pub mod rank;

pub use knowledge::{IngestReport, KnowledgeBase, KnowledgeStats, PendingChunk, SearchHit, SourceDocument};
pub use rank::{apply_threshold, mmr_select, rank_top_k, Candidate, Ranked};
