// ec-rag Library
// Chunking and similarity core for retrieval pipelines, used by the CLI binary

pub mod backend;
pub mod chunker;
pub mod config;
pub mod error;
pub mod retrieval;
pub mod similarity;

pub use backend::{
    chunk, dispatcher, init_dispatcher, similarity, Backend, BackendError, Dispatcher,
    DispatcherStatus, ImplementationMode, NativeBackend, ReferenceBackend,
};
pub use chunker::{
    Chunk, ChunkParams, ChunkSequence, SeparatorLadder, DEFAULT_MAX_SIZE, DEFAULT_OVERLAP,
    DEFAULT_SEPARATORS,
};
pub use config::{
    config_path, default_config_path, BackendConfig, BackendPreference, ChunkingConfig, Config,
    ConfigError, IngestConfig, RetrievalConfig,
};
pub use error::{CoreError, Result};
pub use retrieval::{
    apply_threshold, mmr_select, rank_top_k, Candidate, IngestReport, KnowledgeBase,
    KnowledgeStats, PendingChunk, Ranked, SearchHit, SourceDocument,
};
pub use similarity::{DOMAIN_WEIGHT, UNDEFINED_SIMILARITY};
