//! ec-rag CLI
//!
//! Chunk text, score vectors and rank candidates from the command line.
//! Every command prints JSON on stdout; logs go to stderr (`RUST_LOG`).

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ec_rag_lib::{
    config_path, init_dispatcher, mmr_select, rank_top_k, Candidate, ChunkParams, Config,
};

#[derive(Parser)]
#[command(name = "ec-rag")]
#[command(about = "Chunking and similarity core for retrieval pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a text file into chunks
    Chunk {
        /// File to read (or - to read from stdin)
        file: String,
        /// Maximum chunk size in characters (default: from config)
        #[arg(long)]
        max_size: Option<usize>,
        /// Overlap between chunks in characters (default: from config)
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Weighted cosine similarity of two vectors
    Similarity {
        /// Comma-separated components, e.g. 1,0,0.5
        #[arg(long, allow_hyphen_values = true)]
        a: String,
        #[arg(long, allow_hyphen_values = true)]
        b: String,
    },
    /// Rank candidate vectors against a query
    Rank {
        /// Comma-separated query vector
        #[arg(long, allow_hyphen_values = true)]
        query: String,
        /// JSON file: [{"id": "...", "vector": [...]}, ...]
        #[arg(long)]
        candidates: PathBuf,
        #[arg(long)]
        top_k: Option<usize>,
        /// Re-rank with maximal marginal relevance
        #[arg(long)]
        mmr: bool,
        #[arg(long)]
        fetch_k: Option<usize>,
        #[arg(long)]
        lambda: Option<f64>,
    },
    /// Show which backend is in use
    Backend,
    /// Show the effective configuration
    Config,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

#[derive(Deserialize)]
struct CandidateInput {
    id: String,
    vector: Vec<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkOutput<'a> {
    params: ChunkParams,
    count: usize,
    chunks: &'a ec_rag_lib::ChunkSequence,
}

#[derive(Serialize)]
struct SimilarityOutput {
    score: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigOutput {
    path: Option<PathBuf>,
    config: Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    let result = match cli.command {
        Commands::Chunk { file, max_size, overlap } => handle_chunk(&config, &file, max_size, overlap),
        Commands::Similarity { a, b } => handle_similarity(&config, &a, &b),
        Commands::Rank {
            query,
            candidates,
            top_k,
            mmr,
            fetch_k,
            lambda,
        } => handle_rank(&config, &query, &candidates, top_k, mmr, fetch_k, lambda),
        Commands::Backend => handle_backend(&config),
        Commands::Config => handle_config(config),
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let error = ErrorOutput {
                error: format!("{:#}", e),
            };
            match serde_json::to_string(&error) {
                Ok(json) => println!("{}", json),
                Err(_) => println!("{{\"error\":\"unknown error\"}}"),
            }
            std::process::exit(1);
        }
    }
}

// ============ Handlers ============

fn read_input(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
    }
}

fn parse_vector(raw: &str) -> anyhow::Result<Vec<f64>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid vector component: {:?}", part))
        })
        .collect()
}

fn handle_chunk(
    config: &Config,
    file: &str,
    max_size: Option<usize>,
    overlap: Option<usize>,
) -> anyhow::Result<String> {
    let text = read_input(file)?;
    let params = ChunkParams::new(
        max_size.unwrap_or(config.chunking.max_size),
        overlap.unwrap_or(config.chunking.overlap),
    )?;

    let chunks = init_dispatcher(config).chunk_with(&text, params);
    let output = ChunkOutput {
        params,
        count: chunks.len(),
        chunks: &chunks,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn handle_similarity(config: &Config, a: &str, b: &str) -> anyhow::Result<String> {
    let a = parse_vector(a)?;
    let b = parse_vector(b)?;
    let score = init_dispatcher(config).similarity(&a, &b)?;
    Ok(serde_json::to_string_pretty(&SimilarityOutput { score })?)
}

fn handle_rank(
    config: &Config,
    query: &str,
    candidates_path: &Path,
    top_k: Option<usize>,
    mmr: bool,
    fetch_k: Option<usize>,
    lambda: Option<f64>,
) -> anyhow::Result<String> {
    let query = parse_vector(query)?;
    let content = std::fs::read_to_string(candidates_path)
        .with_context(|| format!("Failed to read {}", candidates_path.display()))?;
    let inputs: Vec<CandidateInput> =
        serde_json::from_str(&content).context("Invalid candidates file")?;

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        bail!("--top-k must be greater than 0");
    }

    let candidates: Vec<Candidate<'_>> = inputs
        .iter()
        .map(|c| Candidate {
            id: &c.id,
            vector: &c.vector,
        })
        .collect();

    let dispatcher = init_dispatcher(config);
    let ranked = if mmr {
        mmr_select(
            dispatcher,
            &query,
            &candidates,
            top_k,
            fetch_k.unwrap_or(config.retrieval.fetch_k),
            lambda.unwrap_or(config.retrieval.lambda),
        )?
    } else {
        rank_top_k(dispatcher, &query, &candidates, top_k)?
    };

    Ok(serde_json::to_string_pretty(&ranked)?)
}

fn handle_backend(config: &Config) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&init_dispatcher(config).status())?)
}

fn handle_config(config: Config) -> anyhow::Result<String> {
    let output = ConfigOutput {
        path: config_path(),
        config,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}
