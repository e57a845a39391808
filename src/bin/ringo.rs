//! Ringo CLI
//!
//! Compresses extracted document text into an LLM context budget and reports
//! token telemetry. All output is JSON on stdout; logs go to stderr.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ringo_lib::{
    count_tokens, estimate_tokens, extract_keywords_from_query, prepare_document_context,
    CompressedDocument, CompressionStats, ContextConfig, DocumentCompressor, RawDocument, TokenBudget,
};

#[derive(Parser)]
#[command(name = "ringo")]
#[command(about = "Ringo CLI - Fit documents into an LLM context budget", long_about = None)]
struct Cli {
    /// Path to a JSON context config (defaults to $RINGO_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress extracted text files for one LLM call
    Compress {
        /// Text files, one document each
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// User query; its keywords bias section selection
        #[arg(short, long)]
        query: Option<String>,
        /// Override the document count used for budget allocation
        #[arg(long)]
        total_docs: Option<usize>,
        /// Print the assembled, delimited context instead of per-document results
        #[arg(long)]
        context: bool,
    },
    /// Show the per-document budget for a document count
    Budget {
        /// Number of documents in the turn
        #[arg(short, long, default_value = "1")]
        docs: usize,
    },
    /// Extract priority keywords from a query
    Keywords {
        query: String,
    },
    /// Token counting commands
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Exact cl100k_base count
    Count {
        /// Text to count (or - to read from stdin)
        text: String,
    },
    /// Budget estimate (4 chars per token)
    Estimate {
        /// Text to estimate (or - to read from stdin)
        text: String,
    },
}

// ============ Output Types ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompressOutput {
    generated_at: DateTime<Utc>,
    budget: TokenBudget,
    keywords: Vec<String>,
    stats: CompressionStats,
    documents: Vec<CompressedDocument>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextOutput {
    tokens: u32,
    keywords: Vec<String>,
    stats: CompressionStats,
    context: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BudgetOutput {
    #[serde(flatten)]
    budget: TokenBudget,
    aggregate_allocation: u64,
    over_allocated: bool,
}

#[derive(Serialize)]
struct TokenCountOutput {
    tokens: u32,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

// ============ Main ============

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Compress {
            files,
            query,
            total_docs,
            context,
        } => handle_compress(config_path, &files, query.as_deref(), total_docs, context),
        Commands::Budget { docs } => handle_budget(config_path, docs),
        Commands::Keywords { query } => handle_keywords(&query),
        Commands::Tokens { action } => handle_tokens(action),
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let error = ErrorOutput { error: format!("{:#}", e) };
            match serde_json::to_string(&error) {
                Ok(json) => println!("{}", json),
                Err(_) => println!(r#"{{"error": "unknown error"}}"#),
            }
            std::process::exit(1);
        }
    }
}

// ============ Handlers ============

fn read_document(path: &Path) -> anyhow::Result<RawDocument> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(RawDocument::new(name, content))
}

fn handle_compress(
    config_path: Option<&Path>,
    files: &[PathBuf],
    query: Option<&str>,
    total_docs: Option<usize>,
    context: bool,
) -> anyhow::Result<String> {
    let config = ContextConfig::load(config_path)?;
    let documents = files.iter().map(|p| read_document(p)).collect::<anyhow::Result<Vec<_>>>()?;
    let compressor = DocumentCompressor::new(config);

    if context {
        let prepared = prepare_document_context(&compressor, &documents, query)?;
        let output = ContextOutput {
            tokens: prepared.tokens,
            keywords: prepared.keywords,
            stats: prepared.stats,
            context: prepared.text,
        };
        return Ok(serde_json::to_string(&output)?);
    }

    let total_docs = total_docs.unwrap_or(documents.len());
    let keywords = query.map(extract_keywords_from_query).unwrap_or_default();
    let compressed = compressor.compress_documents_with_keywords(&documents, total_docs, &keywords);

    let output = CompressOutput {
        generated_at: Utc::now(),
        budget: compressor.budget(total_docs),
        keywords,
        stats: CompressionStats::from_documents(&compressed),
        documents: compressed,
    };

    Ok(serde_json::to_string(&output)?)
}

fn handle_budget(config_path: Option<&Path>, docs: usize) -> anyhow::Result<String> {
    let config = ContextConfig::load(config_path)?;
    let budget = TokenBudget::from_config(&config, docs);
    let output = BudgetOutput {
        budget,
        aggregate_allocation: budget.aggregate_allocation(),
        over_allocated: budget.is_over_allocated(),
    };
    Ok(serde_json::to_string(&output)?)
}

fn handle_keywords(query: &str) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&extract_keywords_from_query(query))?)
}

fn read_text_arg(text: String) -> anyhow::Result<String> {
    if text == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(text)
    }
}

fn handle_tokens(action: TokensAction) -> anyhow::Result<String> {
    let tokens = match action {
        TokensAction::Count { text } => count_tokens(&read_text_arg(text)?),
        TokensAction::Estimate { text } => estimate_tokens(&read_text_arg(text)?),
    };
    Ok(serde_json::to_string(&TokenCountOutput { tokens })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_config_only_breaks_commands_that_read_it() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("context.json");
        fs::write(&bad, "{ pas du json").unwrap();

        assert!(handle_budget(Some(&bad), 1).is_err());
        assert!(handle_compress(Some(&bad), &[bad.clone()], None, None, false).is_err());

        assert_eq!(handle_keywords("analyse trésorerie").unwrap(), r#"["analyse","trésorerie"]"#);
        let tokens = handle_tokens(TokensAction::Estimate { text: "abcdefgh".to_string() }).unwrap();
        assert_eq!(tokens, r#"{"tokens":2}"#);
    }

    #[test]
    fn test_budget_reads_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        fs::write(&path, r#"{"maxTokens": 10000}"#).unwrap();

        let json = handle_budget(Some(&path), 1).unwrap();
        assert!(json.contains(r#""availableTokens":1000"#), "{}", json);
    }
}
