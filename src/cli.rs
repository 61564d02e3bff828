use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "snipsearch",
    about = "Semantic search over indexed code snippets",
    version,
    after_help = "Examples:\n  snipsearch search \"parse a config file\" --top-k 5\n  snipsearch search \"retry logic\" --answer\n  snipsearch import snippets.jsonl\n  snipsearch list --file src/db --json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the snippets closest in meaning to a query
    Search(SearchArgs),

    /// Load snippets and their vectors from a JSONL file
    Import(ImportArgs),

    /// List stored snippets
    List(ListArgs),

    /// Show configuration
    Config,
}

#[derive(Parser)]
pub struct SearchArgs {
    /// Natural-language query
    pub query: String,

    /// Number of snippets to return (default: config `default_top_k`)
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Output as JSON for scripting
    #[arg(long)]
    pub json: bool,

    /// Ask the configured LLM to answer the query from the results
    #[arg(long)]
    pub answer: bool,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// JSONL file, one snippet object (with `vector`) per line
    pub file: PathBuf,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Only list snippets whose file path contains this text
    #[arg(long)]
    pub file: Option<String>,

    /// Maximum number of snippets
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
