mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use snipsearch::answer::{AnswerSynthesizer, OllamaClient};
use snipsearch::config::{self, Config};
use snipsearch::db::Database;
use snipsearch::embed::{model, Embedder};
use snipsearch::search::{self, RankedResult};
use snipsearch::snippet;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => cmd_search(args),
        Commands::Import(args) => cmd_import(args),
        Commands::List(args) => cmd_list(args),
        Commands::Config => cmd_config(),
    }
}

fn cmd_search(args: cli::SearchArgs) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config::db_path()?)?;

    if db.count_snippets()? == 0 {
        eprintln!("{} No snippets indexed yet.", "Info:".blue());
        eprintln!("Load some with `snipsearch import <file.jsonl>`.");
        return Ok(());
    }

    let mut embedder = load_embedder(&config)?;
    let top_k = args.top_k.unwrap_or(config.default_top_k);

    let results = search::search_code_snippets(&db, &mut embedder, &args.query, top_k)?;

    let answer = if args.answer {
        let client = OllamaClient::new(&config.llm);
        eprintln!(
            "{} Asking {} about {} snippet(s)...",
            "→".green(),
            config.llm.model,
            results.len()
        );
        Some(client.answer(&args.query, &results)?)
    } else {
        None
    };

    if args.json {
        let report = search::json_report(&results, answer.as_deref())?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_results_plain(&results);
    if let Some(answer) = answer {
        println!("{}\n{}", "Answer:".bold(), answer);
    }

    Ok(())
}

fn cmd_import(args: cli::ImportArgs) -> Result<()> {
    let entries = snippet::parse_snippets_jsonl(&args.file)?;
    if entries.is_empty() {
        eprintln!("{} {:?} contains no snippets.", "Info:".blue(), args.file);
        return Ok(());
    }

    let mut db = Database::open(&config::db_path()?)?;
    let imported = db
        .insert_snippets(entries.iter().map(|e| (&e.record, e.vector.as_slice())))
        .with_context(|| format!("Failed to import {:?}", args.file))?;

    log::info!("Imported {} snippets from {:?}", imported, args.file);
    eprintln!(
        "{} Imported {} snippet(s). {} total.",
        "→".green(),
        imported,
        db.count_snippets()?
    );

    Ok(())
}

fn cmd_list(args: cli::ListArgs) -> Result<()> {
    let db = Database::open(&config::db_path()?)?;
    let snippets = db.list_snippets(args.file.as_deref(), args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snippets)?);
        return Ok(());
    }

    if snippets.is_empty() {
        eprintln!("{} No snippets found.", "Info:".blue());
        return Ok(());
    }

    eprintln!("{} ({} snippets)\n", "Code Snippets".bold(), snippets.len());
    for s in &snippets {
        println!(
            "  {} {} {}",
            s.location().green(),
            s.snippet_type.magenta(),
            s.function_name
        );
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;
    let path = config::config_path()?;

    println!("{} {}\n", "Config file:".bold(), path.display());
    println!("{}", toml::to_string_pretty(&config)?);

    if !path.exists() {
        println!(
            "\n{} No config file found. Creating default at {}",
            "Note:".yellow(),
            path.display()
        );
        config.save()?;
    }

    Ok(())
}

/// Loads the embedding model, downloading it on first use
fn load_embedder(config: &Config) -> Result<Embedder> {
    let base_dir = config::snipsearch_dir()?;
    let model_dir = model::ensure_model(&base_dir, &config.embedding)
        .context("Embedding model is not available")?;
    Embedder::new(&model_dir, &config.embedding)
}

/// Prints search results in plain text format
fn print_results_plain(results: &[RankedResult]) {
    for (i, result) in results.iter().enumerate() {
        let s = &result.record;
        let name = if s.function_name.is_empty() {
            s.snippet_type.clone()
        } else {
            format!("{} {}", s.snippet_type, s.function_name)
        };

        println!(
            "{}. {} {} (similarity: {:.4})",
            (i + 1).to_string().bold(),
            s.location().green(),
            name.magenta(),
            result.similarity
        );
        for line in s.code.lines() {
            println!("   {}", line.dimmed());
        }
        println!();
    }
}
