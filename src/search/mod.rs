pub mod ranker;

use anyhow::Result;

use crate::db::SnippetStore;
use crate::embed::EmbeddingProvider;
use crate::snippet::SnippetRecord;

pub use ranker::{rank, RankError, Ranked};

/// A snippet with its similarity to the query
pub type RankedResult = Ranked<SnippetRecord>;

/// Embeds the query, loads every stored snippet and returns the `top_k` closest
pub fn search_code_snippets<S, E>(
    store: &S,
    embedder: &mut E,
    query: &str,
    top_k: usize,
) -> Result<Vec<RankedResult>>
where
    S: SnippetStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let query_vector = embedder.embed_query(query)?;
    log::debug!("Query vector has {} dimensions", query_vector.len());

    let candidates = store.fetch_all_snippets()?;
    log::debug!("Ranking {} snippets", candidates.len());

    let results = rank(&query_vector, &candidates, top_k)?;
    Ok(results)
}

/// JSON output for `search --json`: the bare result array, or
/// `{"results": [...], "answer": "..."}` when an answer was produced
pub fn json_report(results: &[RankedResult], answer: Option<&str>) -> Result<serde_json::Value> {
    let results = serde_json::to_value(results)?;
    Ok(match answer {
        Some(answer) => serde_json::json!({ "results": results, "answer": answer }),
        None => results,
    })
}
