use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::search::RankedResult;

/// Produces a natural-language answer from ranked snippets
pub trait AnswerSynthesizer {
    fn answer(&self, query: &str, results: &[RankedResult]) -> Result<String>;
}

/// Answer synthesis backed by a local Ollama server
pub struct OllamaClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build();
        Self {
            agent,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }
}

impl AnswerSynthesizer for OllamaClient {
    fn answer(&self, query: &str, results: &[RankedResult]) -> Result<String> {
        if results.is_empty() {
            anyhow::bail!("No snippets to answer from");
        }

        let prompt = build_prompt(query, results);
        let body = serde_json::to_string(&GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
        })?;

        let url = self.generate_url();
        log::debug!("Sending {} byte prompt to {} ({})", prompt.len(), url, self.model);

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .with_context(|| format!("Request to {} failed. Is Ollama running?", url))?;

        let text = response
            .into_string()
            .context("Failed to read Ollama response")?;
        let parsed: GenerateResponse =
            serde_json::from_str(&text).context("Unexpected Ollama response")?;

        Ok(parsed.response.trim().to_string())
    }
}

/// Renders the ranked snippets as context followed by the question
pub fn build_prompt(query: &str, results: &[RankedResult]) -> String {
    let mut prompt = String::from(
        "Answer the question using the code snippets below. \
         Refer to snippets by file path and line range.\n\n",
    );

    for (i, result) in results.iter().enumerate() {
        let snippet = &result.record;
        let name = if snippet.function_name.is_empty() {
            String::new()
        } else {
            format!(" `{}`", snippet.function_name)
        };
        // Writing to a String cannot fail
        let _ = writeln!(
            prompt,
            "[{}] {}{} ({}, similarity {:.3})\n```\n{}\n```\n",
            i + 1,
            snippet.location(),
            name,
            snippet.snippet_type,
            result.similarity,
            snippet.code.trim_end()
        );
    }

    let _ = write!(prompt, "Question: {}\nAnswer:", query.trim());
    prompt
}
