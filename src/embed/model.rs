use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::EmbeddingConfig;

/// Local file name of the ONNX model
pub const MODEL_FILE: &str = "model.onnx";

/// Local file name of the tokenizer
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// (local name, path inside the Hugging Face repository)
const MODEL_FILES: &[(&str, &str)] = &[
    (MODEL_FILE, "onnx/model.onnx"),
    (TOKENIZER_FILE, "tokenizer.json"),
];

/// Returns the directory holding the files for the configured model
pub fn model_dir(base_dir: &Path, config: &EmbeddingConfig) -> PathBuf {
    let name = config.model_repo.replace('/', "--");
    base_dir.join("models").join(name)
}

/// Checks if the model is already downloaded
pub fn is_model_downloaded(base_dir: &Path, config: &EmbeddingConfig) -> bool {
    let dir = model_dir(base_dir, config);
    MODEL_FILES
        .iter()
        .all(|(filename, _)| dir.join(filename).exists())
}

/// Download URL for a file in a Hugging Face repository
pub fn file_url(repo: &str, remote_path: &str) -> String {
    format!("https://huggingface.co/{}/resolve/main/{}", repo, remote_path)
}

/// Downloads the model files if not already present
pub fn ensure_model(base_dir: &Path, config: &EmbeddingConfig) -> Result<PathBuf> {
    let dir = model_dir(base_dir, config);

    if is_model_downloaded(base_dir, config) {
        log::debug!("Model already downloaded at {:?}", dir);
        return Ok(dir);
    }

    eprintln!("Downloading embedding model ({})...", config.model_repo);
    eprintln!("This is a one-time download.\n");

    fs::create_dir_all(&dir).context("Failed to create model directory")?;

    for (filename, remote_path) in MODEL_FILES {
        let dest = dir.join(filename);
        if dest.exists() {
            log::debug!("{} already exists, skipping", filename);
            continue;
        }

        let url = file_url(&config.model_repo, remote_path);
        download_file(&url, &dest, filename)?;
    }

    eprintln!("\nModel downloaded successfully.\n");
    Ok(dir)
}

/// Downloads a single file with progress bar.
/// Writes to a `.part` file first so an interrupted download is never mistaken for a complete one.
fn download_file(url: &str, dest: &Path, display_name: &str) -> Result<()> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("Failed to download {}", url))?;

    let total_size = response
        .header("content-length")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let pb = if total_size > 0 {
        let pb = ProgressBar::new(total_size);
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {{spinner:.green}} {} [{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{eta}})",
                display_name
            ))
            .context("Invalid progress bar template")?
            .progress_chars("=> ");
        pb.set_style(style);
        Some(pb)
    } else {
        eprintln!("  Downloading {}...", display_name);
        None
    };

    let partial = dest.with_extension("part");
    let mut file = fs::File::create(&partial)
        .with_context(|| format!("Failed to create file {:?}", partial))?;

    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .context("Failed to read response body")?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])
            .context("Failed to write to file")?;
        if let Some(ref pb) = pb {
            pb.inc(bytes_read as u64);
        }
    }
    file.flush().context("Failed to flush download")?;
    drop(file);

    fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move {:?} into place", partial))?;

    if let Some(pb) = pb {
        pb.finish();
    }

    Ok(())
}
