//! Writes the gateway's OpenAPI document to disk.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use anyhow::Context;
use std::path::PathBuf;
use twinspeak_api::router::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let mut doc = ApiDoc::openapi();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    let document_json = doc
        .to_pretty_json()
        .context("Failed to render OpenAPI document")?;
    std::fs::write(&output, document_json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("OpenAPI document written to {}", output.display());
    Ok(())
}
