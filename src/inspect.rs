//! Local inspection commands: `docvec chunk` and `docvec hash`.
//!
//! Neither command touches the network. `chunk` shows exactly what a
//! migration would upsert for one file; `hash` prints the fingerprint of a
//! file's normalized text so callers can skip files that have not changed.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use docvec_core::chunk::chunk_markdown;
use docvec_core::hash::{content_hash, ContentHash};
use docvec_core::models::Chunk;

#[derive(Serialize)]
struct ChunkView<'a> {
    index: usize,
    header: Option<&'a str>,
    level: u8,
    content_hash: ContentHash,
    text: &'a str,
}

fn read_markdown(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn run_chunk(path: &Path, json: bool) -> Result<()> {
    let content = read_markdown(path)?;
    let chunks = chunk_markdown(&content, &path.to_string_lossy());
    if json {
        println!("{}", serde_json::to_string_pretty(&chunk_views(&chunks))?);
    } else {
        print!("{}", render_chunks(path, &chunks));
    }
    Ok(())
}

fn chunk_views(chunks: &[Chunk]) -> Vec<ChunkView<'_>> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, c)| ChunkView {
            index,
            header: c.header.as_deref(),
            level: c.level,
            content_hash: content_hash(&c.text),
            text: &c.text,
        })
        .collect()
}

fn render_chunks(path: &Path, chunks: &[Chunk]) -> String {
    let mut out = format!("--- {} ({} chunks) ---\n", path.display(), chunks.len());
    for (i, c) in chunks.iter().enumerate() {
        out.push_str(&format!(
            "[chunk {}] h{} {}\n",
            i,
            c.level,
            c.header.as_deref().unwrap_or("(no header)")
        ));
        out.push_str(&format!("hash: {}\n", content_hash(&c.text)));
        out.push_str(&c.text);
        out.push_str("\n\n");
    }
    out
}

pub fn run_hash(path: &Path) -> Result<()> {
    let content = read_markdown(path)?;
    println!("{}  {}", content_hash(&content), path.display());
    Ok(())
}
