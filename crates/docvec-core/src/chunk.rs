//! Heading-bounded markdown chunker.
//!
//! Splits a markdown document into [`Chunk`]s at ATX headings (`#` through
//! `######`). Each heading line opens a new chunk and is kept as that
//! chunk's first line, so the chunk text carries its own title.
//!
//! # Algorithm
//!
//! 1. Split the document on `\n`.
//! 2. A heading line is 1–6 `#`, at least one whitespace character, then
//!    at least one more character of any kind. `#######`, `#Title` and
//!    `# ` are ordinary lines; `#  ` is a heading with a blank title.
//! 3. A heading flushes the open chunk and starts a new one with the
//!    heading's trimmed title and `#` count as header and level. A blank
//!    title leaves the header absent but still sets the level.
//! 4. Any other line is appended to the open chunk.
//! 5. At end of input the open chunk is flushed.
//!
//! A flushed chunk is the joined lines, trimmed; chunks that trim to
//! nothing are dropped. Prose before the first heading has no header and
//! level 0.
//!
//! # Example
//!
//! ```rust
//! use docvec_core::chunk::chunk_markdown;
//!
//! let chunks = chunk_markdown("# A\nalpha\n## B\nbeta\n# C\ngamma", "doc.md");
//! let levels: Vec<u8> = chunks.iter().map(|c| c.level).collect();
//! assert_eq!(levels, vec![1, 2, 1]);
//! assert_eq!(chunks[1].text, "## B\nbeta");
//! ```

use crate::models::{Chunk, Document};

/// Deepest heading level recognised.
const MAX_HEADING_LEVEL: usize = 6;

/// Split `content` into heading-bounded chunks tagged with `source`.
///
/// # Guarantees
///
/// - Chunks are in document order.
/// - Every non-blank line of `content` lands in exactly one chunk.
/// - An empty document yields no chunks; a document without headings
///   yields one; a document of bare headings yields one per heading.
pub fn chunk_markdown(content: &str, source: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    let mut header: Option<String> = None;
    let mut level: u8 = 0;

    for line in content.split('\n') {
        if let Some((heading_level, title)) = parse_heading(line) {
            flush(&mut chunks, &lines, source, header.take(), level);
            lines.clear();
            header = (!title.is_empty()).then(|| title.to_string());
            level = heading_level;
        }
        lines.push(line);
    }

    flush(&mut chunks, &lines, source, header, level);
    chunks
}

/// Chunk several documents in order, concatenating their chunks.
pub fn chunk_documents(documents: &[Document]) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| chunk_markdown(&doc.content, &doc.source))
        .collect()
}

/// Parse an ATX heading line into `(level, trimmed title)`.
///
/// The title may be empty: `#` plus two or more whitespace characters is
/// still a heading, so chunk boundaries match those already in the store.
pub fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL {
        return None;
    }

    let rest = &line[hashes..];
    if !rest.starts_with(char::is_whitespace) || rest.chars().count() < 2 {
        return None;
    }

    Some((hashes as u8, rest.trim()))
}

fn flush(chunks: &mut Vec<Chunk>, lines: &[&str], source: &str, header: Option<String>, level: u8) {
    if lines.is_empty() {
        return;
    }
    let text = lines.join("\n");
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    chunks.push(Chunk {
        text: text.to_string(),
        source: source.to_string(),
        header,
        level,
    });
}
