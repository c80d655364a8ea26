//! Migration progress rendering.
//!
//! Renders [`MigrationProgressEvent`]s from the core pipeline so users see
//! what is being chunked, embedded and upserted. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use docvec_core::progress::{MigrationProgressEvent, NoProgress, ProgressReporter};

/// Human-friendly progress on stderr: "upserted  batch 3 / 12  (300 chunks)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: MigrationProgressEvent) {
        let line = match &event {
            MigrationProgressEvent::Chunked { source, chunks } => {
                format!("chunked   {}  {} chunks\n", source, format_number(*chunks as u64))
            }
            MigrationProgressEvent::Embedding {
                batch,
                total,
                chunks,
            } => format!("embedded  batch {} / {}  ({} chunks)\n", batch, total, chunks),
            MigrationProgressEvent::Upserted {
                batch,
                total,
                records,
            } => format!(
                "upserted  batch {} / {}  ({} chunks total)\n",
                batch,
                total,
                format_number(*records as u64)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: MigrationProgressEvent) {
        let obj = match &event {
            MigrationProgressEvent::Chunked { source, chunks } => serde_json::json!({
                "event": "progress",
                "phase": "chunked",
                "source": source,
                "chunks": chunks
            }),
            MigrationProgressEvent::Embedding {
                batch,
                total,
                chunks,
            } => serde_json::json!({
                "event": "progress",
                "phase": "embedding",
                "batch": batch,
                "total": total,
                "chunks": chunks
            }),
            MigrationProgressEvent::Upserted {
                batch,
                total,
                records,
            } => serde_json::json!({
                "event": "progress",
                "phase": "upserted",
                "batch": batch,
                "total": total,
                "records": records
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// Human when stderr is a TTY, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Resolve `Auto` against the terminal.
    pub fn resolve(self) -> Self {
        match self {
            ProgressMode::Auto => {
                if atty::is(atty::Stream::Stderr) {
                    ProgressMode::Human
                } else {
                    ProgressMode::Off
                }
            }
            other => other,
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(self) -> Box<dyn ProgressReporter> {
        match self.resolve() {
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            ProgressMode::Off | ProgressMode::Auto => Box::new(NoProgress),
        }
    }
}
