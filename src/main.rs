//! # docvec CLI
//!
//! The `docvec` binary moves markdown documentation into a vector index
//! and queries it back.
//!
//! ## Usage
//!
//! ```bash
//! docvec --config ./config/docvec.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docvec migrate <paths>...` | Chunk, embed and upsert markdown into a namespace |
//! | `docvec query --id <id>` | Fetch one record by vector ID |
//! | `docvec query --search "<text>"` | Vector, BM25 or hybrid search |
//! | `docvec chunk <file>` | Show the chunks a file would produce |
//! | `docvec hash <file>` | Print the fingerprint of a file's normalized text |
//!
//! ## Examples
//!
//! ```bash
//! # Preview what a migration would upsert
//! docvec migrate ./docs --dry-run
//!
//! # Migrate into a namespace and keep the manifest
//! docvec migrate ./docs -n handbook --manifest out/manifest.json
//!
//! # Hybrid search (vector + BM25, fused with RRF)
//! docvec query --search "rotate api keys" -n handbook --method hybrid
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `docvec=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docvec::progress::ProgressMode;
use docvec::{config, inspect, migrate, query};
use docvec_core::indexer::IdScheme;
use docvec_core::query::SearchMethod;

/// docvec: markdown documentation into a hybrid-searchable vector index.
///
/// Credentials come from `OPENAI_API_KEY` and `TURBOPUFFER_API_KEY`.
/// See `config/docvec.example.toml` for every config option.
#[derive(Parser)]
#[command(name = "docvec", version, about)]
struct Cli {
    /// Path to the TOML configuration file. Defaults to
    /// `./config/docvec.toml` when that file exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Migration progress on stderr.
    #[arg(long, global = true, value_enum, default_value = "auto")]
    progress: ProgressMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and upsert markdown files into a namespace.
    ///
    /// Directories are walked for `*.md` / `*.markdown` (see
    /// `[migrate]` globs); files are taken as given. Vector IDs are
    /// `<path>_<position>` unless `--id-scheme content` is used.
    Migrate {
        /// Markdown files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Target namespace (overrides `[store].namespace`).
        #[arg(short, long)]
        namespace: Option<String>,

        /// Texts per embedding request (overrides `[embedding].batch_size`).
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Chunk and report counts without contacting any provider.
        #[arg(long)]
        dry_run: bool,

        /// Write the `(vector_id, content_hash)` manifest as JSON.
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// How vector IDs are derived: `positional` or `content`.
        #[arg(long)]
        id_scheme: Option<IdScheme>,
    },

    /// Look up a record by ID or search a namespace.
    Query {
        /// Exact vector ID to fetch.
        #[arg(long, conflicts_with = "search", required_unless_present = "search")]
        id: Option<String>,

        /// Text to search for.
        #[arg(long)]
        search: Option<String>,

        /// Namespace to query (overrides `[store].namespace`).
        #[arg(short, long)]
        namespace: Option<String>,

        /// Number of results (overrides `[query].top_k`).
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Ranking method: `vector`, `bm25` or `hybrid`.
        #[arg(long, default_value = "vector")]
        method: SearchMethod,

        /// Attribute ranked by BM25 (overrides `[query].text_field`).
        #[arg(long)]
        text_field: Option<String>,

        /// RRF constant for hybrid fusion (overrides `[query].rrf_k`).
        #[arg(long)]
        rrf_k: Option<u32>,

        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the chunks of a markdown file with header, level and hash.
    Chunk {
        file: PathBuf,

        /// Print chunks as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the content fingerprint of a file's normalized text.
    Hash { file: PathBuf },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docvec=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't need config
    match &cli.command {
        Commands::Chunk { file, json } => return inspect::run_chunk(file, *json),
        Commands::Hash { file } => return inspect::run_hash(file),
        _ => {}
    }

    let cfg = config::resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Migrate {
            paths,
            namespace,
            batch_size,
            dry_run,
            manifest,
            id_scheme,
        } => {
            let args = migrate::MigrateArgs {
                paths,
                namespace,
                batch_size,
                id_scheme,
                dry_run,
                manifest,
            };
            let reporter = cli.progress.reporter();
            migrate::run_migrate(&cfg, &args, reporter.as_ref()).await?;
        }
        Commands::Query {
            id,
            search,
            namespace,
            top_k,
            method,
            text_field,
            rrf_k,
            json,
        } => {
            let args = query::QueryArgs {
                id,
                search,
                namespace,
                top_k,
                method,
                text_field,
                rrf_k,
                json,
            };
            query::run_query(&cfg, &args).await?;
        }
        Commands::Chunk { .. } | Commands::Hash { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
