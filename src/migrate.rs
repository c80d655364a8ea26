//! `docvec migrate`: markdown files into a vector namespace.
//!
//! Resolves the inputs, then either reports per-file chunk counts
//! (`--dry-run`, no provider is contacted) or runs the core pipeline
//! against the configured embedder and Turbopuffer. The manifest of
//! `(vector_id, content_hash)` pairs can be written to a JSON file for the
//! downstream metadata loader.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use docvec_core::chunk::chunk_markdown;
use docvec_core::embedding::check_batching;
use docvec_core::indexer::{IdScheme, MigrationManifest};
use docvec_core::models::Document;
use docvec_core::pipeline::{self, MigrationOptions};
use docvec_core::progress::ProgressReporter;

use crate::config::{Config, TURBOPUFFER_API_KEY_ENV};
use crate::embedding::create_embedder;
use crate::sources::{discover_inputs, load_documents};
use crate::turbopuffer::TurbopufferStore;

/// Command-line overrides for one migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrateArgs {
    pub paths: Vec<PathBuf>,
    pub namespace: Option<String>,
    pub batch_size: Option<usize>,
    pub id_scheme: Option<IdScheme>,
    pub dry_run: bool,
    pub manifest: Option<PathBuf>,
}

/// Manifest file layout.
#[derive(Serialize)]
struct ManifestFile<'a> {
    namespace: &'a str,
    id_scheme: IdScheme,
    chunks: usize,
    generated_at: DateTime<Utc>,
    files: &'a MigrationManifest,
}

/// Effective pipeline options: CLI flags over config values.
pub fn migration_options(config: &Config, args: &MigrateArgs) -> MigrationOptions {
    MigrationOptions {
        namespace: args
            .namespace
            .clone()
            .unwrap_or_else(|| config.store.namespace.clone()),
        batch_size: args.batch_size.unwrap_or(config.embedding.batch_size),
        concurrency: config.embedding.concurrency,
        id_scheme: args.id_scheme.unwrap_or(config.migrate.id_scheme),
    }
}

pub async fn run_migrate(
    config: &Config,
    args: &MigrateArgs,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let files = discover_inputs(&args.paths, &config.migrate)?;
    if files.is_empty() {
        bail!("No markdown files found in the given inputs");
    }
    let documents = load_documents(&files);
    let options = migration_options(config, args);
    check_batching(options.batch_size, options.concurrency)?;

    if args.dry_run {
        print_dry_run(&documents, &options);
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding].provider in the config to migrate.");
    }
    let embedder = create_embedder(&config.embedding)?;
    let store = TurbopufferStore::from_env(&config.store).with_context(|| {
        format!(
            "Turbopuffer credentials missing: export {}",
            TURBOPUFFER_API_KEY_ENV
        )
    })?;
    info!(
        files = documents.len(),
        namespace = %options.namespace,
        store = store.base_url(),
        "migrating"
    );

    let report = pipeline::migrate(&documents, embedder.as_ref(), &store, &options, progress)
        .await?;

    if let Some(path) = &args.manifest {
        write_manifest(path, &options, &report.manifest, report.chunks)?;
    }

    println!("migrate {}", options.namespace);
    println!("  files: {}", documents.len());
    println!("  files with chunks: {}", report.manifest.files().count());
    println!("  chunks upserted: {}", report.chunks);
    println!("  batches: {}", report.batches);
    println!("  id scheme: {}", options.id_scheme);
    if let Some(path) = &args.manifest {
        println!("  manifest: {}", path.display());
    }
    println!("ok");
    Ok(())
}

fn print_dry_run(documents: &[Document], options: &MigrationOptions) {
    println!("migrate {} (dry-run)", options.namespace);
    let mut total = 0usize;
    for doc in documents {
        let count = chunk_markdown(&doc.content, &doc.source).len();
        total += count;
        println!("  {}: {} chunks", doc.source, count);
    }
    println!("  files: {}", documents.len());
    println!("  total chunks: {}", total);
    println!("  batches: {}", total.div_ceil(options.batch_size));
}

/// Serialize the manifest with run metadata and write it to `path`.
pub fn write_manifest(
    path: &Path,
    options: &MigrationOptions,
    manifest: &MigrationManifest,
    chunks: usize,
) -> Result<()> {
    let file = ManifestFile {
        namespace: &options.namespace,
        id_scheme: options.id_scheme,
        chunks,
        generated_at: Utc::now(),
        files: manifest,
    };
    let json = serde_json::to_string_pretty(&file)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
    info!(path = %path.display(), entries = manifest.len(), "wrote manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvec_core::hash::content_hash;
    use docvec_core::models::{ChunkAttributes, VectorRecord};
    use tempfile::TempDir;

    fn record(id: &str, source: &str, text: &str) -> VectorRecord {
        VectorRecord {
            id: id.into(),
            vector: vec![1.0],
            attributes: ChunkAttributes {
                text: text.into(),
                content_hash: content_hash(text),
                source: source.into(),
                header: None,
                level: 0,
            },
        }
    }

    #[test]
    fn test_cli_flags_override_config() {
        let mut config = Config::default();
        config.store.namespace = "from-config".into();
        config.embedding.batch_size = 50;
        let args = MigrateArgs {
            namespace: Some("from-cli".into()),
            id_scheme: Some(IdScheme::Content),
            ..Default::default()
        };
        let opts = migration_options(&config, &args);
        assert_eq!(opts.namespace, "from-cli");
        assert_eq!(opts.batch_size, 50);
        assert_eq!(opts.id_scheme, IdScheme::Content);
    }

    #[test]
    fn test_manifest_file_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/manifest.json");
        let mut manifest = MigrationManifest::new();
        manifest.record(&[
            record("b.md_0", "b.md", "first"),
            record("a.md_1", "a.md", "second"),
        ]);
        let options = MigrationOptions::default();

        write_manifest(&path, &options, &manifest, 2).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["namespace"], "documents");
        assert_eq!(value["id_scheme"], "positional");
        assert_eq!(value["chunks"], 2);
        assert!(value["generated_at"].is_string());
        assert_eq!(value["files"]["b.md"][0]["vector_id"], "b.md_0");
        assert_eq!(
            value["files"]["a.md"][0]["content_hash"],
            content_hash("second").as_str()
        );
    }

    #[tokio::test]
    async fn test_dry_run_rejects_zero_batch_size() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.md"), "# A\nbody").unwrap();
        let args = MigrateArgs {
            paths: vec![tmp.path().to_path_buf()],
            batch_size: Some(0),
            dry_run: true,
            ..Default::default()
        };
        let err = run_migrate(&Config::default(), &args, &docvec_core::progress::NoProgress)
            .await
            .unwrap_err();
        let err = err.downcast::<docvec_core::Error>().unwrap();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_no_inputs_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let args = MigrateArgs {
            paths: vec![tmp.path().to_path_buf()],
            dry_run: true,
            ..Default::default()
        };
        let err = run_migrate(&Config::default(), &args, &docvec_core::progress::NoProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No markdown files"));
    }
}
