//! Input discovery for `docvec migrate`.
//!
//! Explicit files are kept in the order given. Directories are walked and
//! filtered by `migrate.include_globs` / `migrate.exclude_globs` (matched
//! against the path relative to that directory), then sorted so the same
//! tree always yields the same order, and therefore the same vector IDs.
//!
//! A document's `source` is its path exactly as discovered (the argument,
//! or the argument joined with the relative path for walked files).

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use docvec_core::models::Document;

use crate::config::MigrateConfig;

/// Directories never descended into.
const DEFAULT_EXCLUDES: [&str; 3] = ["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Expand `inputs` into the ordered list of files to migrate.
///
/// Inputs that do not exist are logged and skipped.
pub fn discover_inputs(inputs: &[PathBuf], config: &MigrateConfig) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(&config.include_globs)?;
    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            let found = walk_dir(input, &include_set, &exclude_set, config.follow_symlinks)?;
            info!(dir = %input.display(), files = found.len(), "discovered markdown files");
            files.extend(found);
        } else {
            warn!(path = %input.display(), "input does not exist, skipping");
        }
    }
    Ok(files)
}

fn walk_dir(
    root: &Path,
    include_set: &GlobSet,
    exclude_set: &GlobSet,
    follow_symlinks: bool,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(follow_symlinks) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy();

        if exclude_set.is_match(rel_str.as_ref()) {
            continue;
        }
        if !include_set.is_match(rel_str.as_ref()) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    files.sort();
    Ok(files)
}

/// Read every file as UTF-8 markdown. Unreadable files are logged and skipped.
pub fn load_documents(paths: &[PathBuf]) -> Vec<Document> {
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(content) => docs.push(Document::new(path.to_string_lossy(), content)),
            Err(e) => {
                let err = docvec_core::Error::Io {
                    path: path.clone(),
                    source: e,
                };
                warn!("{}, skipping", err);
            }
        }
    }
    docs
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("guide/drafts")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("b.md"), "# B").unwrap();
        fs::write(root.join("a.markdown"), "# A").unwrap();
        fs::write(root.join("notes.txt"), "plain").unwrap();
        fs::write(root.join("guide/intro.md"), "# Intro").unwrap();
        fs::write(root.join("guide/drafts/wip.md"), "# WIP").unwrap();
        fs::write(root.join(".git/HEAD.md"), "ref").unwrap();
        tmp
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_walk_filters_and_sorts() {
        let tmp = tree();
        let config = MigrateConfig {
            exclude_globs: vec!["**/drafts/**".into()],
            ..Default::default()
        };
        let files = discover_inputs(&[tmp.path().to_path_buf()], &config).unwrap();
        assert_eq!(
            names(tmp.path(), &files),
            vec!["a.markdown", "b.md", "guide/intro.md"]
        );
    }

    #[test]
    fn test_explicit_files_keep_order_and_bypass_globs() {
        let tmp = tree();
        let inputs = vec![
            tmp.path().join("notes.txt"),
            tmp.path().join("missing.md"),
            tmp.path().join("b.md"),
        ];
        let files = discover_inputs(&inputs, &MigrateConfig::default()).unwrap();
        assert_eq!(names(tmp.path(), &files), vec!["notes.txt", "b.md"]);
    }

    #[test]
    fn test_load_documents_uses_path_as_source() {
        let tmp = tree();
        let path = tmp.path().join("b.md");
        let docs = load_documents(&[path.clone(), tmp.path().join("gone.md")]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, path.to_string_lossy());
        assert_eq!(docs[0].content, "# B");
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let config = MigrateConfig {
            include_globs: vec!["[".into()],
            ..Default::default()
        };
        assert!(discover_inputs(&[], &config).is_err());
    }
}
