//! TOML configuration for docvec.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working configuration that targets OpenAI
//! `text-embedding-3-large` and Turbopuffer in `gcp-us-central1`.
//! Credentials are never read from the file; see [`OPENAI_API_KEY_ENV`]
//! and [`TURBOPUFFER_API_KEY_ENV`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docvec_core::indexer::IdScheme;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const TURBOPUFFER_API_KEY_ENV: &str = "TURBOPUFFER_API_KEY";
pub const TURBOPUFFER_REGION_ENV: &str = "TURBOPUFFER_REGION";

/// Where the CLI looks when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/docvec.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub migrate: MigrateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Endpoint override. OpenAI defaults to `https://api.openai.com`,
    /// Ollama to `http://localhost:11434`.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "text-embedding-3-large".to_string()
}
fn default_dims() -> usize {
    3072
}
fn default_batch_size() -> usize {
    100
}
fn default_concurrency() -> usize {
    1
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_provider")]
    pub provider: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Full base URL; overrides the region-derived one.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_distance_metric")]
    pub distance_metric: String,
    #[serde(default = "default_store_retries")]
    pub max_retries: u32,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            region: default_region(),
            base_url: None,
            namespace: default_namespace(),
            distance_metric: default_distance_metric(),
            max_retries: default_store_retries(),
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_store_provider() -> String {
    "turbopuffer".to_string()
}
fn default_region() -> String {
    "gcp-us-central1".to_string()
}
fn default_namespace() -> String {
    docvec_core::pipeline::DEFAULT_NAMESPACE.to_string()
}
fn default_distance_metric() -> String {
    "cosine_distance".to_string()
}
fn default_store_retries() -> u32 {
    3
}
fn default_store_timeout() -> u64 {
    60
}

impl StoreConfig {
    /// Region, with `TURBOPUFFER_REGION` taking precedence over the file.
    pub fn effective_region(&self) -> String {
        std::env::var(TURBOPUFFER_REGION_ENV)
            .ok()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| self.region.clone())
    }

    /// Base URL of the Turbopuffer API.
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.turbopuffer.com", self.effective_region()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,
    #[serde(default = "default_text_field")]
    pub text_field: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rrf_k: default_rrf_k(),
            text_field: default_text_field(),
        }
    }
}

fn default_top_k() -> usize {
    docvec_core::query::DEFAULT_TOP_K
}
fn default_rrf_k() -> u32 {
    docvec_core::fusion::DEFAULT_RRF_K
}
fn default_text_field() -> String {
    docvec_core::query::DEFAULT_TEXT_FIELD.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MigrateConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub id_scheme: IdScheme,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            id_scheme: IdScheme::default(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.markdown".to_string()]
}

impl Config {
    /// Reject values the pipeline or query engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let e = &self.embedding;
        match e.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }
        if e.is_enabled() {
            if e.dims == 0 {
                bail!("embedding.dims must be > 0 when provider is '{}'", e.provider);
            }
            if e.model.trim().is_empty() {
                bail!("embedding.model must be specified when provider is '{}'", e.provider);
            }
        }
        if e.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        if e.concurrency == 0 {
            bail!("embedding.concurrency must be > 0");
        }

        if self.store.provider != "turbopuffer" {
            bail!(
                "Unknown store provider: '{}'. Only turbopuffer is supported.",
                self.store.provider
            );
        }
        if self.store.namespace.trim().is_empty() {
            bail!("store.namespace must not be empty");
        }

        if self.query.top_k == 0 {
            bail!("query.top_k must be >= 1");
        }
        if self.query.rrf_k == 0 {
            bail!("query.rrf_k must be >= 1");
        }
        if self.query.text_field.trim().is_empty() {
            bail!("query.text_field must not be empty");
        }

        if self.migrate.include_globs.is_empty() {
            bail!("migrate.include_globs must list at least one pattern");
        }
        Ok(())
    }
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Config for the CLI: the explicit path must exist; the default path is
/// optional and falls back to [`Config::default`].
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(&default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.model, "text-embedding-3-large");
        assert_eq!(config.embedding.dims, 3072);
        assert_eq!(config.embedding.batch_size, 100);
        assert_eq!(config.store.namespace, "documents");
        assert_eq!(config.store.region, "gcp-us-central1");
        assert_eq!(config.query.top_k, 5);
        assert_eq!(config.query.rrf_k, 60);
        assert_eq!(config.query.text_field, "text");
        assert_eq!(config.migrate.id_scheme, IdScheme::Positional);
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768
batch_size = 32
concurrency = 4
url = "http://gpu-box:11434"

[store]
namespace = "handbook"
base_url = "http://localhost:9999/"

[query]
top_k = 10
rrf_k = 20
text_field = "header"

[migrate]
include_globs = ["docs/**/*.md"]
exclude_globs = ["**/drafts/**"]
id_scheme = "content"
"#,
        )
        .unwrap();
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.concurrency, 4);
        assert_eq!(config.store.effective_base_url(), "http://localhost:9999");
        assert_eq!(config.query.rrf_k, 20);
        assert_eq!(config.migrate.id_scheme, IdScheme::Content);
        assert_eq!(config.migrate.exclude_globs, vec!["**/drafts/**"]);
    }

    #[test]
    fn test_region_derived_base_url() {
        let store = StoreConfig {
            region: "aws-eu-west-1".into(),
            ..Default::default()
        };
        if std::env::var(TURBOPUFFER_REGION_ENV).is_err() {
            assert_eq!(
                store.effective_base_url(),
                "https://aws-eu-west-1.turbopuffer.com"
            );
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse("[embedding]\nbatch_size = 0").is_err());
        assert!(parse("[embedding]\nconcurrency = 0").is_err());
        assert!(parse("[embedding]\nprovider = \"cohere\"").is_err());
        assert!(parse("[embedding]\ndims = 0").is_err());
        assert!(parse("[query]\ntop_k = 0").is_err());
        assert!(parse("[query]\nrrf_k = 0").is_err());
        assert!(parse("[store]\nprovider = \"pinecone\"").is_err());
        assert!(parse("[migrate]\nid_scheme = \"uuid\"").is_err());
        assert!(parse("[migrate]\ninclude_globs = []").is_err());
    }

    #[test]
    fn test_disabled_provider_skips_model_checks() {
        let config = parse("[embedding]\nprovider = \"disabled\"\ndims = 0\nmodel = \"\"").unwrap();
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn test_example_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/docvec.example.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.store.namespace, "documents");
        assert_eq!(config.migrate.id_scheme, IdScheme::Positional);
    }

    #[test]
    fn test_load_config_reports_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        let err = load_config(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.toml"));

        let path = tmp.path().join("docvec.toml");
        std::fs::write(&path, "[query]\ntop_k = 3\n").unwrap();
        assert_eq!(load_config(&path).unwrap().query.top_k, 3);
    }
}
