//! `docvec query`: exact-ID lookups and vector, BM25 or hybrid search.
//!
//! The request is validated before any provider is constructed, so an
//! empty search or ID fails without credentials or network access. An
//! embedder is only built for methods that rank by vector.

use anyhow::{bail, Context, Result};

use docvec_core::embedding::Embedder;
use docvec_core::models::QueryResult;
use docvec_core::query::{QueryEngine, QueryRequest, QueryResponse, SearchMethod};

use crate::config::{Config, TURBOPUFFER_API_KEY_ENV};
use crate::embedding::create_embedder;
use crate::turbopuffer::TurbopufferStore;

/// Longest text preview printed per result in human output.
const PREVIEW_CHARS: usize = 200;

/// Command-line arguments for one query.
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub id: Option<String>,
    pub search: Option<String>,
    pub namespace: Option<String>,
    pub top_k: Option<usize>,
    pub method: SearchMethod,
    pub text_field: Option<String>,
    pub rrf_k: Option<u32>,
    pub json: bool,
}

/// Turn arguments into a [`QueryRequest`], rejecting empty input.
pub fn build_request(config: &Config, args: &QueryArgs) -> Result<QueryRequest> {
    match (&args.id, &args.search) {
        (Some(id), None) => {
            if id.trim().is_empty() {
                bail!("--id must not be empty");
            }
            Ok(QueryRequest::ById { id: id.clone() })
        }
        (None, Some(text)) => {
            if text.trim().is_empty() {
                bail!("--search must not be empty");
            }
            let top_k = args.top_k.unwrap_or(config.query.top_k);
            if top_k == 0 {
                bail!("--top-k must be >= 1");
            }
            Ok(QueryRequest::Search {
                text: text.clone(),
                method: args.method,
                top_k,
            })
        }
        (Some(_), Some(_)) => bail!("--id and --search are mutually exclusive"),
        (None, None) => bail!("one of --id or --search is required"),
    }
}

pub async fn run_query(config: &Config, args: &QueryArgs) -> Result<()> {
    let request = build_request(config, args)?;

    let embedder: Option<Box<dyn Embedder>> = match &request {
        QueryRequest::Search { method, .. } if method.needs_embedder() => {
            if !config.embedding.is_enabled() {
                bail!(
                    "{} search requires an embedding provider. Set [embedding].provider in the config.",
                    method
                );
            }
            Some(create_embedder(&config.embedding)?)
        }
        _ => None,
    };

    let store = TurbopufferStore::from_env(&config.store).with_context(|| {
        format!(
            "Turbopuffer credentials missing: export {}",
            TURBOPUFFER_API_KEY_ENV
        )
    })?;

    let namespace = args
        .namespace
        .clone()
        .unwrap_or_else(|| config.store.namespace.clone());
    let mut engine = QueryEngine::new(&store, namespace)
        .with_text_field(
            args.text_field
                .clone()
                .unwrap_or_else(|| config.query.text_field.clone()),
        )
        .with_rrf_k(args.rrf_k.unwrap_or(config.query.rrf_k));
    if let Some(embedder) = embedder.as_deref() {
        engine = engine.with_embedder(embedder);
    }

    let response = engine.run(&request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_human(&response));
    }
    Ok(())
}

/// Plain-text rendering of a query response.
pub fn render_human(response: &QueryResponse) -> String {
    let mut out = String::new();
    match response {
        QueryResponse::Record { record: None } => out.push_str("No record with that id.\n"),
        QueryResponse::Record { record: Some(r) } => {
            out.push_str(&format!("id:           {}\n", r.id));
            out.push_str(&format!("source:       {}\n", r.attributes.source));
            out.push_str(&format!(
                "header:       {}\n",
                r.attributes.header.as_deref().unwrap_or("")
            ));
            out.push_str(&format!("level:        {}\n", r.attributes.level));
            out.push_str(&format!("content_hash: {}\n", r.attributes.content_hash));
            out.push('\n');
            out.push_str(&r.attributes.text);
            out.push('\n');
        }
        QueryResponse::Ranked { results } => render_ranked(&mut out, results),
        QueryResponse::Hybrid(h) => {
            out.push_str("Vector results:\n");
            render_ids(&mut out, &h.vector);
            out.push_str("BM25 results:\n");
            render_ids(&mut out, &h.bm25);
            out.push_str("Fused results:\n");
            render_ranked(&mut out, &h.fused);
        }
    }
    out
}

fn render_ids(out: &mut String, results: &[QueryResult]) {
    if results.is_empty() {
        out.push_str("  (none)\n");
    }
    for r in results {
        out.push_str(&format!("  {}\n", r.id));
    }
}

fn render_ranked(out: &mut String, results: &[QueryResult]) {
    if results.is_empty() {
        out.push_str("No results.\n");
        return;
    }
    for (i, r) in results.iter().enumerate() {
        let score = r
            .dist
            .map(|d| format!("{:.4}", d))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{}. [{}] {}\n", i + 1, score, r.id));
        if let Some(header) = &r.attributes.header {
            out.push_str(&format!("    header: {} (h{})\n", header, r.attributes.level));
        }
        out.push_str(&format!("    source: {}\n", r.attributes.source));
        out.push_str(&format!("    > {}\n", preview(&r.attributes.text)));
        out.push('\n');
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvec_core::hash::content_hash;
    use docvec_core::models::ChunkAttributes;
    use docvec_core::query::HybridResults;

    fn result(id: &str, dist: Option<f64>, header: Option<&str>) -> QueryResult {
        QueryResult {
            id: id.into(),
            dist,
            attributes: ChunkAttributes {
                text: "## Setup\nrun   the\ninstaller".into(),
                content_hash: content_hash("x"),
                source: "guide.md".into(),
                header: header.map(String::from),
                level: 2,
            },
        }
    }

    #[test]
    fn test_build_request_validates() {
        let config = Config::default();
        let empty = QueryArgs {
            search: Some("  ".into()),
            ..Default::default()
        };
        assert!(build_request(&config, &empty).is_err());

        let both = QueryArgs {
            id: Some("a_0".into()),
            search: Some("x".into()),
            ..Default::default()
        };
        assert!(build_request(&config, &both).is_err());

        let zero = QueryArgs {
            search: Some("x".into()),
            top_k: Some(0),
            ..Default::default()
        };
        assert!(build_request(&config, &zero).is_err());

        let ok = QueryArgs {
            search: Some("install".into()),
            method: SearchMethod::Bm25,
            ..Default::default()
        };
        assert_eq!(
            build_request(&config, &ok).unwrap(),
            QueryRequest::Search {
                text: "install".into(),
                method: SearchMethod::Bm25,
                top_k: 5,
            }
        );
    }

    #[test]
    fn test_hybrid_render_lists_three_sections() {
        let response = QueryResponse::Hybrid(HybridResults {
            vector: vec![result("g_0", Some(0.1), None)],
            bm25: vec![],
            fused: vec![result("g_0", Some(1.0 / 61.0), Some("Setup"))],
        });
        let text = render_human(&response);
        let v = text.find("Vector results:").unwrap();
        let b = text.find("BM25 results:").unwrap();
        let f = text.find("Fused results:").unwrap();
        assert!(v < b && b < f);
        assert!(text.contains("  (none)"));
        assert!(text.contains("1. [0.0164] g_0"));
        assert!(text.contains("header: Setup (h2)"));
        assert!(text.contains("> ## Setup run the installer"));
    }

    #[test]
    fn test_missing_record() {
        let text = render_human(&QueryResponse::Record { record: None });
        assert_eq!(text, "No record with that id.\n");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "word ".repeat(100);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }
}
