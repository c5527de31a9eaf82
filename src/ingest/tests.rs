use super::*;
use crate::config::Config;
use crate::ollama::OllamaClient;
use std::collections::HashSet;

fn test_ingestor_parts() -> (OllamaClient, Config) {
    let config = Config::default();
    let ollama = OllamaClient::new(&config.ollama).expect("client should build");
    (ollama, config)
}

#[test]
fn collect_assigns_distinct_ids_across_sources() {
    let (ollama, config) = test_ingestor_parts();
    let ingestor = Ingestor::new(&ollama, &config);

    let page_a = "<h1>One</h1><p>First body.</p><h2>Two</h2><p>Second body.</p>";
    let page_b = "<h1>Other</h1><p>Other body.</p>";

    let mut sources = SourceMap::new();
    sources.insert("https://example.com/a".to_string(), Some(page_a.to_string()));
    sources.insert("https://example.com/b".to_string(), Some(page_b.to_string()));

    let pending = ingestor.collect(&sources);

    assert_eq!(pending.len(), 3);
    let ids: HashSet<&str> = pending.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), pending.len(), "ids must be pairwise distinct");
    assert!(ids.iter().all(|id| id.starts_with("doc_")));
}

#[test]
fn collect_ids_cannot_collide_between_index_positions() {
    // doc_1_11_1 and doc_11_1_1 must stay distinct; unseparated
    // concatenation would map both to "doc1111".
    let (ollama, config) = test_ingestor_parts();
    let ingestor = Ingestor::new(&ollama, &config);

    let many_sections = (0..12)
        .map(|i| format!("<h2>Heading {i}</h2><p>Body {i}.</p>"))
        .collect::<Vec<_>>()
        .concat();

    let mut sources = SourceMap::new();
    for i in 0..12 {
        sources.insert(format!("https://example.com/{i:02}"), Some(many_sections.clone()));
    }

    let pending = ingestor.collect(&sources);

    let ids: HashSet<&str> = pending.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), pending.len());
}

#[test]
fn collect_preserves_section_metadata() {
    let (ollama, config) = test_ingestor_parts();
    let ingestor = Ingestor::new(&ollama, &config);

    let mut sources = SourceMap::new();
    sources.insert(
        "https://example.com/a".to_string(),
        Some("<html><body><h1>Intro</h1><p>Hello world.</p></body></html>".to_string()),
    );

    let pending = ingestor.collect(&sources);

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "doc_0_0_0");
    assert_eq!(pending[0].content, "Hello world.");
    assert_eq!(pending[0].heading, "Intro");
    assert_eq!(pending[0].section_type, "h1");
    assert_eq!(pending[0].source_id, "https://example.com/a");
    assert_eq!(pending[0].chunk_index, 0);
}

#[test]
fn collect_skips_empty_sources_and_keeps_the_rest() {
    let (ollama, config) = test_ingestor_parts();
    let ingestor = Ingestor::new(&ollama, &config);

    let mut sources = SourceMap::new();
    sources.insert(
        "https://example.com/empty".to_string(),
        Some("<script>nothing()</script>".to_string()),
    );
    sources.insert(
        "https://example.com/full".to_string(),
        Some("<h1>Title</h1><p>Content.</p>".to_string()),
    );

    let pending = ingestor.collect(&sources);

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].source_id, "https://example.com/full");
}

#[test]
fn bare_markup_is_wrapped() {
    let wrapped = wrap_bare_markup("<h1>Title</h1><p>Text.</p>");
    assert!(wrapped.starts_with("<!DOCTYPE html>"));
    assert!(wrapped.contains("<h1>Title</h1>"));
}

#[test]
fn full_documents_are_not_rewrapped() {
    let document = "<!DOCTYPE html><html><body><p>x</p></body></html>";
    assert_eq!(wrap_bare_markup(document), document);

    let no_doctype = "<html><body><p>x</p></body></html>";
    assert_eq!(wrap_bare_markup(no_doctype), no_doctype);

    let leading_whitespace = "  \n<!doctype html><html></html>";
    assert_eq!(wrap_bare_markup(leading_whitespace), leading_whitespace);
}
