//! Integration tests for find-ref
//!
//! These tests drive the search orchestrator end to end against mock sources.

use find_ref::models::{ParseError, SourceType};
use find_ref::search::{SearchError, SearchOrchestrator};
use find_ref::sources::{MockSource, SourceError, SourceRegistry};
use find_ref::utils::Markup;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn registry(sources: Vec<MockSource>) -> SourceRegistry {
    let mut registry = SourceRegistry::empty();
    for source in sources {
        registry.register(Arc::new(source));
    }
    registry
}

fn crossref_work(title: &str, family: &str, year: i32) -> serde_json::Value {
    json!({
        "title": [title],
        "author": [{"given": "Noam", "family": family}],
        "issued": {"date-parts": [[year]]}
    })
}

fn google_volume(title: &str, author: &str, date: &str) -> serde_json::Value {
    json!({"volumeInfo": {
        "title": title,
        "authors": [author],
        "publishedDate": date
    }})
}

#[tokio::test]
async fn test_chomsky_end_to_end_from_crossref() {
    let crossref = MockSource::new(SourceType::Crossref).with_records(vec![json!({
        "title": ["Aspects of the Theory of Syntax"],
        "author": [{"given": "Noam", "family": "Chomsky"}],
        "container-title": ["MIT Press"],
        "issued": {"date-parts": [[1965]]}
    })]);
    let books = MockSource::new(SourceType::GoogleBooks);

    let outcome = assert_ok!(
        SearchOrchestrator::new(registry(vec![crossref, books]))
            .run("Chomsky (1965)", "Syntax")
            .await
    );

    let lines: Vec<&str> = outcome
        .references
        .iter()
        .map(|r| r.formatted.as_str())
        .collect();
    assert_eq!(
        lines,
        vec!["Chomsky, N. (1965). Aspects of the Theory of Syntax. MIT Press."]
    );
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_chomsky_end_to_end_from_google_books() {
    let books = MockSource::new(SourceType::GoogleBooks).with_records(vec![json!({
        "volumeInfo": {
            "title": "Aspects of the Theory of Syntax",
            "authors": ["Noam Chomsky"],
            "publisher": "MIT Press",
            "publishedDate": "1965",
            "industryIdentifiers": [{"type": "ISBN_13", "identifier": "9780262530071"}]
        }
    })]);

    let outcome = assert_ok!(
        SearchOrchestrator::new(registry(vec![books]))
            .run("Chomsky (1965)", "Syntax")
            .await
    );

    assert_eq!(outcome.hint.author, "Chomsky");
    assert_eq!(outcome.hint.year, 1965);
    assert_eq!(outcome.references.len(), 1);
    assert_eq!(
        outcome.references[0].formatted,
        "Chomsky, N. (1965). Aspects of the Theory of Syntax. MIT Press."
    );
}

#[tokio::test]
async fn test_partial_failure_keeps_surviving_results() {
    let crossref = MockSource::new(SourceType::Crossref)
        .with_error(SourceError::Unavailable("connection refused".to_string()));
    let books = MockSource::new(SourceType::GoogleBooks).with_records(vec![
        google_volume("Syntactic Structures", "Noam Chomsky", "1957"),
        google_volume("Cartesian Linguistics", "Noam Chomsky", "1966"),
    ]);

    let outcome = assert_ok!(
        SearchOrchestrator::new(registry(vec![crossref, books]))
            .run("Chomsky (1957)", "Syntax")
            .await
    );

    assert_eq!(outcome.references.len(), 2);
    assert!(outcome
        .references
        .iter()
        .all(|r| r.source() == SourceType::GoogleBooks));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].source_id, "mock_crossref");
}

#[tokio::test]
async fn test_all_sources_failed() {
    let crossref = MockSource::new(SourceType::Crossref)
        .with_error(SourceError::Unavailable("dns failure".to_string()));
    let books = MockSource::new(SourceType::GoogleBooks).with_error(SourceError::Api {
        status: 503,
        message: "Service Unavailable".to_string(),
    });

    let err = assert_err!(
        SearchOrchestrator::new(registry(vec![crossref, books]))
            .run("Chomsky (1965)", "Syntax")
            .await
    );

    match &err {
        SearchError::AllSourcesFailed(failures) => assert_eq!(failures.len(), 2),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("Search unavailable"));
}

#[tokio::test]
async fn test_zero_results_is_distinct_from_failure() {
    let crossref = MockSource::new(SourceType::Crossref).with_records(Vec::new());
    let books = MockSource::new(SourceType::GoogleBooks).with_records(Vec::new());

    let err = assert_err!(
        SearchOrchestrator::new(registry(vec![crossref, books]))
            .run("Nobody (1999)", "nothing")
            .await
    );

    assert_eq!(err, SearchError::NoResults);
    assert_eq!(err.to_string(), "No references found matching the query");
}

#[tokio::test]
async fn test_parse_error_is_reported_before_any_query() {
    let crossref = Arc::new(MockSource::new(SourceType::Crossref));
    let mut reg = SourceRegistry::empty();
    reg.register(crossref.clone());

    let err = assert_err!(SearchOrchestrator::new(reg).run("(1965)", "Syntax").await);

    assert!(matches!(err, SearchError::Parse(ParseError::MissingAuthor(_))));
    assert!(err.to_string().starts_with("Invalid citation"));
    assert_eq!(crossref.calls(), 0);
}

#[tokio::test]
async fn test_order_follows_registry_not_latency() {
    let crossref = MockSource::new(SourceType::Crossref)
        .with_delay(Duration::from_millis(150))
        .with_records(vec![
            crossref_work("Slow First", "Chomsky", 1965),
            crossref_work("Slow Second", "Chomsky", 1965),
        ]);
    let books = MockSource::new(SourceType::GoogleBooks)
        .with_records(vec![google_volume("Fast", "Noam Chomsky", "1965")]);

    let outcome = assert_ok!(
        SearchOrchestrator::new(registry(vec![crossref, books]))
            .run("Chomsky (1965)", "Syntax")
            .await
    );

    let titles: Vec<&str> = outcome
        .references
        .iter()
        .map(|r| r.record.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Slow First", "Slow Second", "Fast"]);
}

#[tokio::test]
async fn test_slow_source_times_out_as_unavailable() {
    let crossref = MockSource::new(SourceType::Crossref)
        .with_delay(Duration::from_secs(5))
        .with_records(vec![crossref_work("Never Seen", "Chomsky", 1965)]);
    let books = MockSource::new(SourceType::GoogleBooks)
        .with_records(vec![google_volume("Seen", "Noam Chomsky", "1965")]);

    let outcome = assert_ok!(
        SearchOrchestrator::new(registry(vec![crossref, books]))
            .with_source_timeout(Duration::from_millis(50))
            .run("Chomsky (1965)", "Syntax")
            .await
    );

    assert_eq!(outcome.references.len(), 1);
    assert_eq!(outcome.references[0].record.title, "Seen");
    assert!(outcome.failures[0].error.is_unavailable());
}

#[tokio::test]
async fn test_malformed_record_does_not_sink_the_batch() {
    let crossref = MockSource::new(SourceType::Crossref).with_records(vec![
        json!({"title": {"unexpected": "object"}}),
        crossref_work("Good", "Chomsky", 1965),
    ]);

    let outcome = assert_ok!(
        SearchOrchestrator::new(registry(vec![crossref]))
            .run("Chomsky (1965)", "Syntax")
            .await
    );

    assert_eq!(outcome.references.len(), 1);
    assert_eq!(
        outcome.references[0].formatted,
        "Chomsky, N. (1965). Good."
    );
}

#[tokio::test]
async fn test_markdown_markup_reaches_formatter() {
    let books = MockSource::new(SourceType::GoogleBooks).with_records(vec![json!({
        "volumeInfo": {
            "title": "Aspects of the Theory of Syntax",
            "authors": ["Noam Chomsky"],
            "publisher": "MIT Press",
            "publishedDate": "1965"
        }
    })]);

    let outcome = assert_ok!(
        SearchOrchestrator::new(registry(vec![books]))
            .with_markup(Markup::Markdown)
            .run("Chomsky (1965)", "Syntax")
            .await
    );

    assert!(outcome.references[0].formatted.contains("*MIT Press*"));
}

#[tokio::test]
async fn test_repeated_runs_are_deterministic() {
    let orchestrator = SearchOrchestrator::new(registry(vec![
        MockSource::new(SourceType::Crossref)
            .with_records(vec![crossref_work("A", "Chomsky", 1965)]),
        MockSource::new(SourceType::GoogleBooks)
            .with_records(vec![google_volume("B", "Noam Chomsky", "1965")]),
    ]));

    let first = assert_ok!(orchestrator.run("Chomsky (1965)", "Syntax").await);
    let second = assert_ok!(orchestrator.run("Chomsky (1965)", "Syntax").await);

    assert_eq!(first.references, second.references);
}
