//! Search orchestration: parse the hint, fan out to every source, normalize
//! and format what comes back.
//!
//! One search moves through `Parsing → Querying → Normalizing → Formatting →
//! Done`. Sources are queried concurrently and joined in registration order,
//! so the output never depends on which source answered first. A failing
//! source only removes its own results; the search fails as a whole only
//! when the hint is unusable or every source failed.
//!
//! Dropping the future returned by [`SearchOrchestrator::run`] abandons any
//! request still in flight.

use futures_util::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::Instrument;

use crate::config::Config;
use crate::models::{parse, CitationHint, CitationRecord, ParseError, RawRecord, SourceType};
use crate::sources::{normalize, Source, SourceError, SourceRegistry};
use crate::utils::{format_apa_with, ApaOptions, Markup};

const DEFAULT_LIMIT: usize = 5;
const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(20);

/// Stage of a search, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    Parsing,
    Querying,
    Normalizing,
    Formatting,
    Done,
    Failed,
}

/// One source that could not contribute to a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source_id: String,
    pub source_name: String,
    pub error: SourceError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_name, self.error)
    }
}

fn describe_failures(failures: &[SourceFailure]) -> String {
    if failures.is_empty() {
        return "no sources are enabled".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reasons a whole search fails
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The citation hint is unusable; fix the input
    #[error("Invalid citation: {0}")]
    Parse(#[from] ParseError),

    /// No source could be queried; retry later
    #[error("Search unavailable: {}", describe_failures(.0))]
    AllSourcesFailed(Vec<SourceFailure>),

    /// Sources answered but nothing usable matched
    #[error("No references found matching the query")]
    NoResults,
}

/// A formatted reference together with the record it was rendered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub record: CitationRecord,
    pub formatted: String,
}

impl Reference {
    pub fn source(&self) -> SourceType {
        self.record.source
    }
}

/// Result of a successful search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub hint: CitationHint,
    /// Grouped by source in registration order, each source's own order kept
    pub references: Vec<Reference>,
    /// Sources that failed while others succeeded
    pub failures: Vec<SourceFailure>,
}

/// Coordinates one search across all registered sources
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    registry: SourceRegistry,
    limit: usize,
    source_timeout: Duration,
    apa: ApaOptions,
}

impl SearchOrchestrator {
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry,
            limit: DEFAULT_LIMIT,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            apa: ApaOptions::default(),
        }
    }

    /// Build an orchestrator with limits taken from the configuration
    pub fn from_config(registry: SourceRegistry, config: &Config) -> Self {
        Self::new(registry)
            .with_limit(config.search.limit)
            .with_source_timeout(config.search.source_timeout())
    }

    /// Maximum results requested from each source
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Bounded wait for each source; exceeding it counts as the source being unavailable
    pub fn with_source_timeout(mut self, source_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.apa.markup = markup;
        self
    }

    /// Append ISBNs to book references
    pub fn with_isbn(mut self, show_isbn: bool) -> Self {
        self.apa.show_isbn = show_isbn;
        self
    }

    /// Parse `citation` and run the search with `keyword`
    pub async fn run(&self, citation: &str, keyword: &str) -> Result<SearchOutcome, SearchError> {
        let span = tracing::info_span!("search", citation = %citation, keyword = %keyword);
        async {
            tracing::debug!(stage = ?SearchStage::Parsing, "Parsing citation hint");
            match parse(citation, keyword) {
                Ok(hint) => self.search(&hint).await,
                Err(e) => {
                    tracing::debug!(stage = ?SearchStage::Failed, "Unusable hint: {}", e);
                    Err(SearchError::from(e))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run the search for an already parsed hint
    pub async fn search(&self, hint: &CitationHint) -> Result<SearchOutcome, SearchError> {
        tracing::debug!(
            stage = ?SearchStage::Querying,
            "Querying {} sources for {} ({}) / {:?}",
            self.registry.len(),
            hint.author,
            hint.year,
            hint.keyword
        );

        let results = join_all(self.registry.all().map(|source| self.query(source, hint))).await;

        let mut failures = Vec::new();
        let mut batches = Vec::new();
        for (source, result) in results {
            match result {
                Ok(records) => {
                    tracing::info!("{} returned {} results", source.name(), records.len());
                    batches.push(records);
                }
                Err(error) => {
                    tracing::warn!("{} failed: {}", source.name(), error);
                    failures.push(SourceFailure {
                        source_id: source.id().to_string(),
                        source_name: source.name().to_string(),
                        error,
                    });
                }
            }
        }

        if batches.is_empty() {
            tracing::debug!(stage = ?SearchStage::Failed, "Every source failed");
            return Err(SearchError::AllSourcesFailed(failures));
        }

        tracing::debug!(stage = ?SearchStage::Normalizing, "Normalizing results");
        let records = normalize_all(batches);

        tracing::debug!(stage = ?SearchStage::Formatting, "Formatting {} records", records.len());
        let references: Vec<Reference> = records
            .into_iter()
            .map(|record| Reference {
                formatted: format_apa_with(&record, self.apa),
                record,
            })
            .collect();

        if references.is_empty() {
            tracing::debug!(stage = ?SearchStage::Done, "No usable results");
            return Err(SearchError::NoResults);
        }

        tracing::debug!(stage = ?SearchStage::Done, "{} references", references.len());
        Ok(SearchOutcome {
            hint: hint.clone(),
            references,
            failures,
        })
    }

    async fn query(
        &self,
        source: &Arc<dyn Source>,
        hint: &CitationHint,
    ) -> (Arc<dyn Source>, Result<Vec<RawRecord>, SourceError>) {
        tracing::info!("Searching {}...", source.name());

        let result = match timeout(self.source_timeout, source.search(hint, self.limit)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Unavailable(format!(
                "{} did not answer within {:?}",
                source.name(),
                self.source_timeout
            ))),
        };

        (Arc::clone(source), result)
    }
}

/// Normalize every raw record, dropping untitled and malformed ones
fn normalize_all(batches: Vec<Vec<RawRecord>>) -> Vec<CitationRecord> {
    batches
        .into_iter()
        .flatten()
        .filter_map(|raw| {
            let source = raw.source;
            match normalize(raw) {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    tracing::debug!("Dropping {} record without a title", source);
                    None
                }
                Err(e) => {
                    tracing::warn!("Skipping record: {}", e);
                    None
                }
            }
        })
        .collect()
}
