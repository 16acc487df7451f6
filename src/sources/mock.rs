//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{CitationHint, RawRecord, SourceType};
use crate::sources::{Source, SourceError};

/// A mock source for testing that returns predefined responses.
///
/// Without a configured response it behaves like a source with no hits.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    source_type: SourceType,
    response: Mutex<Option<Result<Vec<RawRecord>, SourceError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source producing records of `source_type`.
    pub fn new(source_type: SourceType) -> Self {
        Self {
            id: format!("mock_{}", source_type.id()),
            source_type,
            response: Mutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer every search with these raw payloads.
    pub fn with_records(self, payloads: Vec<serde_json::Value>) -> Self {
        let records = payloads
            .into_iter()
            .map(|payload| RawRecord::new(self.source_type, payload))
            .collect();
        self.set_search_response(Ok(records));
        self
    }

    /// Fail every search with this error.
    pub fn with_error(self, error: SourceError) -> Self {
        self.set_search_response(Err(error));
        self
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the search response to return.
    pub fn set_search_response(&self, response: Result<Vec<RawRecord>, SourceError>) {
        let mut guard = self.response.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(response);
    }

    /// Number of searches issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn search(
        &self,
        _hint: &CitationHint,
        limit: usize,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match response {
            Some(Ok(records)) => Ok(records.into_iter().take(limit).collect()),
            Some(Err(error)) => Err(error),
            None => Ok(Vec::new()),
        }
    }
}
