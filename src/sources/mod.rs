//! Bibliographic source adapters.
//!
//! This module defines the [`Source`] trait that every external database
//! adapter implements. An adapter turns a [`CitationHint`] into one request
//! against its API and hands back the result items untouched, as
//! [`RawRecord`]s; [`normalize`] then maps each of them onto the common
//! [`CitationRecord`](crate::models::CitationRecord).
//!
//! Adapters shipped with the crate:
//!
//! - `crossref` - Crossref REST API (`/works`), filtered by publication year
//! - `google_books` - Google Books volumes search, filtered by published date
//!
//! The [`SourceRegistry`] decides which of them run and in which order.

mod crossref;
mod google_books;
pub mod mock;
mod normalize;
mod registry;

pub use crossref::{CrossrefAuthor, CrossrefDate, CrossrefSource, CrossrefWork};
pub use google_books::{
    GoogleBooksSource, GoogleIndustryIdentifier, GoogleVolume, GoogleVolumeInfo,
};
pub use mock::MockSource;
pub use normalize::{normalize, NormalizationError};
pub use registry::SourceRegistry;

use crate::models::{CitationHint, RawRecord, SourceType};
use async_trait::async_trait;

/// The Source trait defines the interface for all bibliographic adapters.
///
/// `search` issues exactly one logical request (retries aside) and keeps no
/// state between calls. A well-formed query with no hits is `Ok(vec![])`,
/// never an error.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Which raw schema this source produces
    fn source_type(&self) -> SourceType;

    /// Query the source for at most `limit` items matching the hint
    async fn search(&self, hint: &CitationHint, limit: usize)
        -> Result<Vec<RawRecord>, SourceError>;
}

/// Errors that can occur when querying a source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Network failure or timeout; the source could not be reached
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API asked us to slow down
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    /// The response envelope could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Whether the source could not be reached at all (as opposed to answering badly)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(SourceError::Unavailable("timed out".to_string()).is_unavailable());
        assert!(!SourceError::RateLimited { retry_after: None }.is_unavailable());
        assert!(!SourceError::Api {
            status: 400,
            message: "bad".to_string()
        }
        .is_unavailable());
    }
}
