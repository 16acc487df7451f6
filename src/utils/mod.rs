//! Utility modules shared by the sources and the search pipeline.
//!
//! - [`HttpClient`]: HTTP client that maps responses onto [`SourceError`](crate::sources::SourceError)
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//! - [`RetryConfig`]: Configuration for retry logic with exponential backoff
//! - [`format_apa`]: Render a citation record as an APA reference
//! - [`format_bibtex`]: Render a citation record as a BibTeX entry
//! - [`format_csv`]: Render a list of citations as CSV rows
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use find_ref::utils::{with_retry, HttpClient, RetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let client = &client;
//! let body: serde_json::Value = with_retry(RetryConfig::default(), move || {
//!     client.get_json("https://api.crossref.org/works?rows=1", "Crossref")
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

mod cite;
mod http;
mod retry;

pub use cite::{
    format_apa, format_apa_with, format_bibtex, format_citation, format_csv,
    get_structured_citation, ApaOptions, CitationStyle, ExportError, Markup, StructuredCitation,
};
pub use http::HttpClient;
pub use retry::{with_retry, RetryConfig, TransientError};
