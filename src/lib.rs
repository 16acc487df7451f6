//! # find-ref
//!
//! Turn a loose author/year hint such as `Chomsky (1965)` plus a topical
//! keyword into formatted reference-list entries, using Crossref and Google
//! Books as bibliographic sources.
//!
//! ## Architecture
//!
//! - [`models`]: Citation hints, the common citation record and raw source payloads
//! - [`sources`]: Source adapters behind the [`Source`] trait, normalization and the registry
//! - [`search`]: The orchestrator that fans a hint out to every source
//! - [`utils`]: HTTP client, retry and citation formatting
//! - [`config`]: Configuration management
//!
//! ```rust,no_run
//! use find_ref::{SearchOrchestrator, SourceRegistry};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = SearchOrchestrator::new(SourceRegistry::new()?);
//! let outcome = orchestrator.run("Chomsky (1965)", "Syntax").await?;
//! for reference in &outcome.references {
//!     println!("{}", reference.formatted);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod search;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{parse, CitationHint, CitationRecord};
pub use search::{Reference, SearchError, SearchOrchestrator, SearchOutcome};
pub use sources::{Source, SourceRegistry};
