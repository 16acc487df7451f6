//! Registry for the sources a search fans out to.

use std::sync::Arc;

use super::{CrossrefSource, GoogleBooksSource, Source, SourceError};
use crate::config::Config;
use crate::models::SourceType;
use crate::utils::HttpClient;

/// Ordered set of sources
///
/// Registration order is the order results are reported in, so it never
/// depends on which source answers first.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create a registry with the built-in sources (Crossref, then Google Books)
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&Config::default())
    }

    /// Create a registry with the sources enabled in the configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::from_config(&config.http)?);
        let mut registry = Self::empty();

        for id in &config.sources.enabled {
            match SourceType::from_id(id) {
                Some(SourceType::Crossref) => registry.register(Arc::new(
                    CrossrefSource::from_config(Arc::clone(&client), config),
                )),
                Some(SourceType::GoogleBooks) => registry.register(Arc::new(
                    GoogleBooksSource::from_config(Arc::clone(&client), config),
                )),
                None => tracing::warn!("Ignoring unknown source '{}' in configuration", id),
            }
        }

        Ok(registry)
    }

    /// A registry with no sources, to be filled with [`register`](Self::register)
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Register a new source; a source with the same id is replaced in place
    pub fn register(&mut self, source: Arc<dyn Source>) {
        let existing = self.sources.iter().position(|s| s.id() == source.id());
        match existing {
            Some(index) => self.sources[index] = source,
            None => self.sources.push(source),
        }
    }

    /// Get all registered sources in registration order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    /// Get all source IDs
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
