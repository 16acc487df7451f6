//! Citation record model shared by every bibliographic source.

use serde::{Deserialize, Serialize};

/// The bibliographic database a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Crossref,
    GoogleBooks,
}

impl SourceType {
    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::Crossref => "Crossref",
            SourceType::GoogleBooks => "Google Books",
        }
    }

    /// Returns the source identifier (used in configuration)
    pub fn id(&self) -> &'static str {
        match self {
            SourceType::Crossref => "crossref",
            SourceType::GoogleBooks => "google_books",
        }
    }

    /// Look up a source by its identifier
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().replace('-', "_").as_str() {
            "crossref" => Some(SourceType::Crossref),
            "google_books" | "googlebooks" => Some(SourceType::GoogleBooks),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One author as a family/given name pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
}

impl Author {
    pub fn new(family: impl Into<String>, given: impl Into<String>) -> Self {
        let given = given.into();
        Self {
            family: family.into(),
            given: if given.trim().is_empty() {
                None
            } else {
                Some(given)
            },
        }
    }

    /// An author known only by a single name (organisations, mononyms)
    pub fn family_only(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            given: None,
        }
    }
}

/// Persistent identifier attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Identifier {
    Doi(String),
    Isbn(String),
    Url(String),
}

impl Identifier {
    pub fn value(&self) -> &str {
        match self {
            Identifier::Doi(v) | Identifier::Isbn(v) | Identifier::Url(v) => v,
        }
    }
}

/// A normalized citation, independent of which source produced it.
///
/// `title` is never empty: the normalizer drops records without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub authors: Vec<Author>,
    pub title: String,
    pub year: Option<i32>,
    pub container_title: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub source: SourceType,
    pub identifier: Option<Identifier>,
}

impl CitationRecord {
    /// Create a record with only the required fields set
    pub fn new(title: impl Into<String>, source: SourceType) -> Self {
        Self {
            authors: Vec::new(),
            title: title.into(),
            year: None,
            container_title: None,
            volume: None,
            issue: None,
            pages: None,
            source,
            identifier: None,
        }
    }

    pub fn with_authors(mut self, authors: Vec<Author>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_container_title(mut self, container: impl Into<String>) -> Self {
        self.container_title = Some(container.into());
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issue = Some(issue.into());
        self
    }

    pub fn with_pages(mut self, pages: impl Into<String>) -> Self {
        self.pages = Some(pages.into());
        self
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

/// A result item exactly as one source returned it.
///
/// The payload is only decoded into the source's typed schema by the
/// normalizer; nothing downstream of it sees untyped data.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source: SourceType,
    pub payload: serde_json::Value,
}

impl RawRecord {
    pub fn new(source: SourceType, payload: serde_json::Value) -> Self {
        Self { source, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_ids() {
        assert_eq!(SourceType::from_id("crossref"), Some(SourceType::Crossref));
        assert_eq!(
            SourceType::from_id("google-books"),
            Some(SourceType::GoogleBooks)
        );
        assert_eq!(SourceType::from_id("arxiv"), None);
        assert_eq!(SourceType::GoogleBooks.to_string(), "Google Books");
    }

    #[test]
    fn test_author_blank_given_is_none() {
        let author = Author::new("Plato", "  ");
        assert_eq!(author.given, None);
        assert_eq!(author, Author::family_only("Plato"));
    }
}
