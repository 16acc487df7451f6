//! Mapping of raw source items onto [`CitationRecord`].
//!
//! Each raw payload is decoded into its source's typed schema
//! ([`CrossrefWork`], [`GoogleVolume`]) and then mapped field by field.
//! A record without a usable title maps to `None` and is simply dropped.

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{CrossrefWork, GoogleVolume};
use crate::models::{CitationRecord, RawRecord, SourceType};

/// A raw item whose shape contradicts its source's schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed {source_type} record: {message}")]
pub struct NormalizationError {
    pub source_type: SourceType,
    pub message: String,
}

/// Map one raw item onto the common citation record.
///
/// Returns `Ok(None)` when the item has no title.
pub fn normalize(raw: RawRecord) -> Result<Option<CitationRecord>, NormalizationError> {
    match raw.source {
        SourceType::Crossref => {
            decode::<CrossrefWork>(raw.source, raw.payload).map(CrossrefWork::into_record)
        }
        SourceType::GoogleBooks => {
            decode::<GoogleVolume>(raw.source, raw.payload).map(GoogleVolume::into_record)
        }
    }
}

fn decode<T: DeserializeOwned>(
    source_type: SourceType,
    payload: serde_json::Value,
) -> Result<T, NormalizationError> {
    serde_json::from_value(payload).map_err(|e| NormalizationError {
        source_type,
        message: e.to_string(),
    })
}

/// Collapse internal whitespace; blank text becomes `None`
pub(crate) fn clean(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Same as [`clean`] for optional fields
pub(crate) fn clean_opt(text: Option<&str>) -> Option<String> {
    text.and_then(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Identifier};
    use serde_json::json;

    #[test]
    fn test_normalize_crossref() {
        let raw = RawRecord::new(
            SourceType::Crossref,
            json!({
                "title": ["Aspects of the Theory\n of Syntax"],
                "author": [{"family": "Chomsky", "given": "Noam"}],
                "issued": {"date-parts": [[1965, 1]]},
                "container-title": ["MIT Press"],
                "DOI": "10.21236/AD0616323"
            }),
        );

        let record = normalize(raw).unwrap().unwrap();
        assert_eq!(record.title, "Aspects of the Theory of Syntax");
        assert_eq!(record.authors, vec![Author::new("Chomsky", "Noam")]);
        assert_eq!(record.year, Some(1965));
        assert_eq!(record.container_title.as_deref(), Some("MIT Press"));
        assert_eq!(
            record.identifier,
            Some(Identifier::Doi("10.21236/AD0616323".to_string()))
        );
        assert_eq!(record.source, SourceType::Crossref);
    }

    #[test]
    fn test_normalize_google_books() {
        let raw = RawRecord::new(
            SourceType::GoogleBooks,
            json!({
                "volumeInfo": {
                    "title": "Syntactic Structures",
                    "authors": ["Noam Chomsky"],
                    "publisher": "Walter de Gruyter",
                    "publishedDate": "2002-01-01"
                }
            }),
        );

        let record = normalize(raw).unwrap().unwrap();
        assert_eq!(record.title, "Syntactic Structures");
        assert_eq!(record.authors, vec![Author::new("Chomsky", "Noam")]);
        assert_eq!(record.year, Some(2002));
        assert_eq!(record.container_title.as_deref(), Some("Walter de Gruyter"));
    }

    #[test]
    fn test_missing_title_is_dropped_not_an_error() {
        let raw = RawRecord::new(SourceType::Crossref, json!({"title": []}));
        assert_eq!(normalize(raw), Ok(None));

        let raw = RawRecord::new(SourceType::GoogleBooks, json!({"volumeInfo": {"title": "  "}}));
        assert_eq!(normalize(raw), Ok(None));
    }

    #[test]
    fn test_wrong_shape_is_normalization_error() {
        let raw = RawRecord::new(SourceType::Crossref, json!({"title": 42}));
        let err = normalize(raw).unwrap_err();
        assert_eq!(err.source_type, SourceType::Crossref);

        let raw = RawRecord::new(SourceType::GoogleBooks, json!("not an object"));
        assert!(normalize(raw).is_err());
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("  a \n b  "), Some("a b".to_string()));
        assert_eq!(clean(" \t "), None);
        assert_eq!(clean_opt(None), None);
    }
}
