//! Google Books source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::normalize::{clean, clean_opt};
use crate::config::{Config, GOOGLE_BOOKS_API_BASE};
use crate::models::{Author, CitationHint, CitationRecord, Identifier, RawRecord, SourceType};
use crate::sources::{Source, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

const SOURCE_NAME: &str = "Google Books";

/// Google Books API caps `maxResults` at 40
const MAX_RESULTS_CAP: usize = 40;

/// Google Books source
///
/// Searches volumes with `inauthor:` and `subject:` operators. The API has no
/// publication-year filter, so volumes whose `publishedDate` does not mention
/// the hint year are discarded here.
#[derive(Debug, Clone)]
pub struct GoogleBooksSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl GoogleBooksSource {
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            retry: RetryConfig::default(),
        }
    }

    /// Build the source from the application configuration
    pub fn from_config(client: Arc<HttpClient>, config: &Config) -> Self {
        let mut source = Self::new(client, &config.sources.google_books_url)
            .with_retry(config.retry.retry_config());
        source.api_key = config.sources.google_books_api_key.clone();
        source
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Request URL for a hint
    pub fn search_url(&self, hint: &CitationHint, limit: usize) -> String {
        let mut query = format!("inauthor:{}", hint.primary_author());
        if !hint.keyword.is_empty() {
            query = format!("{} subject:{}", query, hint.keyword);
        }

        let mut url = format!(
            "{}/volumes?q={}&maxResults={}&orderBy=relevance",
            self.base_url,
            urlencoding::encode(&query),
            limit.min(MAX_RESULTS_CAP)
        );

        if let Some(key) = &self.api_key {
            url = format!("{}&key={}", url, urlencoding::encode(key));
        }

        url
    }
}

impl Default for GoogleBooksSource {
    fn default() -> Self {
        let client = HttpClient::from_client(Arc::new(reqwest::Client::new()));
        Self::new(Arc::new(client), GOOGLE_BOOKS_API_BASE)
    }
}

#[async_trait]
impl Source for GoogleBooksSource {
    fn id(&self) -> &str {
        "google_books"
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn source_type(&self) -> SourceType {
        SourceType::GoogleBooks
    }

    async fn search(
        &self,
        hint: &CitationHint,
        limit: usize,
    ) -> Result<Vec<RawRecord>, SourceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let url = self.search_url(hint, limit);

        let client = Arc::clone(&self.client);
        let data: VolumesResponse = with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { client.get_json(&url, SOURCE_NAME).await }
        })
        .await?;

        let year = hint.year.to_string();
        let fetched = data.items.len();
        let items: Vec<RawRecord> = data
            .items
            .into_iter()
            .filter(|item| published_in(item, &year))
            .take(limit)
            .map(|item| RawRecord::new(SourceType::GoogleBooks, item))
            .collect();

        tracing::debug!(
            "Google Books returned {} volumes, {} published in {}",
            fetched,
            items.len(),
            year
        );

        Ok(items)
    }
}

fn published_in(item: &serde_json::Value, year: &str) -> bool {
    item.pointer("/volumeInfo/publishedDate")
        .and_then(|date| date.as_str())
        .is_some_and(|date| date.contains(year))
}

// ===== Google Books API Types =====

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    /// Absent when nothing matched
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// One Google Books volume
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleVolume {
    #[serde(rename = "volumeInfo", default)]
    pub volume_info: GoogleVolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleVolumeInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<String>,
    #[serde(rename = "industryIdentifiers", default)]
    pub industry_identifiers: Vec<GoogleIndustryIdentifier>,
    #[serde(rename = "infoLink", default)]
    pub info_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleIndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

/// Split "Given Family" on the last whitespace run
fn split_name(name: &str) -> Option<Author> {
    let name = clean(name)?;
    Some(match name.rsplit_once(' ') {
        Some((given, family)) => Author::new(family, given),
        None => Author::family_only(name),
    })
}

fn leading_year(date: &str) -> Option<i32> {
    let year = date.trim().get(..4)?;
    if year.chars().all(|c| c.is_ascii_digit()) {
        year.parse().ok()
    } else {
        None
    }
}

impl GoogleVolumeInfo {
    fn isbn(&self) -> Option<String> {
        ["ISBN_13", "ISBN_10"].iter().find_map(|kind| {
            self.industry_identifiers
                .iter()
                .find(|id| id.kind == *kind)
                .and_then(|id| clean(&id.identifier))
        })
    }
}

impl GoogleVolume {
    /// Map onto the common record; `None` when there is no usable title
    pub fn into_record(self) -> Option<CitationRecord> {
        let info = self.volume_info;
        let mut title = clean_opt(info.title.as_deref())?;
        if let Some(subtitle) = clean_opt(info.subtitle.as_deref()) {
            title = format!("{}: {}", title, subtitle);
        }

        let identifier = info
            .isbn()
            .map(Identifier::Isbn)
            .or_else(|| clean_opt(info.info_link.as_deref()).map(Identifier::Url));

        let mut record = CitationRecord::new(title, SourceType::GoogleBooks)
            .with_authors(info.authors.iter().filter_map(|a| split_name(a)).collect());
        record.year = info.published_date.as_deref().and_then(leading_year);
        record.container_title = clean_opt(info.publisher.as_deref());
        record.identifier = identifier;

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse;
    use serde_json::json;

    fn volume(value: serde_json::Value) -> GoogleVolume {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_search_url() {
        let source = GoogleBooksSource::default();
        let hint = parse("Chomsky (1965)", "Syntax").unwrap();

        assert_eq!(
            source.search_url(&hint, 5),
            "https://www.googleapis.com/books/v1/volumes?q=inauthor%3AChomsky%20subject%3ASyntax&maxResults=5&orderBy=relevance"
        );
    }

    #[test]
    fn test_search_url_caps_results_and_adds_key() {
        let source = GoogleBooksSource::default().with_api_key("k&y");
        let hint = parse("Chomsky (1965)", "").unwrap();
        let url = source.search_url(&hint, 100);

        assert!(url.contains("q=inauthor%3AChomsky&"));
        assert!(url.contains("maxResults=40"));
        assert!(url.ends_with("&key=k%26y"));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Noam Chomsky"), Some(Author::new("Chomsky", "Noam")));
        assert_eq!(
            split_name("  Mary  Ann   Evans "),
            Some(Author::new("Evans", "Mary Ann"))
        );
        assert_eq!(split_name("Homer"), Some(Author::family_only("Homer")));
        assert_eq!(split_name("   "), None);
    }

    #[test]
    fn test_identifier_preference() {
        let record = volume(json!({"volumeInfo": {
            "title": "T",
            "industryIdentifiers": [
                {"type": "ISBN_10", "identifier": "0262530074"},
                {"type": "ISBN_13", "identifier": "9780262530071"}
            ],
            "infoLink": "http://books.google.com/books?id=x"
        }}))
        .into_record()
        .unwrap();
        assert_eq!(
            record.identifier,
            Some(Identifier::Isbn("9780262530071".to_string()))
        );

        let record = volume(json!({"volumeInfo": {
            "title": "T",
            "infoLink": "http://books.google.com/books?id=x"
        }}))
        .into_record()
        .unwrap();
        assert_eq!(
            record.identifier,
            Some(Identifier::Url("http://books.google.com/books?id=x".to_string()))
        );
    }

    #[test]
    fn test_subtitle_and_year() {
        let record = volume(json!({"volumeInfo": {
            "title": "Aspects of the Theory of Syntax",
            "subtitle": "50th Anniversary Edition",
            "publishedDate": "2015"
        }}))
        .into_record()
        .unwrap();

        assert_eq!(
            record.title,
            "Aspects of the Theory of Syntax: 50th Anniversary Edition"
        );
        assert_eq!(record.year, Some(2015));
        assert!(record.volume.is_none() && record.issue.is_none() && record.pages.is_none());
    }

    #[test]
    fn test_published_in() {
        let item = json!({"volumeInfo": {"publishedDate": "1965-05"}});
        assert!(published_in(&item, "1965"));
        assert!(!published_in(&item, "1966"));
        assert!(!published_in(&json!({"volumeInfo": {}}), "1965"));
    }

    #[test]
    fn test_leading_year() {
        assert_eq!(leading_year("1965-01-01"), Some(1965));
        assert_eq!(leading_year("19"), None);
        assert_eq!(leading_year("circa 1965"), None);
    }
}
