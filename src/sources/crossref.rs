//! Crossref source implementation.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use super::normalize::{clean, clean_opt};
use crate::config::{Config, CROSSREF_API_BASE};
use crate::models::{Author, CitationHint, CitationRecord, Identifier, RawRecord, SourceType};
use crate::sources::{Source, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

const SOURCE_NAME: &str = "Crossref";

/// Widest publication-date window, in years either side of the hint year
const MAX_YEAR_WINDOW: i32 = 100;

/// Crossref source
///
/// Uses the Crossref REST API `/works` search with the author in
/// `query.author`, the keyword in `query.bibliographic` and a publication
/// date window around the hint year.
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: Arc<HttpClient>,
    base_url: String,
    retry: RetryConfig,
    year_window: i32,
}

impl CrossrefSource {
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
            year_window: 1,
        }
    }

    /// Build the source from the application configuration
    pub fn from_config(client: Arc<HttpClient>, config: &Config) -> Self {
        Self::new(client, &config.sources.crossref_url)
            .with_retry(config.retry.retry_config())
            .with_year_window(config.search.year_window)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Publication dates from `year - window` to `year + window` are accepted
    pub fn with_year_window(mut self, window: i32) -> Self {
        self.year_window = window.clamp(0, MAX_YEAR_WINDOW);
        self
    }

    /// Request URL for a hint
    pub fn search_url(&self, hint: &CitationHint, limit: usize) -> String {
        let mut url = format!(
            "{}/works?query.author={}",
            self.base_url,
            urlencoding::encode(&hint.primary_author())
        );

        if !hint.keyword.is_empty() {
            url = format!(
                "{}&query.bibliographic={}",
                url,
                urlencoding::encode(&hint.keyword)
            );
        }

        format!(
            "{}&filter=from-pub-date:{},until-pub-date:{}&rows={}&sort=relevance",
            url,
            hint.year.saturating_sub(self.year_window),
            hint.year.saturating_add(self.year_window),
            limit
        )
    }
}

impl Default for CrossrefSource {
    fn default() -> Self {
        let client = HttpClient::from_client(Arc::new(reqwest::Client::new()));
        Self::new(Arc::new(client), CROSSREF_API_BASE)
    }
}

#[async_trait]
impl Source for CrossrefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn source_type(&self) -> SourceType {
        SourceType::Crossref
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

        // Clone values for retry closure
        let client = Arc::clone(&self.client);
        let data: CrossrefResponse = with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { client.get_json(&url, SOURCE_NAME).await }
        })
        .await?;

        tracing::debug!(
            "Crossref returned {} items ({} total hits)",
            data.message.items.len(),
            data.message.total_results.unwrap_or_default()
        );

        Ok(data
            .message
            .items
            .into_iter()
            .take(limit)
            .map(|item| RawRecord::new(SourceType::Crossref, item))
            .collect())
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefMessage {
    #[serde(rename = "total-results", default)]
    total_results: Option<u64>,
    /// Kept undecoded so one odd item cannot fail the whole response
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// One Crossref work, as much of it as a reference needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefWork {
    #[serde(default, deserialize_with = "one_or_many")]
    pub title: Vec<String>,
    #[serde(default)]
    pub author: Vec<CrossrefAuthor>,
    #[serde(rename = "container-title", default, deserialize_with = "one_or_many")]
    pub container_title: Vec<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub volume: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub issue: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub page: Option<String>,
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub issued: Option<CrossrefDate>,
    #[serde(rename = "published-print", default)]
    pub published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online", default)]
    pub published_online: Option<CrossrefDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefAuthor {
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    /// Organisational authors carry only a name
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i32>>>,
}

impl CrossrefDate {
    pub fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

impl CrossrefAuthor {
    fn into_author(self) -> Option<Author> {
        match clean_opt(self.family.as_deref()) {
            Some(family) => Some(Author::new(
                family,
                clean_opt(self.given.as_deref()).unwrap_or_default(),
            )),
            None => clean_opt(self.name.as_deref()).map(Author::family_only),
        }
    }
}

impl CrossrefWork {
    /// Map onto the common record; `None` when there is no usable title
    pub fn into_record(self) -> Option<CitationRecord> {
        let title = self.title.iter().find_map(|t| clean(t))?;

        let year = [&self.issued, &self.published_print, &self.published_online]
            .into_iter()
            .flatten()
            .find_map(CrossrefDate::year);

        let mut record = CitationRecord::new(title, SourceType::Crossref).with_authors(
            self.author
                .into_iter()
                .filter_map(CrossrefAuthor::into_author)
                .collect(),
        );

        record.year = year;
        record.container_title = self.container_title.iter().find_map(|c| clean(c));
        record.volume = clean_opt(self.volume.as_deref());
        record.issue = clean_opt(self.issue.as_deref());
        record.pages = clean_opt(self.page.as_deref());
        record.identifier = clean_opt(self.doi.as_deref()).map(Identifier::Doi);

        Some(record)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

/// Volume, issue and page are kept as text even when sent as numbers
fn opaque_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}
