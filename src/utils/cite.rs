//! Citation formatting in various styles.
//!
//! Supports APA 7th and BibTeX. Formatting is a pure function of the
//! record: no locale, no clock, no hidden state.

use crate::models::{Author, CitationRecord, Identifier, SourceType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// APA caps the listed authors at 20; longer lists show the first 19, an
/// ellipsis and the final author.
const APA_MAX_AUTHORS: usize = 20;

/// Citation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationStyle {
    /// APA 7th edition
    Apa,
    /// BibTeX
    Bibtex,
}

/// How emphasis (the container title and volume) is marked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    /// No emphasis markers
    #[default]
    Plain,
    /// `*italics*`
    Markdown,
}

impl Markup {
    fn emphasize(&self, text: &str) -> String {
        match self {
            Markup::Plain => text.to_string(),
            Markup::Markdown => format!("*{}*", text),
        }
    }
}

/// Rendering options for APA references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApaOptions {
    pub markup: Markup,
    /// Append "ISBN: ..." to book references
    pub show_isbn: bool,
}

impl From<Markup> for ApaOptions {
    fn from(markup: Markup) -> Self {
        Self {
            markup,
            show_isbn: false,
        }
    }
}

/// Format a record in the specified style
pub fn format_citation(record: &CitationRecord, style: CitationStyle) -> String {
    match style {
        CitationStyle::Apa => format_apa(record),
        CitationStyle::Bibtex => format_bibtex(record),
    }
}

/// "Family, G." or the bare family name when there is no given name
fn format_author_apa_single(author: &Author) -> String {
    let initial = author
        .given
        .as_deref()
        .and_then(|given| given.chars().find(|c| c.is_alphabetic()));

    match initial {
        Some(initial) => format!("{}, {}.", author.family, initial.to_uppercase()),
        None => author.family.clone(),
    }
}

/// Format authors as "Last, F., Last, F., & Last, F."
fn format_authors_apa(authors: &[Author]) -> Option<String> {
    let formatted: Vec<String> = authors.iter().map(format_author_apa_single).collect();

    match formatted.as_slice() {
        [] => None,
        [only] => Some(only.clone()),
        [first, second] => Some(format!("{} & {}", first, second)),
        [rest @ .., last] if formatted.len() <= APA_MAX_AUTHORS => {
            Some(format!("{}, & {}", rest.join(", "), last))
        }
        [.., last] => Some(format!(
            "{}, . . . {}",
            formatted[..APA_MAX_AUTHORS - 1].join(", "),
            last
        )),
    }
}

/// Terminate a title with a period unless it already ends a sentence
fn sentence(text: &str) -> String {
    if text.ends_with(['.', '?', '!']) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

/// "Container, Volume(Issue), Pages" with missing parts and their punctuation left out
fn format_source_apa(record: &CitationRecord, markup: Markup) -> Option<String> {
    let volume_issue = match (record.volume.as_deref(), record.issue.as_deref()) {
        (Some(volume), Some(issue)) => Some(format!("{}({})", markup.emphasize(volume), issue)),
        (Some(volume), None) => Some(markup.emphasize(volume)),
        (None, Some(issue)) => Some(format!("({})", issue)),
        (None, None) => None,
    };

    let parts: Vec<String> = [
        record.container_title.as_deref().map(|c| markup.emphasize(c)),
        volume_issue,
        record.pages.as_deref().map(page_range),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(sentence(&parts.join(", ")))
    }
}

/// APA sets page ranges with an en dash: "45-67" becomes "45–67"
fn page_range(pages: &str) -> String {
    if !pages.contains('-') {
        return pages.to_string();
    }
    pages
        .split('-')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("–")
}

fn format_identifier_apa(identifier: &Identifier, show_isbn: bool) -> Option<String> {
    match identifier {
        Identifier::Doi(doi) if doi.starts_with("http") => Some(doi.clone()),
        Identifier::Doi(doi) => Some(format!("https://doi.org/{}", doi)),
        Identifier::Url(url) => Some(url.clone()),
        // ISBNs are not part of an APA reference unless asked for
        Identifier::Isbn(isbn) if show_isbn => Some(format!("ISBN: {}", isbn)),
        Identifier::Isbn(_) => None,
    }
}

/// Format a record in APA 7th edition, plain text
///
/// Format: Author, A., & Author, B. (Year). Title. Container, Volume(Issue), Pages. DOI
pub fn format_apa(record: &CitationRecord) -> String {
    format_apa_with(record, Markup::Plain)
}

/// Format a record in APA 7th edition with the given markup and options
pub fn format_apa_with(record: &CitationRecord, options: impl Into<ApaOptions>) -> String {
    let options = options.into();
    let markup = options.markup;
    let year = match record.year {
        Some(year) => year.to_string(),
        None => "n.d.".to_string(),
    };
    let title = sentence(&record.title);

    let mut reference = match format_authors_apa(&record.authors) {
        Some(authors) => format!("{} ({}). {}", sentence(&authors), year, title),
        // No author: the title moves into the author position
        None => format!("{} ({}).", title, year),
    };

    if let Some(source) = format_source_apa(record, markup) {
        reference.push(' ');
        reference.push_str(&source);
    }

    if let Some(link) = record
        .identifier
        .as_ref()
        .and_then(|id| format_identifier_apa(id, options.show_isbn))
    {
        reference.push(' ');
        reference.push_str(&link);
    }

    reference
}

fn alphanumeric(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Generate a BibTeX entry
/// Format: @article{key,
///   author = {Last, First and Last, First},
///   title = {Title},
///   journal = {Container},
///   year = {Year},
///   doi = {DOI}
/// }
pub fn format_bibtex(record: &CitationRecord) -> String {
    let entry_type = match (record.source, &record.container_title, &record.volume) {
        (SourceType::Crossref, Some(_), Some(_)) => "article",
        (SourceType::GoogleBooks, _, _) => "book",
        _ => "misc",
    };

    // Citation key: FirstAuthorLastYearFirstTitleWord
    let last_name = record
        .authors
        .first()
        .map(|a| alphanumeric(&a.family))
        .unwrap_or_else(|| "anon".to_string());
    let year = record
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "nd".to_string());
    let title_key = record
        .title
        .split_whitespace()
        .next()
        .map(alphanumeric)
        .unwrap_or_default();
    let key = format!("{}{}{}", last_name, year, title_key);

    let authors = record
        .authors
        .iter()
        .map(|a| match &a.given {
            Some(given) => format!("{}, {}", a.family, given),
            None => format!("{{{}}}", a.family),
        })
        .collect::<Vec<_>>()
        .join(" and ");

    let container_field = match entry_type {
        "article" => "journal",
        "book" => "publisher",
        _ => "howpublished",
    };

    let mut fields: Vec<(&str, String)> = Vec::new();
    if !authors.is_empty() {
        fields.push(("author", authors));
    }
    fields.push(("title", record.title.clone()));
    if let Some(container) = &record.container_title {
        fields.push((container_field, container.clone()));
    }
    if let Some(year) = record.year {
        fields.push(("year", year.to_string()));
    }
    if let Some(volume) = &record.volume {
        fields.push(("volume", volume.clone()));
    }
    if let Some(issue) = &record.issue {
        fields.push(("number", issue.clone()));
    }
    if let Some(pages) = &record.pages {
        fields.push(("pages", pages.replace('-', "--")));
    }
    match &record.identifier {
        Some(Identifier::Doi(doi)) => fields.push(("doi", doi.clone())),
        Some(Identifier::Isbn(isbn)) => fields.push(("isbn", isbn.clone())),
        Some(Identifier::Url(url)) => fields.push(("url", url.clone())),
        None => {}
    }

    let body = fields
        .iter()
        .map(|(name, value)| format!("  {} = {{{}}}", name, value))
        .collect::<Vec<_>>()
        .join(",\n");

    format!("@{}{{{},\n{}\n}}", entry_type, key, body)
}

/// Structured citation data for JSON output
#[derive(Debug, Serialize)]
pub struct StructuredCitation<'a> {
    pub source: SourceType,
    #[serde(rename = "reference")]
    pub formatted: String,
    pub record: &'a CitationRecord,
}

/// Errors writing an export format
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

const CSV_HEADER: [&str; 10] = [
    "source",
    "authors",
    "title",
    "year",
    "container",
    "volume",
    "issue",
    "pages",
    "identifier",
    "reference",
];

/// Render citations as CSV, one row per record after a header row
pub fn format_csv(citations: &[StructuredCitation<'_>]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for citation in citations {
        let record = citation.record;
        let authors = record
            .authors
            .iter()
            .map(|a| match &a.given {
                Some(given) => format!("{}, {}", a.family, given),
                None => a.family.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");

        writer.write_record([
            citation.source.id(),
            authors.as_str(),
            record.title.as_str(),
            record.year.map(|y| y.to_string()).unwrap_or_default().as_str(),
            record.container_title.as_deref().unwrap_or_default(),
            record.volume.as_deref().unwrap_or_default(),
            record.issue.as_deref().unwrap_or_default(),
            record.pages.as_deref().unwrap_or_default(),
            record.identifier.as_ref().map(Identifier::value).unwrap_or_default(),
            citation.formatted.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Get structured citation data
pub fn get_structured_citation(
    record: &CitationRecord,
    style: CitationStyle,
) -> StructuredCitation<'_> {
    StructuredCitation {
        source: record.source,
        formatted: format_citation(record, style),
        record,
    }
}
