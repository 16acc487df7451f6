//! Citation hints and the parser that extracts them from free text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when a citation hint cannot be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no four-digit year found in \"{0}\"")]
    MissingYear(String),

    #[error("no author name found before the year in \"{0}\"")]
    MissingAuthor(String),
}

/// Author, year and topic keyword seeding one search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationHint {
    pub author: String,
    pub year: i32,
    pub keyword: String,
}

impl CitationHint {
    /// Surname to query with.
    ///
    /// Hints like "Smith et al" or "Smith & Jones" only query the first author.
    pub fn primary_author(&self) -> String {
        let first: Vec<&str> = self
            .author
            .split_whitespace()
            .take_while(|word| !matches!(word.to_lowercase().as_str(), "et" | "&" | "and"))
            .collect();
        let first = first.join(" ");
        let first = first.trim_end_matches(',');
        if first.is_empty() {
            self.author.clone()
        } else {
            first.to_string()
        }
    }
}

/// First run of exactly four ASCII digits, with its byte offset
fn find_year(text: &str) -> Option<(i32, usize)> {
    let re = Regex::new(r"[0-9]+").ok()?;
    let found = re
        .find_iter(text)
        .filter(|m| m.as_str().len() == 4)
        .find_map(|m| Some((m.as_str().parse().ok()?, m.start())));
    found
}

fn is_edge_punctuation(c: char) -> bool {
    c.is_whitespace() || (c.is_ascii_punctuation() && c != '&')
}

/// Parse a hint such as `Chomsky (1965)`, `(Smith, 2020)` or `Smith, 2020`.
///
/// The year is the first run of exactly four digits; the author is the text
/// before it with surrounding whitespace and punctuation stripped.
pub fn parse(hint_text: &str, keyword: &str) -> Result<CitationHint, ParseError> {
    let (year, start) =
        find_year(hint_text).ok_or_else(|| ParseError::MissingYear(hint_text.to_string()))?;

    let author = hint_text[..start].trim_matches(is_edge_punctuation);
    if author.is_empty() {
        return Err(ParseError::MissingAuthor(hint_text.to_string()));
    }

    Ok(CitationHint {
        author: author.split_whitespace().collect::<Vec<_>>().join(" "),
        year,
        keyword: keyword.trim().to_string(),
    })
}
