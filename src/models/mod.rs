//! Core data models for citation hints and normalized citation records.

mod citation;
mod hint;

pub use citation::{Author, CitationRecord, Identifier, RawRecord, SourceType};
pub use hint::{parse, CitationHint, ParseError};
