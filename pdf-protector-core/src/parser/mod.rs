//! PDF document structure reader
//!
//! Reads just enough of a PDF file to rewrite it: header, cross-reference
//! sections (tables and streams, following `Prev` chains), the effective
//! trailer and every indirect object, including those packed in object
//! streams. Content streams are never interpreted.

pub mod filters;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod reader;
pub mod trailer;
pub mod xref;
pub mod xref_stream;

use crate::error::PdfError;

pub use self::reader::PdfReader;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Default ceiling on input size: 256 MiB.
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 256 * 1024 * 1024;

/// Parsing options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject structural problems instead of recovering from them
    pub strict_mode: bool,
    /// Recover stream ends by scanning for `endstream` when `Length` is wrong
    pub lenient_streams: bool,
    /// Inputs larger than this are rejected before parsing
    pub max_document_size: usize,
    /// Maximum nesting of arrays and dictionaries
    pub max_nesting_depth: usize,
    /// Maximum number of cross-reference sections followed through `Prev`
    pub max_xref_sections: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::strict()
    }
}

impl ParseOptions {
    /// Reject dangling references, truncated streams and broken xref data
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            lenient_streams: false,
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            max_nesting_depth: 256,
            max_xref_sections: 1024,
        }
    }

    /// Recover from common corruption: dangling references become null,
    /// stream ends are found by scanning and a broken xref is rebuilt.
    pub fn lenient() -> Self {
        Self {
            strict_mode: false,
            lenient_streams: true,
            ..Self::strict()
        }
    }

    pub fn with_max_document_size(mut self, limit: usize) -> Self {
        self.max_document_size = limit;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_max_xref_sections(mut self, sections: usize) -> Self {
        self.max_xref_sections = sections;
        self
    }
}

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid xref table: {0}")]
    InvalidXRef(String),

    #[error("Invalid trailer: {0}")]
    InvalidTrailer(String),

    #[error("Circular reference detected: {0}")]
    CircularReference(String),

    #[error("Nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Document too large: {size} bytes exceeds the limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },
}

impl From<ParseError> for PdfError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::DocumentTooLarge { size, limit } => {
                PdfError::DocumentTooLarge { size, limit }
            }
            other => PdfError::MalformedDocument(other.to_string()),
        }
    }
}
