//! Error types for citefix-docx

use crate::note::NoteKind;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid part URI: {0}")]
    InvalidPartUri(String),

    #[error("Missing attribute '{attr}' on element '{element}'")]
    MissingAttribute { element: String, attr: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("{kind} {id} not found")]
    NoteNotFound { kind: NoteKind, id: u32 },

    #[error("Malformed {kind} {id}: {reason}")]
    MalformedNote {
        kind: NoteKind,
        id: u32,
        reason: String,
    },

    #[error("Unknown document: {0}")]
    UnknownDocument(String),
}

impl Error {
    /// Whether the caller can recover by refreshing its view of the document
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NoteNotFound { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
