//! Error types for the report templater

use std::path::PathBuf;
use thiserror::Error;

use crate::policy::Boundary;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the report templater
#[derive(Error, Debug)]
pub enum Error {
    /// Source document could not be parsed
    #[error("Failed to load {origin}: {source}")]
    Load {
        origin: String,
        #[source]
        source: lopdf::Error,
    },

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// Form field requested for filling does not exist
    #[error("Form field '{field}' not found in {origin}")]
    FieldNotFound { origin: String, field: String },

    /// Button field asked for a state it has no appearance for
    #[error("Form field '{field}' in {origin} has no state '{value}'")]
    InvalidFieldValue {
        origin: String,
        field: String,
        value: String,
    },

    /// Fields were supplied for a document without an interactive form
    #[error("{0} has no interactive form")]
    NoForm(String),

    /// Output document could not be set up
    #[error("Failed to initialise output document: {0}")]
    Init(String),

    /// Output document could not be serialized
    #[error("Failed to finalize output document: {0}")]
    Finalize(#[source] std::io::Error),

    /// Segment boundaries marked out of order or twice
    #[error("Invalid segment boundary {kind:?}: {reason}")]
    Boundary { kind: Boundary, reason: String },

    /// Overlay template unavailable while completing a page.
    /// Collected rather than propagated.
    #[error("Overlay skipped on page {page}: {source}")]
    OverlayLoad {
        page: u32,
        #[source]
        source: Box<Error>,
    },

    /// Report configuration error
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether a source document failed to resolve or parse
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::Load { .. } | Error::FileNotFound(_) | Error::EmptyPdf(_)
        )
    }

    /// Whether cover field filling failed
    pub fn is_fill_error(&self) -> bool {
        matches!(
            self,
            Error::FieldNotFound { .. } | Error::InvalidFieldValue { .. } | Error::NoForm(_)
        )
    }
}
