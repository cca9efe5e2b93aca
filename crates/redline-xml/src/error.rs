//! Error types for XML parsing and serialization.

use thiserror::Error;

/// Result type alias for redline-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing XML.
///
/// Every error carries the `label` the caller attached to the parse, so the
/// engine can report which input (paragraph XML, document XML, comments
/// part) was malformed.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The input is not well-formed XML.
    #[error("malformed XML in {label}: {detail}")]
    Malformed { label: String, detail: String },

    /// The input parsed but contained no elements.
    #[error("no elements found in {label}")]
    Empty { label: String },

    /// A document parse found more than one root element.
    #[error("multiple root elements in {label}")]
    MultipleRoots { label: String },
}

impl Error {
    /// Build a `Malformed` error from a quick-xml error.
    pub(crate) fn malformed(label: &str, err: impl std::fmt::Display) -> Self {
        Error::Malformed {
            label: label.to_string(),
            detail: err.to_string(),
        }
    }
}
