//! Error taxonomy for the reconciliation engine.
//!
//! The edit path never propagates these to the caller: the orchestrator
//! converts every failure into a result envelope with warnings. The comment
//! and merge paths surface only [`Error::DuplicateCommentId`].

use thiserror::Error;

/// Result type alias for redline-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures the engine can encounter.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed input XML, from the XML adapter.
    #[error("malformed XML in {label}: {detail}")]
    InvalidXml { label: String, detail: String },

    /// The input contained no `w:p` elements.
    #[error("input contains no paragraphs")]
    NoParagraphs,

    /// The pipeline produced no replacement nodes despite reporting changes.
    #[error("pipeline produced no output for a changed paragraph")]
    EmptyOutput,

    /// A comment request targeted a paragraph index outside the document.
    #[error("paragraph index {index} out of range (document has {total} paragraphs)")]
    OutOfRangeParagraph { index: usize, total: usize },

    /// A comment request's text was not found in its paragraph.
    #[error("comment text {snippet:?} not found in paragraph {index}")]
    TextNotFound { snippet: String, index: usize },

    /// Merging comments hit an id already present in the existing part.
    #[error("comment id {id} already present in existing comments part")]
    DuplicateCommentId { id: String },

    /// A Word-host-only fallback was requested in a hostless environment.
    #[error("native Word fallback is unavailable in a hostless environment")]
    UnsupportedNativeFallback,
}

impl From<redline_xml::Error> for Error {
    fn from(err: redline_xml::Error) -> Self {
        match err {
            redline_xml::Error::Malformed { label, detail } => Error::InvalidXml { label, detail },
            redline_xml::Error::Empty { label } => Error::InvalidXml {
                label,
                detail: "no elements found".to_string(),
            },
            redline_xml::Error::MultipleRoots { label } => Error::InvalidXml {
                label,
                detail: "multiple root elements".to_string(),
            },
        }
    }
}
