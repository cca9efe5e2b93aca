//! The linear run model.
//!
//! A paragraph's XML is flattened into a sequence of typed entries whose
//! offsets index into the reconstructed accepted text. Structural artifacts
//! the engine does not interpret (paragraph properties, run properties,
//! pre-existing deletions, bookmarks, container properties) travel as
//! pre-serialized XML strings with namespace declarations already stripped,
//! so they can be re-emitted verbatim.
//!
//! Containers (`sdt`, `smartTag`, `hyperlink`) cross-cut runs, so they are
//! kept as matched start/end pairs sharing a generated id rather than as
//! tree nodes. This keeps offset math linear and lets the patcher split
//! entries without rebuilding a tree.

use serde::{Deserialize, Serialize};

/// The kind of container a start/end pair delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// A structured document tag (`w:sdt`); properties are the serialized
    /// `w:sdtPr`.
    Sdt,
    /// A smart tag (`w:smartTag`); properties are the serialized attribute
    /// list of the element.
    SmartTag,
    /// A hyperlink (`w:hyperlink`); properties are a JSON
    /// [`HyperlinkProps`] blob.
    Hyperlink,
}

/// Hyperlink container properties, carried as a JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperlinkProps {
    /// The `r:id` relationship reference, if any.
    #[serde(rename = "rId", skip_serializing_if = "Option::is_none")]
    pub r_id: Option<String>,

    /// The `w:anchor` bookmark target, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

/// One entry in the run model.
///
/// Invariants:
/// - entries appear in source document order;
/// - `Text` intervals tile the accepted text of their paragraph run in
///   ascending, non-overlapping order;
/// - every other variant is zero-length in accepted text.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEntry {
    /// Opens a paragraph. Zero-length.
    ParagraphStart {
        /// Serialized `w:pPr`, empty when the paragraph has none.
        p_pr_xml: String,
        offset: usize,
    },

    /// A plain visible run.
    Text {
        text: String,
        /// Serialized `w:rPr`, empty when the run has none.
        r_pr_xml: String,
        start: usize,
        end: usize,
    },

    /// A deleted run: either preserved from an input `w:del` (`node_xml`
    /// set) or produced by the patcher from a diff DELETE (`node_xml`
    /// absent). Contributes nothing to accepted text.
    Deletion {
        text: String,
        author: String,
        /// Original `w:del` XML for pass-through deletions.
        node_xml: Option<String>,
        /// Run properties for patcher-produced deletions.
        r_pr_xml: String,
        offset: usize,
    },

    /// A run inserted by the patcher from a diff INSERT. Zero-length in
    /// accepted text; `new_start` locates its text inside the cleaned
    /// modified text so the serializer can apply format hints.
    Insertion {
        text: String,
        r_pr_xml: String,
        author: String,
        offset: usize,
        new_start: usize,
    },

    /// A `w:bookmarkStart` / `w:bookmarkEnd`, passed through verbatim.
    Bookmark { node_xml: String, offset: usize },

    /// Opens a container. Matched with the `ContainerEnd` sharing its id.
    ContainerStart {
        kind: ContainerKind,
        id: String,
        properties_xml: String,
        offset: usize,
    },

    /// Closes the container with the same id.
    ContainerEnd {
        kind: ContainerKind,
        id: String,
        offset: usize,
    },
}

impl RunEntry {
    /// Start offset of this entry in accepted text.
    pub fn start_offset(&self) -> usize {
        match self {
            RunEntry::ParagraphStart { offset, .. }
            | RunEntry::Deletion { offset, .. }
            | RunEntry::Insertion { offset, .. }
            | RunEntry::Bookmark { offset, .. }
            | RunEntry::ContainerStart { offset, .. }
            | RunEntry::ContainerEnd { offset, .. } => *offset,
            RunEntry::Text { start, .. } => *start,
        }
    }

    /// End offset of this entry in accepted text. Equal to
    /// [`start_offset`](Self::start_offset) for every zero-length variant.
    pub fn end_offset(&self) -> usize {
        match self {
            RunEntry::Text { end, .. } => *end,
            other => other.start_offset(),
        }
    }

    /// Whether this entry spans no accepted text.
    pub fn is_zero_length(&self) -> bool {
        self.start_offset() == self.end_offset()
    }
}
