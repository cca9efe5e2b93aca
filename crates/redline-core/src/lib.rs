//! WordprocessingML reconciliation engine.
//!
//! Takes a paragraph's OOXML together with a desired replacement plaintext
//! and produces a new fragment in which the textual difference is expressed
//! either as an accepted edit or as Word tracked changes (`w:ins` /
//! `w:del`), preserving all structure the edit does not disturb: run
//! formatting, bookmarks, hyperlinks, structured document tags, smart
//! tags, paragraph properties, and list numbering.
//!
//! # Pipeline
//!
//! 1. **Ingestion** ([`ingest`]): paragraph XML becomes a linear run model
//!    of typed entries whose offsets index the reconstructed accepted text.
//! 2. **Diff + patch** ([`diff`], [`patch`]): a word-level diff between
//!    accepted text and requested text is applied to the model, splitting
//!    runs at edit boundaries and tagging entries for revision wrapping.
//! 3. **Serialization** ([`serialize`]): the patched model is emitted as
//!    WordprocessingML with monotonic revision ids, Markdown-derived
//!    formatting on inserted spans, and a synthesized `numbering.xml` for
//!    list insertions.
//!
//! The [`comment`] module is a parallel subsystem sharing the run-splitting
//! discipline: it brackets a located substring with comment range markers
//! and builds the matching `comments.xml` part.
//!
//! # Example
//!
//! ```rust
//! use redline_core::{RedlineOptions, apply_redline};
//!
//! let result = apply_redline(
//!     "<w:p><w:r><w:t>Hello</w:t></w:r></w:p>",
//!     "Hello",
//!     "Hello, world",
//!     &RedlineOptions::default(),
//! );
//! assert!(result.has_changes);
//! assert!(result.oxml.contains("<w:ins "));
//! ```

pub mod comment;
pub mod diff;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod markdown;
pub mod model;
pub mod normalize;
pub mod numbering;
pub mod package;
pub mod patch;
pub mod revision;
pub mod serialize;

pub use comment::{
    CommentOptions, CommentRequest, CommentResult, inject_comments_into_ooxml, merge_comments_xml,
};
pub use engine::{RedlineOptions, RedlineResult, apply_redline};
pub use error::{Error, Result};
pub use ingest::{IngestResult, ingest_paragraphs};
pub use model::{ContainerKind, HyperlinkProps, RunEntry};
pub use normalize::normalize_section_order;
pub use revision::reset_revision_id_counter;
