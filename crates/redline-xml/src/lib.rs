//! Fragment-tolerant WordprocessingML DOM.
//!
//! This crate wraps [`quick-xml`] behind the narrow parse/serialize interface
//! the redline engine needs. Unlike a general-purpose DOM it is built for
//! OOXML fragments as Word hosts hand them out: a sequence of sibling
//! `<w:p>` elements with namespace prefixes but no namespace declarations.
//!
//! The main entry points are:
//! - [`parse_fragment`]: parse any sequence of sibling nodes
//! - [`parse_document`]: parse a document with a single root element
//! - [`serialize_node`] / [`serialize_node_stripped`]: emit XML text, the
//!   latter with `xmlns:*` declarations removed
//!
//! # Example
//!
//! ```rust
//! use redline_xml::{parse_document, serialize_element};
//!
//! let doc = parse_document("<w:p><w:r><w:t>Hi</w:t></w:r></w:p>", "paragraph").unwrap();
//! assert_eq!(doc.name, "p");
//! assert_eq!(doc.prefix.as_deref(), Some("w"));
//! assert_eq!(serialize_element(&doc), "<w:p><w:r><w:t>Hi</w:t></w:r></w:p>");
//! ```
//!
//! Prefixes are kept as opaque strings; there is no namespace resolution.
//! The engine addresses elements by local name and re-emits prefixes
//! verbatim, which is exactly what round-tripping host-supplied OOXML
//! requires.

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use parser::{parse_document, parse_fragment};
pub use types::{XmlAttribute, XmlElement, XmlNode};
pub use writer::{
    escape_attribute, escape_text, serialize_element, serialize_element_stripped, serialize_node,
    serialize_node_stripped, serialize_nodes,
};
