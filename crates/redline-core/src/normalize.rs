//! Body normalization: section properties ordering.
//!
//! Word requires `w:sectPr` to be the last direct child of `w:body`.
//! Splicing paragraphs in and out can leave it stranded mid-body or
//! duplicated; this pass keeps the first one, drops the rest, and moves it
//! to the end. Malformed bodies are tolerated silently.

use redline_xml::{XmlElement, XmlNode};

/// Ensure `w:sectPr` is the single last direct child of `body`.
///
/// This is a projection: applying it twice changes nothing.
pub fn normalize_section_order(body: &mut XmlElement) {
    let mut sect_pr: Option<XmlNode> = None;
    let mut remaining = Vec::with_capacity(body.children.len());
    for child in body.children.drain(..) {
        let is_sect_pr = child
            .as_element()
            .is_some_and(|el| el.name == "sectPr");
        if is_sect_pr {
            // Keep the first, quietly drop duplicates.
            if sect_pr.is_none() {
                sect_pr = Some(child);
            }
        } else {
            remaining.push(child);
        }
    }
    if let Some(sect_pr) = sect_pr {
        remaining.push(sect_pr);
    }
    body.children = remaining;
}
