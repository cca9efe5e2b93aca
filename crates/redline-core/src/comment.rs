//! Comment injection: locate text, split runs, insert markers.
//!
//! Each request names a paragraph by 1-based index and a substring of its
//! text. The matched range is bracketed by `w:commentRangeStart` /
//! `w:commentRangeEnd` plus a reference run, splitting runs surgically so
//! the paragraph's visible text is untouched. A `comments.xml` part is
//! built for whatever was applied; failed requests downgrade to warnings
//! and the rest continue.

use crate::error::{Error, Result};
use crate::ingest::run_text;
use crate::package::NS_W;
use crate::revision::{RevisionSettings, next_revision_id};
use redline_xml::{XmlElement, XmlNode, parse_document, parse_fragment, serialize_element, serialize_nodes};
use tracing::warn;

/// One comment to place.
#[derive(Debug, Clone)]
pub struct CommentRequest {
    /// 1-based paragraph index within the document.
    pub paragraph_index: usize,
    /// Text to bracket; must occur in the paragraph.
    pub text_to_find: String,
    /// The comment body. Newlines split it into paragraphs.
    pub comment_content: String,
}

/// Options for comment injection.
#[derive(Debug, Clone)]
pub struct CommentOptions {
    pub author: String,
    /// Fixed ISO-8601 date; defaults to the current UTC time.
    pub date: Option<String>,
}

impl Default for CommentOptions {
    fn default() -> Self {
        Self {
            author: "AI".to_string(),
            date: None,
        }
    }
}

/// The result of comment injection.
#[derive(Debug, Clone)]
pub struct CommentResult {
    pub oxml: String,
    /// The `comments.xml` part, present when any comment was applied.
    pub comments_xml: Option<String>,
    pub comments_applied: usize,
    pub warnings: Vec<String>,
}

/// Inject comments into document XML.
///
/// Malformed XML comes back unchanged with a warning; per-request failures
/// (bad index, text not found) are warnings and the remaining requests
/// still run.
pub fn inject_comments_into_ooxml(
    document_xml: &str,
    requests: &[CommentRequest],
    options: &CommentOptions,
) -> CommentResult {
    let mut nodes = match parse_fragment(document_xml, "document XML") {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!(error = %err, "returning document unchanged");
            return CommentResult {
                oxml: document_xml.to_string(),
                comments_xml: None,
                comments_applied: 0,
                warnings: vec![err.to_string()],
            };
        }
    };

    let mut paths = Vec::new();
    collect_paragraph_paths(&nodes, &mut Vec::new(), &mut paths);

    let revision = match &options.date {
        Some(date) => RevisionSettings::with_date(&options.author, date),
        None => RevisionSettings::new(&options.author),
    };

    let mut warnings = Vec::new();
    let mut comments = Vec::new();
    for request in requests {
        let index = request.paragraph_index;
        if index == 0 || index > paths.len() {
            let err = Error::OutOfRangeParagraph {
                index,
                total: paths.len(),
            };
            warn!(%err, "skipping comment request");
            warnings.push(err.to_string());
            continue;
        }
        let paragraph = element_at_mut(&mut nodes, &paths[index - 1]);
        match apply_comment(paragraph, request, &revision) {
            Ok(comment) => comments.push(comment),
            Err(err) => {
                warn!(%err, "skipping comment request");
                warnings.push(err.to_string());
            }
        }
    }

    let comments_applied = comments.len();
    let comments_xml = if comments.is_empty() {
        None
    } else {
        let mut root = XmlElement::new("w:comments");
        root.set_attribute("xmlns:w", NS_W);
        for comment in comments {
            root.push_element(comment);
        }
        Some(serialize_element(&root))
    };

    CommentResult {
        oxml: serialize_nodes(&nodes),
        comments_xml,
        comments_applied,
        warnings,
    }
}

/// Merge a freshly produced comments part into an existing one.
///
/// # Errors
///
/// Returns [`Error::DuplicateCommentId`] when an incoming comment id is
/// already present; the caller must reconcile.
pub fn merge_comments_xml(existing: &str, incoming: &str) -> Result<String> {
    let mut existing_root = parse_document(existing, "existing comments.xml")?;
    let incoming_root = parse_document(incoming, "incoming comments.xml")?;

    let existing_ids: Vec<String> = existing_root
        .child_elements()
        .filter(|e| e.name == "comment")
        .filter_map(|e| e.attribute("w:id").map(str::to_string))
        .collect();

    for comment in incoming_root.child_elements().filter(|e| e.name == "comment") {
        if let Some(id) = comment.attribute("w:id")
            && existing_ids.iter().any(|existing| existing == id)
        {
            return Err(Error::DuplicateCommentId { id: id.to_string() });
        }
        existing_root.push_element(comment.clone());
    }

    Ok(serialize_element(&existing_root))
}

/// Locate and bracket one request inside its paragraph.
fn apply_comment(
    paragraph: &mut XmlElement,
    request: &CommentRequest,
    revision: &RevisionSettings,
) -> Result<XmlElement> {
    let not_found = || Error::TextNotFound {
        snippet: request.text_to_find.clone(),
        index: request.paragraph_index,
    };

    if request.text_to_find.is_empty() {
        return Err(not_found());
    }
    let index = index_paragraph(paragraph);
    let start_offset = index
        .full_text
        .find(&request.text_to_find)
        .ok_or_else(not_found)?;
    let end_offset = start_offset + request.text_to_find.len();

    let start_run = index
        .runs
        .iter()
        .position(|r| r.start <= start_offset && start_offset < r.end)
        .ok_or_else(not_found)?;
    let end_run = index
        .runs
        .iter()
        .position(|r| r.start < end_offset && end_offset <= r.end)
        .ok_or_else(not_found)?;

    let id = next_revision_id();
    if start_run == end_run {
        let run = &index.runs[start_run];
        bracket_within_run(
            paragraph,
            &run.path,
            start_offset - run.start,
            end_offset - run.start,
            run.end - run.start,
            id,
        );
    } else {
        // End side first so start-side insertions cannot shift its indices.
        let run = &index.runs[end_run];
        close_after_run(paragraph, &run.path, end_offset - run.start, run.end - run.start, id);
        let run = &index.runs[start_run];
        open_before_run(paragraph, &run.path, start_offset - run.start, id);
    }

    Ok(build_comment_element(
        id,
        &revision.author,
        &request.comment_content,
        &revision.date,
    ))
}

/// Split `before | highlight | after` inside one run and bracket the middle.
fn bracket_within_run(
    paragraph: &mut XmlElement,
    path: &[usize],
    local_start: usize,
    local_end: usize,
    run_len: usize,
    id: u64,
) {
    let (parent, index) = parent_children(paragraph, path);
    let run = parent[index].as_element().expect("indexed run").clone();

    let (kept, after) = if local_end < run_len {
        let (head, tail) = split_run(&run, local_end);
        (head, Some(tail))
    } else {
        (run, None)
    };
    let (before, highlight) = if local_start > 0 {
        let (head, tail) = split_run(&kept, local_start);
        (Some(head), tail)
    } else {
        (None, kept)
    };

    let mut replacement = Vec::new();
    if let Some(before) = before {
        replacement.push(XmlNode::Element(before));
    }
    replacement.push(XmlNode::Element(range_marker("commentRangeStart", id)));
    replacement.push(XmlNode::Element(highlight));
    replacement.push(XmlNode::Element(range_marker("commentRangeEnd", id)));
    replacement.push(XmlNode::Element(reference_run(id)));
    if let Some(after) = after {
        replacement.push(XmlNode::Element(after));
    }
    replace_at(parent, index, replacement);
}

fn replace_at(children: &mut Vec<XmlNode>, index: usize, replacement: Vec<XmlNode>) {
    children.splice(index..index + 1, replacement).for_each(drop);
}

fn insert_at(children: &mut Vec<XmlNode>, index: usize, items: Vec<XmlNode>) {
    children.splice(index..index, items).for_each(drop);
}

/// Peel the after-fragment off the end run and place the end marker plus
/// reference run after it.
fn close_after_run(
    paragraph: &mut XmlElement,
    path: &[usize],
    local_end: usize,
    run_len: usize,
    id: u64,
) {
    let (parent, index) = parent_children(paragraph, path);
    let markers = [
        XmlNode::Element(range_marker("commentRangeEnd", id)),
        XmlNode::Element(reference_run(id)),
    ];
    if local_end < run_len {
        let run = parent[index].as_element().expect("indexed run").clone();
        let (head, tail) = split_run(&run, local_end);
        let mut replacement = vec![XmlNode::Element(head)];
        replacement.extend(markers);
        replacement.push(XmlNode::Element(tail));
        replace_at(parent, index, replacement);
    } else {
        insert_at(parent, index + 1, markers.into());
    }
}

/// Peel the before-fragment off the start run and place the start marker
/// in front of the remainder.
fn open_before_run(paragraph: &mut XmlElement, path: &[usize], local_start: usize, id: u64) {
    let (parent, index) = parent_children(paragraph, path);
    let marker = XmlNode::Element(range_marker("commentRangeStart", id));
    if local_start > 0 {
        let run = parent[index].as_element().expect("indexed run").clone();
        let (head, tail) = split_run(&run, local_start);
        replace_at(
            parent,
            index,
            vec![XmlNode::Element(head), marker, XmlNode::Element(tail)],
        );
    } else {
        insert_at(parent, index, vec![marker]);
    }
}

/// A run's location within its paragraph: a path of child indices plus the
/// half-open interval it contributes to the paragraph text.
#[derive(Debug, Clone)]
struct RunLocation {
    path: Vec<usize>,
    start: usize,
    end: usize,
}

/// Plaintext index over a paragraph's runs.
#[derive(Debug, Clone)]
struct ParagraphIndex {
    full_text: String,
    runs: Vec<RunLocation>,
}

fn index_paragraph(paragraph: &XmlElement) -> ParagraphIndex {
    let mut index = ParagraphIndex {
        full_text: String::new(),
        runs: Vec::new(),
    };
    index_children(&paragraph.children, &mut Vec::new(), &mut index);
    index
}

fn index_children(children: &[XmlNode], path: &mut Vec<usize>, index: &mut ParagraphIndex) {
    for (i, node) in children.iter().enumerate() {
        let Some(el) = node.as_element() else { continue };
        path.push(i);
        match el.name.as_str() {
            "r" => {
                let text = run_text(el);
                if !text.is_empty() {
                    let start = index.full_text.len();
                    index.full_text.push_str(&text);
                    index.runs.push(RunLocation {
                        path: path.clone(),
                        start,
                        end: start + text.len(),
                    });
                }
            }
            // Deleted text is not visible; everything else that wraps runs
            // is descended into.
            "del" | "pPr" | "proofErr" => {}
            _ => index_children(&el.children, path, index),
        }
        path.pop();
    }
}

/// Split a run's contribution at `at`, cloning properties into both halves.
fn split_run(run: &XmlElement, at: usize) -> (XmlElement, XmlElement) {
    let mut head = run.clone();
    head.children.clear();
    let mut tail = run.clone();
    tail.children.clear();

    let mut cursor = 0;
    for child in &run.children {
        let Some(el) = child.as_element() else { continue };
        if el.name == "rPr" {
            head.children.push(child.clone());
            tail.children.push(child.clone());
            continue;
        }
        let len = contribution_len(el);
        if len == 0 {
            if cursor < at {
                head.children.push(child.clone());
            } else {
                tail.children.push(child.clone());
            }
            continue;
        }
        if cursor + len <= at {
            head.children.push(child.clone());
        } else if cursor >= at {
            tail.children.push(child.clone());
        } else {
            // The cut lands inside a w:t.
            let text = el.text();
            let cut = at - cursor;
            head.children
                .push(XmlNode::Element(text_half(el, &text[..cut])));
            tail.children
                .push(XmlNode::Element(text_half(el, &text[cut..])));
        }
        cursor += len;
    }
    (head, tail)
}

fn text_half(original: &XmlElement, text: &str) -> XmlElement {
    let mut half = original.clone();
    half.children = vec![XmlNode::Text(text.to_string())];
    let boundary_space = text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace);
    if boundary_space && half.attribute("xml:space").is_none() {
        half.set_attribute("xml:space", "preserve");
    }
    half
}

/// Bytes an element contributes to the paragraph text.
fn contribution_len(el: &XmlElement) -> usize {
    match el.name.as_str() {
        "t" => el.text().len(),
        "br" | "cr" | "tab" => 1,
        "noBreakHyphen" => '\u{2011}'.len_utf8(),
        _ => 0,
    }
}

fn range_marker(name: &str, id: u64) -> XmlElement {
    let mut el = XmlElement::new(&format!("w:{name}"));
    el.set_attribute("w:id", id.to_string());
    el
}

fn reference_run(id: u64) -> XmlElement {
    let mut reference = XmlElement::new("w:commentReference");
    reference.set_attribute("w:id", id.to_string());
    let mut run = XmlElement::new("w:r");
    run.push_element(reference);
    run
}

/// Build one `w:comment` element.
fn build_comment_element(id: u64, author: &str, content: &str, date: &str) -> XmlElement {
    let mut comment = XmlElement::new("w:comment");
    comment.set_attribute("w:id", id.to_string());
    comment.set_attribute("w:author", author);
    comment.set_attribute("w:date", date);
    comment.set_attribute("w:initials", initials(author));

    for line in content.split('\n') {
        let mut run = XmlElement::new("w:r");
        run.push_element(XmlElement::with_text("w:t", line));
        let mut paragraph = XmlElement::new("w:p");
        paragraph.push_element(run);
        comment.push_element(paragraph);
    }
    comment
}

/// Uppercase first letters of whitespace-split author words, capped at
/// three; `"AI"` when nothing usable remains.
fn initials(author: &str) -> String {
    let initials: String = author
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(3)
        .collect();
    if initials.is_empty() {
        "AI".to_string()
    } else {
        initials
    }
}

/// Find `w:p` elements in document order, not descending into them.
fn collect_paragraph_paths(nodes: &[XmlNode], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (i, node) in nodes.iter().enumerate() {
        if let XmlNode::Element(el) = node {
            prefix.push(i);
            if el.name == "p" {
                out.push(prefix.clone());
            } else {
                collect_paragraph_paths(&el.children, prefix, out);
            }
            prefix.pop();
        }
    }
}

fn element_at_mut<'a>(nodes: &'a mut [XmlNode], path: &[usize]) -> &'a mut XmlElement {
    let (first, rest) = path.split_first().expect("non-empty path");
    let mut element = nodes[*first].as_element_mut().expect("path points at element");
    for index in rest {
        element = element.children[*index]
            .as_element_mut()
            .expect("path points at element");
    }
    element
}

fn parent_children<'a>(
    paragraph: &'a mut XmlElement,
    path: &[usize],
) -> (&'a mut Vec<XmlNode>, usize) {
    let (last, parents) = path.split_last().expect("non-empty run path");
    let mut element = paragraph;
    for index in parents {
        element = element.children[*index]
            .as_element_mut()
            .expect("path points at element");
    }
    (&mut element.children, *last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(index: usize, find: &str, content: &str) -> CommentRequest {
        CommentRequest {
            paragraph_index: index,
            text_to_find: find.to_string(),
            comment_content: content.to_string(),
        }
    }

    fn options() -> CommentOptions {
        CommentOptions {
            author: "Ada Lovelace".to_string(),
            date: Some("2024-05-01T12:00:00Z".to_string()),
        }
    }

    #[test]
    fn test_initials_derivation() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("Ada"), "A");
        assert_eq!(initials("one two three four"), "OTT");
        assert_eq!(initials(""), "AI");
        assert_eq!(initials("  "), "AI");
    }

    #[test]
    fn test_comment_in_single_run() {
        let xml = "<w:p><w:r><w:t>Hello brave world</w:t></w:r></w:p>";
        let result = inject_comments_into_ooxml(xml, &[request(1, "brave", "why brave?")], &options());
        assert_eq!(result.comments_applied, 1);
        assert!(result.warnings.is_empty());
        let oxml = &result.oxml;
        let start = oxml.find("<w:commentRangeStart").unwrap();
        let brave = oxml.find("<w:t>brave</w:t>").unwrap();
        let end = oxml.find("<w:commentRangeEnd").unwrap();
        let reference = oxml.find("<w:commentReference").unwrap();
        assert!(start < brave && brave < end && end < reference);
        // Visible text is unchanged.
        let reparsed = parse_document(oxml, "test").unwrap();
        assert_eq!(index_paragraph(&reparsed).full_text, "Hello brave world");
    }

    #[test]
    fn test_comment_preserves_run_properties_on_fragments() {
        let xml = r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello brave world</w:t></w:r></w:p>"#;
        let result = inject_comments_into_ooxml(xml, &[request(1, "brave", "note")], &options());
        // All three fragments carry the cloned bold properties.
        assert_eq!(result.oxml.matches("<w:rPr><w:b/></w:rPr>").count(), 3);
    }

    #[test]
    fn test_comments_xml_structure() {
        let xml = "<w:p><w:r><w:t>Hello</w:t></w:r></w:p>";
        let result = inject_comments_into_ooxml(
            xml,
            &[request(1, "Hello", "line one\nline two")],
            &options(),
        );
        let comments = result.comments_xml.unwrap();
        assert!(comments.starts_with(&format!(r#"<w:comments xmlns:w="{NS_W}">"#)));
        assert!(comments.contains(r#"w:author="Ada Lovelace""#));
        assert!(comments.contains(r#"w:initials="AL""#));
        assert!(comments.contains(r#"w:date="2024-05-01T12:00:00Z""#));
        // Two content paragraphs from the newline split.
        assert_eq!(comments.matches("<w:p>").count(), 2);
    }

    #[test]
    fn test_out_of_range_paragraph_warns_and_continues() {
        let xml = "<w:p><w:r><w:t>Hello</w:t></w:r></w:p>";
        let result = inject_comments_into_ooxml(
            xml,
            &[request(7, "Hello", "miss"), request(1, "Hello", "hit")],
            &options(),
        );
        assert_eq!(result.comments_applied, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("out of range"));
    }

    #[test]
    fn test_text_not_found_warns_and_continues() {
        let xml = "<w:p><w:r><w:t>Hello</w:t></w:r></w:p>";
        let result = inject_comments_into_ooxml(
            xml,
            &[request(1, "absent", "miss"), request(1, "Hello", "hit")],
            &options(),
        );
        assert_eq!(result.comments_applied, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("not found"));
    }

    #[test]
    fn test_malformed_document_returns_unchanged() {
        let xml = "<w:p><w:r>";
        let result = inject_comments_into_ooxml(xml, &[request(1, "x", "c")], &options());
        assert_eq!(result.oxml, xml);
        assert_eq!(result.comments_applied, 0);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_two_comments_in_one_paragraph() {
        let xml = "<w:p><w:r><w:t>alpha beta gamma</w:t></w:r></w:p>";
        let result = inject_comments_into_ooxml(
            xml,
            &[request(1, "alpha", "first"), request(1, "gamma", "second")],
            &options(),
        );
        assert_eq!(result.comments_applied, 2);
        assert_eq!(result.oxml.matches("<w:commentRangeStart").count(), 2);
        let reparsed = parse_document(&result.oxml, "test").unwrap();
        assert_eq!(index_paragraph(&reparsed).full_text, "alpha beta gamma");
    }

    #[test]
    fn test_merge_comments_appends() {
        let existing = format!(
            r#"<w:comments xmlns:w="{NS_W}"><w:comment w:id="1" w:author="A"/></w:comments>"#
        );
        let incoming = format!(
            r#"<w:comments xmlns:w="{NS_W}"><w:comment w:id="2" w:author="B"/></w:comments>"#
        );
        let merged = merge_comments_xml(&existing, &incoming).unwrap();
        assert!(merged.contains(r#"w:id="1""#));
        assert!(merged.contains(r#"w:id="2""#));
    }

    #[test]
    fn test_merge_duplicate_id_is_fatal() {
        let existing = format!(
            r#"<w:comments xmlns:w="{NS_W}"><w:comment w:id="1" w:author="A"/></w:comments>"#
        );
        let incoming = format!(
            r#"<w:comments xmlns:w="{NS_W}"><w:comment w:id="1" w:author="B"/></w:comments>"#
        );
        assert!(matches!(
            merge_comments_xml(&existing, &incoming),
            Err(Error::DuplicateCommentId { id }) if id == "1"
        ));
    }
}
