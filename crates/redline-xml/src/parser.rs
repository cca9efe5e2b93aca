//! XML parser that builds mutable element trees.

use crate::error::{Error, Result};
use crate::types::{XmlAttribute, XmlElement, XmlNode, split_qualified};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parse a document with a single root element.
///
/// The `label` names the input for error reporting (e.g. `"paragraph XML"`).
///
/// # Errors
///
/// Returns an error if the XML is malformed, empty, or has more than one
/// root element.
pub fn parse_document(content: &str, label: &str) -> Result<XmlElement> {
    let mut nodes = parse_fragment(content, label)?;
    let mut roots = nodes.iter().filter(|n| n.as_element().is_some());
    if roots.next().is_none() {
        return Err(Error::Empty {
            label: label.to_string(),
        });
    }
    if roots.next().is_some() {
        return Err(Error::MultipleRoots {
            label: label.to_string(),
        });
    }
    let root_index = nodes
        .iter()
        .position(|n| n.as_element().is_some())
        .expect("root element checked above");
    match nodes.swap_remove(root_index) {
        XmlNode::Element(e) => Ok(e),
        XmlNode::Text(_) => unreachable!("position() matched an element"),
    }
}

/// Parse a fragment: any sequence of sibling elements and text.
///
/// Word hosts hand out paragraph XML as bare sibling `<w:p>` elements with
/// undeclared namespace prefixes; both are accepted here.
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse_fragment(content: &str, label: &str) -> Result<Vec<XmlNode>> {
    let mut parser = FragmentParser::new(content, label);
    parser.parse()
}

/// Internal parser state.
struct FragmentParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Label for error reporting.
    label: &'a str,

    /// Stack of elements being built.
    stack: Vec<XmlElement>,

    /// Completed top-level nodes.
    top: Vec<XmlNode>,
}

impl<'a> FragmentParser<'a> {
    fn new(source: &'a str, label: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            label,
            stack: Vec::new(),
            top: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<Vec<XmlNode>> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = self.open_element(&e)?;
                    self.stack.push(element);
                }
                Ok(Event::End(_)) => {
                    // quick-xml validates end-tag names against the open
                    // stack, so an Ok(End) always matches our top of stack.
                    let element = self.stack.pop().ok_or_else(|| {
                        Error::malformed(self.label, "unexpected closing tag")
                    })?;
                    self.close_element(element);
                }
                Ok(Event::Empty(e)) => {
                    let element = self.open_element(&e)?;
                    self.close_element(element);
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::malformed(self.label, err))?;
                    self.push_text(text.into_owned());
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    self.push_text(text);
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::malformed(self.label, e)),
            }
        }

        if let Some(unclosed) = self.stack.last() {
            return Err(Error::malformed(
                self.label,
                format!("missing closing tag </{}>", unclosed.qualified_name()),
            ));
        }

        Ok(finalize_children(std::mem::take(&mut self.top)))
    }

    fn open_element(&self, e: &BytesStart<'_>) -> Result<XmlElement> {
        let qualified = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let (name, prefix) = split_qualified(&qualified);

        let mut attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| Error::malformed(self.label, err))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let (attr_name, attr_prefix) = split_qualified(&key);
            let value = attr
                .unescape_value()
                .map_err(|err| Error::malformed(self.label, err))?;
            attributes.push(XmlAttribute {
                name: attr_name,
                prefix: attr_prefix,
                value: value.into_owned(),
            });
        }

        Ok(XmlElement {
            name,
            prefix,
            attributes,
            children: Vec::new(),
        })
    }

    fn close_element(&mut self, mut element: XmlElement) {
        element.children = finalize_children(element.children);
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(XmlNode::Element(element)),
            None => self.top.push(XmlNode::Element(element)),
        }
    }

    fn push_text(&mut self, text: String) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(XmlNode::Text(text)),
            None => self.top.push(XmlNode::Text(text)),
        }
    }
}

/// Drop inter-element whitespace.
///
/// Whitespace-only text between elements is formatting noise and must not
/// survive into re-serialized property blobs; whitespace that is the sole
/// content of an element (`<w:t> </w:t>`) is significant and kept.
fn finalize_children(children: Vec<XmlNode>) -> Vec<XmlNode> {
    let has_elements = children.iter().any(|c| c.as_element().is_some());
    if !has_elements {
        return children;
    }
    children
        .into_iter()
        .filter(|c| match c {
            XmlNode::Text(t) => !t.trim().is_empty(),
            XmlNode::Element(_) => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let doc = parse_document("<w:p/>", "test").unwrap();
        assert_eq!(doc.name, "p");
        assert_eq!(doc.prefix.as_deref(), Some("w"));
        assert!(doc.children.is_empty());
    }

    #[test]
    fn test_parse_nested_elements_with_text() {
        let doc = parse_document("<w:p><w:r><w:t>Hello</w:t></w:r></w:p>", "test").unwrap();
        let run = doc.first_child("r").unwrap();
        let t = run.first_child("t").unwrap();
        assert_eq!(t.text(), "Hello");
    }

    #[test]
    fn test_parse_fragment_with_sibling_paragraphs() {
        let nodes = parse_fragment("<w:p><w:r><w:t>a</w:t></w:r></w:p><w:p/>", "test").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.as_element().is_some()));
    }

    #[test]
    fn test_parse_undeclared_prefixes() {
        // Word fragments use w:/r: prefixes with no xmlns declarations.
        let doc = parse_document(r#"<w:hyperlink r:id="rId7"/>"#, "test").unwrap();
        assert_eq!(doc.attribute("r:id"), Some("rId7"));
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let doc = parse_document("<w:t>a &amp; b &lt; c</w:t>", "test").unwrap();
        assert_eq!(doc.text(), "a & b < c");
    }

    #[test]
    fn test_inter_element_whitespace_dropped() {
        let doc = parse_document("<w:p>\n  <w:r>\n    <w:t>x</w:t>\n  </w:r>\n</w:p>", "test")
            .unwrap();
        assert_eq!(doc.children.len(), 1);
        let run = doc.first_child("r").unwrap();
        assert_eq!(run.children.len(), 1);
    }

    #[test]
    fn test_whitespace_only_text_element_kept() {
        let doc = parse_document("<w:t> </w:t>", "test").unwrap();
        assert_eq!(doc.text(), " ");
    }

    #[test]
    fn test_malformed_input_reports_label() {
        let err = parse_document("<w:p><w:r></w:p>", "paragraph XML").unwrap_err();
        match err {
            Error::Malformed { label, .. } => assert_eq!(label, "paragraph XML"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_is_error_for_document() {
        assert!(matches!(
            parse_document("", "test"),
            Err(Error::Empty { .. })
        ));
        assert!(parse_fragment("", "test").unwrap().is_empty());
    }

    #[test]
    fn test_multiple_roots_is_error_for_document() {
        assert!(matches!(
            parse_document("<w:p/><w:p/>", "test"),
            Err(Error::MultipleRoots { .. })
        ));
    }

    #[test]
    fn test_cdata_becomes_text() {
        let doc = parse_document("<w:t><![CDATA[a < b]]></w:t>", "test").unwrap();
        assert_eq!(doc.text(), "a < b");
    }
}
