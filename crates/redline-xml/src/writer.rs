//! Serialization back to XML text.

use crate::types::{XmlElement, XmlNode};

/// Escape the five XML entities for text content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape the five XML entities for attribute values.
pub fn escape_attribute(value: &str) -> String {
    escape_text(value)
}

/// Serialize a node to XML text.
pub fn serialize_node(node: &XmlNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node, false);
    out
}

/// Serialize a node with all `xmlns:*` declarations removed.
///
/// Property blobs carried through the run model are emitted this way; the
/// outer wrapper re-introduces the declarations.
pub fn serialize_node_stripped(node: &XmlNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node, true);
    out
}

/// Serialize an element to XML text.
pub fn serialize_element(element: &XmlElement) -> String {
    let mut out = String::new();
    write_element(&mut out, element, false);
    out
}

/// Serialize an element with all `xmlns:*` declarations removed.
pub fn serialize_element_stripped(element: &XmlElement) -> String {
    let mut out = String::new();
    write_element(&mut out, element, true);
    out
}

/// Serialize a sequence of sibling nodes.
pub fn serialize_nodes(nodes: &[XmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, false);
    }
    out
}

fn write_node(out: &mut String, node: &XmlNode, strip_ns: bool) {
    match node {
        XmlNode::Element(e) => write_element(out, e, strip_ns),
        XmlNode::Text(t) => out.push_str(&escape_text(t)),
    }
}

fn write_element(out: &mut String, element: &XmlElement, strip_ns: bool) {
    out.push('<');
    out.push_str(&element.qualified_name());
    for attr in &element.attributes {
        if strip_ns && attr.is_namespace_decl() {
            continue;
        }
        out.push(' ');
        out.push_str(&attr.qualified_name());
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(out, child, strip_ns);
    }
    out.push_str("</");
    out.push_str(&element.qualified_name());
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    #[test]
    fn test_escape_text_all_five_entities() {
        assert_eq!(
            escape_text(r#"a&b<c>d"e'f"#),
            "a&amp;b&lt;c&gt;d&quot;e&apos;f"
        );
    }

    #[test]
    fn test_round_trip_preserves_structure_and_attribute_order() {
        let xml = r#"<w:r><w:rPr><w:b/><w:i/></w:rPr><w:t xml:space="preserve"> hi </w:t></w:r>"#;
        let doc = parse_document(xml, "test").unwrap();
        assert_eq!(serialize_element(&doc), xml);
    }

    #[test]
    fn test_round_trip_reescapes_entities() {
        let xml = "<w:t>a &amp; b</w:t>";
        let doc = parse_document(xml, "test").unwrap();
        assert_eq!(serialize_element(&doc), xml);
    }

    #[test]
    fn test_stripped_serialization_drops_xmlns() {
        let xml = r#"<w:p xmlns:w="http://example.org/w" w:rsidR="00AB"><w:r/></w:p>"#;
        let doc = parse_document(xml, "test").unwrap();
        insta::assert_snapshot!(
            serialize_element_stripped(&doc),
            @r#"<w:p w:rsidR="00AB"><w:r/></w:p>"#
        );
    }

    #[test]
    fn test_empty_element_self_closes() {
        let doc = parse_document("<w:pPr></w:pPr>", "test").unwrap();
        assert_eq!(serialize_element(&doc), "<w:pPr/>");
    }
}
