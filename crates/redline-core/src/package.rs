//! Namespace constants and `pkg:package` assembly.
//!
//! Edited paragraph XML leaves the serializer with no namespace
//! declarations. When no extra parts are needed the declarations are
//! injected onto the paragraphs directly; when a numbering or comments
//! part must travel along, the whole thing is wrapped in Microsoft's
//! flat-XML package form with the relationship bookkeeping that Word
//! hosts expect.

use crate::error::Result;
use redline_xml::{XmlNode, parse_fragment, serialize_nodes};

pub const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const NS_W14: &str = "http://schemas.microsoft.com/office/word/2010/wordml";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_PKG: &str = "http://schemas.microsoft.com/office/2006/xmlPackage";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const CT_COMMENTS: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";
pub const CT_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const REL_COMMENTS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";

/// The blank paragraph appended after edited content inside a package.
///
/// Word's insertion API consumes it; callers strip it back off with
/// [`strip_insertion_shim`]. The two halves must stay in sync.
pub const INSERTION_SHIM: &str = "<w:p><w:pPr/></w:p>";

/// Inject the standard namespace declarations onto bare paragraph XML.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidXml`] when the paragraph XML does not
/// parse.
pub fn add_namespace_decls(paragraph_xml: &str) -> Result<String> {
    let mut nodes = parse_fragment(paragraph_xml, "paragraph XML")?;
    for node in &mut nodes {
        if let XmlNode::Element(el) = node {
            el.set_attribute("xmlns:w", NS_W);
            el.set_attribute("xmlns:w14", NS_W14);
            el.set_attribute("xmlns:r", NS_R);
        }
    }
    Ok(serialize_nodes(&nodes))
}

/// Remove the trailing insertion-shim paragraph from edited body XML.
pub fn strip_insertion_shim(xml: &str) -> &str {
    xml.strip_suffix(INSERTION_SHIM).unwrap_or(xml)
}

/// Wrap paragraph XML in a `pkg:package` with optional numbering and
/// comments parts.
pub fn build_package(
    paragraph_xml: &str,
    numbering_xml: Option<&str>,
    comments_xml: Option<&str>,
) -> String {
    let mut package = String::new();
    package.push_str(&format!(r#"<pkg:package xmlns:pkg="{NS_PKG}">"#));

    // Package-level rels: the single officeDocument relationship.
    package.push_str(&pkg_part(
        "/_rels/.rels",
        CT_RELS,
        Some(512),
        &format!(
            r#"<Relationships xmlns="{NS_RELATIONSHIPS}"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="word/document.xml"/></Relationships>"#
        ),
    ));

    // Document-level rels for whichever parts travel along. Numbering owns
    // rId2; comments take rId1 alone, rId3 next to numbering.
    let mut document_rels = String::new();
    if numbering_xml.is_some() {
        document_rels.push_str(&format!(
            r#"<Relationship Id="rId2" Type="{REL_NUMBERING}" Target="numbering.xml"/>"#
        ));
    }
    if comments_xml.is_some() {
        let id = if numbering_xml.is_some() { "rId3" } else { "rId1" };
        document_rels.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{REL_COMMENTS}" Target="comments.xml"/>"#
        ));
    }
    package.push_str(&pkg_part(
        "/word/_rels/document.xml.rels",
        CT_RELS,
        Some(256),
        &format!(r#"<Relationships xmlns="{NS_RELATIONSHIPS}">{document_rels}</Relationships>"#),
    ));

    package.push_str(&pkg_part(
        "/word/document.xml",
        CT_DOCUMENT,
        None,
        &format!(
            r#"<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}"><w:body>{paragraph_xml}{INSERTION_SHIM}</w:body></w:document>"#
        ),
    ));

    if let Some(numbering) = numbering_xml {
        package.push_str(&pkg_part("/word/numbering.xml", CT_NUMBERING, None, numbering));
    }
    if let Some(comments) = comments_xml {
        package.push_str(&pkg_part("/word/comments.xml", CT_COMMENTS, None, comments));
    }

    package.push_str("</pkg:package>");
    package
}

fn pkg_part(name: &str, content_type: &str, padding: Option<usize>, xml_data: &str) -> String {
    let padding = padding
        .map(|p| format!(r#" pkg:padding="{p}""#))
        .unwrap_or_default();
    format!(
        r#"<pkg:part pkg:name="{name}" pkg:contentType="{content_type}"{padding}><pkg:xmlData>{xml_data}</pkg:xmlData></pkg:part>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_namespace_decls() {
        let out = add_namespace_decls("<w:p><w:r><w:t>x</w:t></w:r></w:p>").unwrap();
        assert!(out.starts_with(&format!(r#"<w:p xmlns:w="{NS_W}""#)));
        assert!(out.contains(&format!(r#"xmlns:r="{NS_R}""#)));
        assert!(out.ends_with("</w:p>"));
    }

    #[test]
    fn test_package_contains_document_and_shim() {
        let package = build_package("<w:p/>", None, None);
        assert!(package.contains(r#"pkg:name="/word/document.xml""#));
        assert!(package.contains(&format!("<w:body><w:p/>{INSERTION_SHIM}</w:body>")));
        assert!(package.contains(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#));
    }

    #[test]
    fn test_numbering_part_and_relationship() {
        let package = build_package("<w:p/>", Some("<w:numbering/>"), None);
        assert!(package.contains(r#"pkg:name="/word/numbering.xml""#));
        assert!(package.contains(&format!(
            r#"<Relationship Id="rId2" Type="{REL_NUMBERING}" Target="numbering.xml"/>"#
        )));
    }

    #[test]
    fn test_comments_relationship_id_depends_on_numbering() {
        let alone = build_package("<w:p/>", None, Some("<w:comments/>"));
        assert!(alone.contains(&format!(
            r#"<Relationship Id="rId1" Type="{REL_COMMENTS}" Target="comments.xml"/>"#
        )));
        let with_numbering = build_package("<w:p/>", Some("<w:numbering/>"), Some("<w:comments/>"));
        assert!(with_numbering.contains(&format!(
            r#"<Relationship Id="rId3" Type="{REL_COMMENTS}" Target="comments.xml"/>"#
        )));
    }

    #[test]
    fn test_strip_insertion_shim_round_trip() {
        let body = format!("<w:p><w:r/></w:p>{INSERTION_SHIM}");
        assert_eq!(strip_insertion_shim(&body), "<w:p><w:r/></w:p>");
        assert_eq!(strip_insertion_shim("<w:p/>"), "<w:p/>");
    }
}
