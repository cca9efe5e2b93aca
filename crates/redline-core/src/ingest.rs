//! Paragraph ingestion: XML to run model plus accepted text.
//!
//! Walks one or more `w:p` elements and flattens them into the linear run
//! model, reconstructing the accepted text as it goes: deletions excluded,
//! insertions included, `w:br`/`w:cr` as `\n`, `w:tab` as `\t`,
//! `w:noBreakHyphen` as U+2011. Structure the engine does not interpret is
//! captured as serialized XML with namespace declarations stripped.

use crate::error::{Error, Result};
use crate::model::{ContainerKind, HyperlinkProps, RunEntry};
use redline_xml::{XmlElement, XmlNode, parse_fragment, serialize_element_stripped};

/// The output of ingesting paragraph XML.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub run_model: Vec<RunEntry>,
    pub accepted_text: String,
    /// Serialized `w:pPr` of the first paragraph, if it has one.
    pub first_p_pr: Option<String>,
}

/// Ingest one or more `w:p` elements.
///
/// # Errors
///
/// Returns [`Error::InvalidXml`] on malformed input and
/// [`Error::NoParagraphs`] when the fragment holds no `w:p` at any depth.
pub fn ingest_paragraphs(paragraph_xml: &str) -> Result<IngestResult> {
    let nodes = parse_fragment(paragraph_xml, "paragraph XML")?;
    let mut paragraphs = Vec::new();
    collect_paragraphs(&nodes, &mut paragraphs);
    if paragraphs.is_empty() {
        return Err(Error::NoParagraphs);
    }

    let mut ingestor = Ingestor::default();
    for (i, paragraph) in paragraphs.iter().enumerate() {
        if i > 0 {
            ingestor.accepted.push('\n');
        }
        ingestor.ingest_paragraph(paragraph);
    }

    Ok(IngestResult {
        run_model: ingestor.model,
        accepted_text: ingestor.accepted,
        first_p_pr: ingestor.first_p_pr,
    })
}

/// Find `w:p` elements in document order, not descending into them.
fn collect_paragraphs<'a>(nodes: &'a [XmlNode], out: &mut Vec<&'a XmlElement>) {
    for node in nodes {
        if let XmlNode::Element(el) = node {
            if el.name == "p" {
                out.push(el);
            } else {
                collect_paragraphs(&el.children, out);
            }
        }
    }
}

/// Per-call ingestion state: the model under construction, the accepted
/// text cursor, and the container id counters.
#[derive(Debug, Default)]
struct Ingestor {
    model: Vec<RunEntry>,
    accepted: String,
    first_p_pr: Option<String>,
    sdt_count: usize,
    smart_tag_count: usize,
    hyperlink_count: usize,
}

impl Ingestor {
    fn ingest_paragraph(&mut self, paragraph: &XmlElement) {
        let p_pr_xml = paragraph
            .first_child("pPr")
            .map(serialize_element_stripped)
            .unwrap_or_default();
        if self.first_p_pr.is_none() {
            self.first_p_pr = Some(p_pr_xml.clone());
        }
        self.model.push(RunEntry::ParagraphStart {
            p_pr_xml,
            offset: self.accepted.len(),
        });
        self.ingest_children(&paragraph.children);
    }

    fn ingest_children(&mut self, children: &[XmlNode]) {
        for node in children {
            let Some(el) = node.as_element() else { continue };
            match el.name.as_str() {
                "pPr" | "proofErr" => {}
                "r" => self.ingest_run(el),
                // Content inside an existing w:ins is treated as plain
                // runs: the insertion is accepted.
                "ins" => self.ingest_children(&el.children),
                "del" => self.ingest_deletion(el),
                "bookmarkStart" | "bookmarkEnd" => self.model.push(RunEntry::Bookmark {
                    node_xml: serialize_element_stripped(el),
                    offset: self.accepted.len(),
                }),
                "sdt" => self.ingest_sdt(el),
                "smartTag" => self.ingest_smart_tag(el),
                "hyperlink" => self.ingest_hyperlink(el),
                _ => {}
            }
        }
    }

    fn ingest_run(&mut self, run: &XmlElement) {
        let text = run_text(run);
        if text.is_empty() {
            return;
        }
        let r_pr_xml = run
            .first_child("rPr")
            .map(serialize_element_stripped)
            .unwrap_or_default();
        let start = self.accepted.len();
        self.accepted.push_str(&text);
        self.model.push(RunEntry::Text {
            end: start + text.len(),
            text,
            r_pr_xml,
            start,
        });
    }

    fn ingest_deletion(&mut self, del: &XmlElement) {
        let mut text = String::new();
        collect_del_text(del, &mut text);
        self.model.push(RunEntry::Deletion {
            text,
            author: del.attribute("w:author").unwrap_or_default().to_string(),
            node_xml: Some(serialize_element_stripped(del)),
            r_pr_xml: String::new(),
            offset: self.accepted.len(),
        });
    }

    fn ingest_sdt(&mut self, sdt: &XmlElement) {
        let id = format!("sdt_{}", self.sdt_count);
        self.sdt_count += 1;
        let properties_xml = sdt
            .first_child("sdtPr")
            .map(serialize_element_stripped)
            .unwrap_or_default();
        let kind = ContainerKind::Sdt;
        self.model.push(RunEntry::ContainerStart {
            kind,
            id: id.clone(),
            properties_xml,
            offset: self.accepted.len(),
        });
        if let Some(content) = sdt.first_child("sdtContent") {
            self.ingest_children(&content.children);
        }
        self.model.push(RunEntry::ContainerEnd {
            kind,
            id,
            offset: self.accepted.len(),
        });
    }

    fn ingest_smart_tag(&mut self, smart_tag: &XmlElement) {
        let id = format!("smartTag_{}", self.smart_tag_count);
        self.smart_tag_count += 1;
        let properties_xml = smart_tag
            .attributes
            .iter()
            .filter(|a| !a.is_namespace_decl())
            .map(|a| {
                format!(
                    r#"{}="{}""#,
                    a.qualified_name(),
                    redline_xml::escape_attribute(&a.value)
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        let kind = ContainerKind::SmartTag;
        self.model.push(RunEntry::ContainerStart {
            kind,
            id: id.clone(),
            properties_xml,
            offset: self.accepted.len(),
        });
        self.ingest_children(&smart_tag.children);
        self.model.push(RunEntry::ContainerEnd {
            kind,
            id,
            offset: self.accepted.len(),
        });
    }

    fn ingest_hyperlink(&mut self, hyperlink: &XmlElement) {
        let id = format!("hyperlink_{}", self.hyperlink_count);
        self.hyperlink_count += 1;
        let props = HyperlinkProps {
            r_id: hyperlink.attribute("r:id").map(str::to_string),
            anchor: hyperlink.attribute("w:anchor").map(str::to_string),
        };
        let kind = ContainerKind::Hyperlink;
        self.model.push(RunEntry::ContainerStart {
            kind,
            id: id.clone(),
            properties_xml: serde_json::to_string(&props).expect("hyperlink props serialize"),
            offset: self.accepted.len(),
        });
        self.ingest_children(&hyperlink.children);
        self.model.push(RunEntry::ContainerEnd {
            kind,
            id,
            offset: self.accepted.len(),
        });
    }
}

/// The text a run contributes to accepted text.
pub(crate) fn run_text(run: &XmlElement) -> String {
    let mut text = String::new();
    for child in run.child_elements() {
        match child.name.as_str() {
            "t" => text.push_str(&child.text()),
            "br" | "cr" => text.push('\n'),
            "tab" => text.push('\t'),
            "noBreakHyphen" => text.push('\u{2011}'),
            _ => {}
        }
    }
    text
}

fn collect_del_text(el: &XmlElement, out: &mut String) {
    for child in el.child_elements() {
        if child.name == "delText" {
            out.push_str(&child.text());
        } else {
            collect_del_text(child, out);
        }
    }
}
