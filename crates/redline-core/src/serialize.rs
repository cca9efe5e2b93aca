//! Emitting the patched run model as WordprocessingML.
//!
//! A small state machine assembles paragraphs: a running buffer of run XML
//! is flushed into a `<w:p>` on every new paragraph start and once at the
//! end. Inserted spans are cut at format-hint boundaries and wrapped in
//! `w:ins`; struck spans become `w:del` with `w:delText`. The output
//! carries no namespace declarations; the wrapper supplies them.

use crate::markdown::{FormatFlags, FormatHint};
use crate::model::{ContainerKind, HyperlinkProps, RunEntry};
use crate::revision::{RevisionSettings, next_revision_id};
use redline_xml::{XmlElement, escape_attribute, escape_text, serialize_element_stripped};

/// Serializer configuration.
#[derive(Debug)]
pub struct SerializeOptions<'a> {
    pub revision: &'a RevisionSettings,
    pub generate_redlines: bool,
    /// Optional font forced onto inserted runs via `w:rFonts`.
    pub font: Option<&'a str>,
}

/// Serialize a patched model into one or more `<w:p>` elements.
pub fn serialize_model(
    model: &[RunEntry],
    fallback_p_pr: Option<&str>,
    hints: &[FormatHint],
    options: &SerializeOptions<'_>,
) -> String {
    let mut emitter = Emitter {
        options,
        hints,
        fallback_p_pr,
        paragraphs: Vec::new(),
        runs: String::new(),
        p_pr: None,
        paragraph_open: false,
    };
    for entry in model {
        emitter.emit(entry);
    }
    emitter.flush_paragraph();
    emitter.paragraphs.concat()
}

struct Emitter<'a> {
    options: &'a SerializeOptions<'a>,
    hints: &'a [FormatHint],
    fallback_p_pr: Option<&'a str>,
    paragraphs: Vec<String>,
    runs: String,
    p_pr: Option<String>,
    paragraph_open: bool,
}

impl Emitter<'_> {
    fn emit(&mut self, entry: &RunEntry) {
        match entry {
            RunEntry::ParagraphStart { p_pr_xml, .. } => {
                self.flush_paragraph();
                self.paragraph_open = true;
                self.p_pr = Some(p_pr_xml.clone());
            }
            RunEntry::Text {
                text, r_pr_xml, ..
            } => {
                // Equal text is re-emitted verbatim, properties untouched.
                self.runs.push_str(&plain_run(text, r_pr_xml));
            }
            RunEntry::Deletion {
                text,
                node_xml,
                r_pr_xml,
                ..
            } => {
                if !self.options.generate_redlines {
                    return;
                }
                match node_xml {
                    Some(xml) => self.runs.push_str(xml),
                    None => {
                        let id = next_revision_id();
                        let rev = self.options.revision;
                        self.runs.push_str(&format!(
                            r#"<w:del w:id="{id}" w:author="{}" w:date="{}"><w:r>{r_pr_xml}<w:delText xml:space="preserve">{}</w:delText></w:r></w:del>"#,
                            escape_attribute(&rev.author),
                            escape_attribute(&rev.date),
                            escape_text(text),
                        ));
                    }
                }
            }
            RunEntry::Insertion {
                text,
                r_pr_xml,
                new_start,
                ..
            } => {
                let inner = self.hint_runs(text, r_pr_xml, *new_start);
                if inner.is_empty() {
                    return;
                }
                if self.options.generate_redlines {
                    let id = next_revision_id();
                    let rev = self.options.revision;
                    self.runs.push_str(&format!(
                        r#"<w:ins w:id="{id}" w:author="{}" w:date="{}">{inner}</w:ins>"#,
                        escape_attribute(&rev.author),
                        escape_attribute(&rev.date),
                    ));
                } else {
                    self.runs.push_str(&inner);
                }
            }
            RunEntry::Bookmark { node_xml, .. } => self.runs.push_str(node_xml),
            RunEntry::ContainerStart {
                kind,
                properties_xml,
                ..
            } => match kind {
                ContainerKind::Sdt => {
                    self.runs.push_str("<w:sdt>");
                    self.runs.push_str(properties_xml);
                    self.runs.push_str("<w:sdtContent>");
                }
                ContainerKind::SmartTag => {
                    if properties_xml.is_empty() {
                        self.runs.push_str("<w:smartTag>");
                    } else {
                        self.runs.push_str(&format!("<w:smartTag {properties_xml}>"));
                    }
                }
                ContainerKind::Hyperlink => {
                    let props: HyperlinkProps =
                        serde_json::from_str(properties_xml).unwrap_or_default();
                    self.runs.push_str("<w:hyperlink");
                    if let Some(r_id) = &props.r_id {
                        self.runs
                            .push_str(&format!(r#" r:id="{}""#, escape_attribute(r_id)));
                    }
                    if let Some(anchor) = &props.anchor {
                        self.runs
                            .push_str(&format!(r#" w:anchor="{}""#, escape_attribute(anchor)));
                    }
                    self.runs.push('>');
                }
            },
            RunEntry::ContainerEnd { kind, .. } => {
                self.runs.push_str(match kind {
                    ContainerKind::Sdt => "</w:sdtContent></w:sdt>",
                    ContainerKind::SmartTag => "</w:smartTag>",
                    ContainerKind::Hyperlink => "</w:hyperlink>",
                });
            }
        }
    }

    fn flush_paragraph(&mut self) {
        if !self.paragraph_open && self.runs.is_empty() {
            return;
        }
        let p_pr = self
            .p_pr
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.fallback_p_pr)
            .unwrap_or("");
        let runs = std::mem::take(&mut self.runs);
        self.paragraphs.push(format!("<w:p>{p_pr}{runs}</w:p>"));
        self.paragraph_open = false;
        self.p_pr = None;
    }

    /// Build runs for an inserted span, split at format-hint boundaries.
    fn hint_runs(&self, text: &str, base_r_pr: &str, new_start: usize) -> String {
        if text.is_empty() {
            return String::new();
        }
        let end = new_start + text.len();
        let mut cuts: Vec<usize> = self
            .hints
            .iter()
            .flat_map(|h| [h.start, h.end])
            .filter(|&c| c > new_start && c < end)
            .collect();
        cuts.sort_unstable();
        cuts.dedup();

        let mut out = String::new();
        let mut span_start = new_start;
        for span_end in cuts.into_iter().chain([end]) {
            let span = &text[span_start - new_start..span_end - new_start];
            if !span.is_empty() {
                let flags = self.flags_covering(span_start, span_end);
                let r_pr = build_r_pr(base_r_pr, flags, self.options.font);
                out.push_str(&format!(
                    r#"<w:r>{r_pr}<w:t xml:space="preserve">{}</w:t></w:r>"#,
                    escape_text(span)
                ));
            }
            span_start = span_end;
        }
        out
    }

    /// Union of all hint flags fully covering `[start, end)`.
    fn flags_covering(&self, start: usize, end: usize) -> FormatFlags {
        self.hints
            .iter()
            .filter(|h| h.start <= start && end <= h.end)
            .fold(FormatFlags::default(), |acc, h| acc.union(h.flags))
    }
}

fn plain_run(text: &str, r_pr_xml: &str) -> String {
    format!(
        r#"<w:r>{r_pr_xml}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape_text(text)
    )
}

/// Merge hint flags and the font override into base run properties.
///
/// Injects `w:b`, `w:i`, `w:u w:val="single"`, `w:strike` in that order,
/// each only when not already present.
fn build_r_pr(base: &str, flags: FormatFlags, font: Option<&str>) -> String {
    if !flags.any() && font.is_none() {
        return base.to_string();
    }
    let mut r_pr = if base.is_empty() {
        XmlElement::new("w:rPr")
    } else {
        match redline_xml::parse_document(base, "rPr") {
            Ok(el) => el,
            Err(_) => XmlElement::new("w:rPr"),
        }
    };

    if flags.bold && r_pr.first_child("b").is_none() {
        r_pr.push_element(XmlElement::new("w:b"));
    }
    if flags.italic && r_pr.first_child("i").is_none() {
        r_pr.push_element(XmlElement::new("w:i"));
    }
    if flags.underline && r_pr.first_child("u").is_none() {
        let mut u = XmlElement::new("w:u");
        u.set_attribute("w:val", "single");
        r_pr.push_element(u);
    }
    if flags.strikethrough && r_pr.first_child("strike").is_none() {
        r_pr.push_element(XmlElement::new("w:strike"));
    }
    if let Some(font) = font {
        if let Some(fonts) = r_pr.child_elements_mut().find(|e| e.name == "rFonts") {
            fonts.set_attribute("w:ascii", font);
            fonts.set_attribute("w:hAnsi", font);
        } else {
            let mut fonts = XmlElement::new("w:rFonts");
            fonts.set_attribute("w:ascii", font);
            fonts.set_attribute("w:hAnsi", font);
            r_pr.children.insert(0, redline_xml::XmlNode::Element(fonts));
        }
    }

    if r_pr.children.is_empty() && r_pr.attributes.is_empty() {
        return String::new();
    }
    serialize_element_stripped(&r_pr)
}
