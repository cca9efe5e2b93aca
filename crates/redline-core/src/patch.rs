//! Applying diff operations to the run model.
//!
//! Two passes. The split pass cuts every `Text` entry at every diff
//! boundary that falls strictly inside it, so no entry straddles an edit.
//! The apply pass then walks the split model with an explicit state record,
//! re-emitting equal entries verbatim, flipping deleted entries to
//! `Deletion` (or dropping them when redlines are off), and materializing
//! insertions with line splitting, list promotion, and the
//! space-direction formatting inheritance rule.

use crate::diff::{DiffKind, DiffOp};
use crate::model::RunEntry;
use crate::numbering::{
    ListKind, NumberingContext, NumberingService, detect_numbering_format, match_list_marker,
};
use std::collections::BTreeSet;
use std::ops::Bound::Excluded;

/// Patcher configuration.
#[derive(Debug, Clone)]
pub struct PatchOptions<'a> {
    pub generate_redlines: bool,
    pub author: &'a str,
}

/// Patch a run model with diff operations.
pub fn patch_model(
    model: Vec<RunEntry>,
    ops: &[DiffOp],
    options: &PatchOptions<'_>,
    numbering: &mut NumberingService,
) -> Vec<RunEntry> {
    let boundaries: BTreeSet<usize> = ops.iter().flat_map(|op| [op.start, op.end]).collect();
    let split = split_at_boundaries(model, &boundaries);

    let styles: Vec<StyleSpan> = split
        .iter()
        .filter_map(|entry| match entry {
            RunEntry::Text {
                r_pr_xml,
                start,
                end,
                ..
            } => Some(StyleSpan {
                start: *start,
                end: *end,
                r_pr_xml: r_pr_xml.clone(),
            }),
            _ => None,
        })
        .collect();

    let mut state = ApplyState {
        out: Vec::with_capacity(split.len()),
        current_p_pr: String::new(),
        last_paragraph_start: None,
    };

    let non_insert: Vec<&DiffOp> = ops.iter().filter(|op| op.kind != DiffKind::Insert).collect();
    let inserts: Vec<&DiffOp> = ops.iter().filter(|op| op.kind == DiffKind::Insert).collect();
    let mut op_cursor = 0;
    let mut insert_cursor = 0;

    for entry in split {
        let offset = entry.start_offset();
        while insert_cursor < inserts.len() && inserts[insert_cursor].start <= offset {
            state.materialize_insert(inserts[insert_cursor], options, numbering, &styles);
            insert_cursor += 1;
        }

        match entry {
            RunEntry::ParagraphStart { .. } => {
                if let RunEntry::ParagraphStart { p_pr_xml, .. } = &entry {
                    state.current_p_pr = p_pr_xml.clone();
                }
                state.out.push(entry);
                state.last_paragraph_start = Some(state.out.len() - 1);
            }
            RunEntry::Text {
                ref text,
                ref r_pr_xml,
                start,
                end,
            } => {
                while op_cursor + 1 < non_insert.len() && non_insert[op_cursor].end <= start {
                    op_cursor += 1;
                }
                let covering = non_insert
                    .get(op_cursor)
                    .filter(|op| op.start <= start && end <= op.end);
                match covering.map(|op| op.kind) {
                    // No covering op: silently retain the run.
                    None | Some(DiffKind::Equal) => state.out.push(entry),
                    Some(DiffKind::Delete) => {
                        if options.generate_redlines {
                            state.out.push(RunEntry::Deletion {
                                text: text.clone(),
                                author: options.author.to_string(),
                                node_xml: None,
                                r_pr_xml: r_pr_xml.clone(),
                                offset: start,
                            });
                        }
                    }
                    Some(DiffKind::Insert) => unreachable!("insert ops are filtered out"),
                }
            }
            _ => state.out.push(entry),
        }
    }

    // Tail insertions: anything not anchored by an original entry.
    for op in &inserts[insert_cursor..] {
        state.materialize_insert(op, options, numbering, &styles);
    }

    state.out
}

/// Cut `Text` entries at every diff boundary strictly inside them.
fn split_at_boundaries(model: Vec<RunEntry>, boundaries: &BTreeSet<usize>) -> Vec<RunEntry> {
    let mut out = Vec::with_capacity(model.len());
    for entry in model {
        match entry {
            RunEntry::Text {
                text,
                r_pr_xml,
                start,
                end,
            } => {
                let mut cut_start = start;
                for &cut in boundaries.range((Excluded(start), Excluded(end))) {
                    out.push(RunEntry::Text {
                        text: text[cut_start - start..cut - start].to_string(),
                        r_pr_xml: r_pr_xml.clone(),
                        start: cut_start,
                        end: cut,
                    });
                    cut_start = cut;
                }
                out.push(RunEntry::Text {
                    text: text[cut_start - start..].to_string(),
                    r_pr_xml,
                    start: cut_start,
                    end,
                });
            }
            other => out.push(other),
        }
    }
    out
}

/// A `Text` interval and its run properties, used as a style source.
struct StyleSpan {
    start: usize,
    end: usize,
    r_pr_xml: String,
}

/// Mutable traversal state for the apply pass.
struct ApplyState {
    out: Vec<RunEntry>,
    current_p_pr: String,
    last_paragraph_start: Option<usize>,
}

impl ApplyState {
    fn materialize_insert(
        &mut self,
        op: &DiffOp,
        options: &PatchOptions<'_>,
        numbering: &mut NumberingService,
        styles: &[StyleSpan],
    ) {
        let r_pr_xml = inherit_style(styles, op.start, &op.text);
        let lines: Vec<&str> = op.text.split('\n').collect();
        let mut new_offset = op.new_start;

        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                new_offset += 1;
            }
            let mut line_text: &str = line;
            let mut list: Option<(String, usize)> = None;
            if let Some(m) = match_list_marker(line, true) {
                let format = detect_numbering_format(m.marker);
                let context = parse_numbering_context(&self.current_p_pr);
                let num_id = numbering.get_or_create_num_id(&format, context.as_ref());
                list = Some((num_id, format.depth));
                line_text = m.rest;
                new_offset += m.consumed;
            }

            if i > 0 {
                let p_pr_xml = match &list {
                    Some((num_id, ilvl)) => numbering.build_list_p_pr(num_id, *ilvl),
                    None => self.current_p_pr.clone(),
                };
                self.current_p_pr = p_pr_xml.clone();
                self.out.push(RunEntry::ParagraphStart {
                    p_pr_xml,
                    offset: op.start,
                });
                self.last_paragraph_start = Some(self.out.len() - 1);
            } else if let Some((num_id, ilvl)) = &list {
                // A list line landing in an open paragraph promotes that
                // paragraph to a list item in place.
                if let Some(index) = self.last_paragraph_start {
                    let list_p_pr = numbering.build_list_p_pr(num_id, *ilvl);
                    if let RunEntry::ParagraphStart { p_pr_xml, .. } = &mut self.out[index] {
                        *p_pr_xml = list_p_pr.clone();
                    }
                    self.current_p_pr = list_p_pr;
                }
            }

            if !line_text.is_empty() {
                self.out.push(RunEntry::Insertion {
                    text: line_text.to_string(),
                    r_pr_xml: r_pr_xml.clone(),
                    author: options.author.to_string(),
                    offset: op.start,
                    new_start: new_offset,
                });
            }
            new_offset += line_text.len();
        }
    }
}

/// Pick the run properties an insertion inherits.
///
/// Let P be the nearest text ending at or before the offset and N the
/// nearest starting at or after it. Leading space pulls from P, trailing
/// space from N, otherwise P.
fn inherit_style(styles: &[StyleSpan], offset: usize, inserted: &str) -> String {
    let prev = styles.iter().rev().find(|s| s.end <= offset);
    let next = styles.iter().find(|s| s.start >= offset);
    let chosen = match (prev, next) {
        (Some(p), Some(n)) => {
            if inserted.starts_with(' ') {
                p
            } else if inserted.ends_with(' ') {
                n
            } else {
                p
            }
        }
        (Some(p), None) => p,
        (None, Some(n)) => n,
        (None, None) => return String::new(),
    };
    chosen.r_pr_xml.clone()
}

/// Read an existing `w:numPr` out of serialized paragraph properties.
fn parse_numbering_context(p_pr_xml: &str) -> Option<NumberingContext> {
    if p_pr_xml.is_empty() {
        return None;
    }
    let p_pr = redline_xml::parse_document(p_pr_xml, "pPr").ok()?;
    let num_pr = p_pr.first_child("numPr")?;
    let num_id = num_pr.first_child("numId")?.attribute("w:val")?.to_string();
    let ilvl = num_pr
        .first_child("ilvl")
        .and_then(|e| e.attribute("w:val"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    Some(NumberingContext {
        num_id,
        ilvl,
        kind: ListKind::Unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_words;
    use crate::ingest::ingest_paragraphs;

    fn redline_options() -> PatchOptions<'static> {
        PatchOptions {
            generate_redlines: true,
            author: "Reviewer",
        }
    }

    fn patch(xml: &str, modified: &str, options: &PatchOptions<'_>) -> Vec<RunEntry> {
        let ingest = ingest_paragraphs(xml).unwrap();
        let ops = diff_words(&ingest.accepted_text, modified);
        let mut numbering = NumberingService::new();
        patch_model(ingest.run_model, &ops, options, &mut numbering)
    }

    #[test]
    fn test_no_entry_straddles_a_boundary() {
        let ingest =
            ingest_paragraphs("<w:p><w:r><w:t>alpha beta gamma</w:t></w:r></w:p>").unwrap();
        let ops = diff_words(&ingest.accepted_text, "alpha delta gamma");
        let boundaries: BTreeSet<usize> =
            ops.iter().flat_map(|op| [op.start, op.end]).collect();
        let split = split_at_boundaries(ingest.run_model, &boundaries);
        for entry in &split {
            if let RunEntry::Text { start, end, .. } = entry {
                assert!(
                    boundaries
                        .range((Excluded(*start), Excluded(*end)))
                        .next()
                        .is_none(),
                    "entry [{start}, {end}) straddles a boundary"
                );
            }
        }
    }

    #[test]
    fn test_equal_entries_pass_through_verbatim() {
        let patched = patch(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello</w:t></w:r></w:p>"#,
            "Hello",
            &redline_options(),
        );
        assert!(matches!(
            &patched[1],
            RunEntry::Text { text, r_pr_xml, .. }
                if text == "Hello" && r_pr_xml == "<w:rPr><w:b/></w:rPr>"
        ));
    }

    #[test]
    fn test_delete_flips_to_deletion_with_author() {
        let patched = patch(
            "<w:p><w:r><w:t>Hello, world</w:t></w:r></w:p>",
            "Hello,",
            &redline_options(),
        );
        let deletion = patched
            .iter()
            .find_map(|e| match e {
                RunEntry::Deletion { text, author, node_xml, .. } => {
                    Some((text.clone(), author.clone(), node_xml.clone()))
                }
                _ => None,
            })
            .expect("a deletion entry");
        assert_eq!(deletion.0, " world");
        assert_eq!(deletion.1, "Reviewer");
        assert_eq!(deletion.2, None);
    }

    #[test]
    fn test_delete_dropped_without_redlines() {
        let options = PatchOptions {
            generate_redlines: false,
            author: "Reviewer",
        };
        let patched = patch(
            "<w:p><w:r><w:t>Hello, world</w:t></w:r></w:p>",
            "Hello,",
            &options,
        );
        assert!(!patched.iter().any(|e| matches!(e, RunEntry::Deletion { .. })));
        let texts: Vec<&str> = patched
            .iter()
            .filter_map(|e| match e {
                RunEntry::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Hello,"]);
    }

    #[test]
    fn test_insert_materialized_between_anchoring_runs() {
        let patched = patch(
            "<w:p><w:r><w:t>Hello world</w:t></w:r></w:p>",
            "Hello brave world",
            &redline_options(),
        );
        let kinds: Vec<&str> = patched
            .iter()
            .map(|e| match e {
                RunEntry::ParagraphStart { .. } => "p",
                RunEntry::Text { .. } => "t",
                RunEntry::Insertion { .. } => "i",
                _ => "?",
            })
            .collect();
        assert_eq!(kinds, vec!["p", "t", "i", "t"]);
        assert!(matches!(
            &patched[2],
            RunEntry::Insertion { text, .. } if text == "brave "
        ));
    }

    #[test]
    fn test_tail_insert_appended() {
        let patched = patch(
            "<w:p><w:r><w:t>Hello</w:t></w:r></w:p>",
            "Hello, world",
            &redline_options(),
        );
        match patched.last().unwrap() {
            RunEntry::Insertion { text, .. } => assert_eq!(text, ", world"),
            other => panic!("expected tail insertion, got {other:?}"),
        }
    }

    #[test]
    fn test_inheritance_prefers_previous_on_leading_space() {
        let styles = vec![
            StyleSpan {
                start: 0,
                end: 5,
                r_pr_xml: "<w:rPr><w:b/></w:rPr>".to_string(),
            },
            StyleSpan {
                start: 5,
                end: 10,
                r_pr_xml: "<w:rPr><w:i/></w:rPr>".to_string(),
            },
        ];
        assert_eq!(inherit_style(&styles, 5, " tail"), "<w:rPr><w:b/></w:rPr>");
        assert_eq!(inherit_style(&styles, 5, "head "), "<w:rPr><w:i/></w:rPr>");
        assert_eq!(inherit_style(&styles, 5, "mid"), "<w:rPr><w:b/></w:rPr>");
        assert_eq!(inherit_style(&styles, 0, "x"), "<w:rPr><w:b/></w:rPr>");
        assert_eq!(inherit_style(&[], 0, "x"), "");
    }

    #[test]
    fn test_multi_line_insert_creates_paragraphs() {
        let patched = patch(
            "<w:p><w:r><w:t>intro</w:t></w:r></w:p>",
            "intro\nsecond line",
            &redline_options(),
        );
        let paragraph_count = patched
            .iter()
            .filter(|e| matches!(e, RunEntry::ParagraphStart { .. }))
            .count();
        assert_eq!(paragraph_count, 2);
        match patched.last().unwrap() {
            RunEntry::Insertion { text, .. } => assert_eq!(text, "second line"),
            other => panic!("expected insertion, got {other:?}"),
        }
    }

    #[test]
    fn test_list_promotion_rewrites_open_paragraph() {
        let patched = patch(
            "<w:p><w:r><w:t>preamble</w:t></w:r></w:p>",
            "1. one\n2. two",
            &redline_options(),
        );
        match &patched[0] {
            RunEntry::ParagraphStart { p_pr_xml, .. } => {
                assert!(p_pr_xml.contains(r#"<w:numId w:val="3"/>"#));
                assert!(p_pr_xml.contains(r#"<w:ilvl w:val="0"/>"#));
            }
            other => panic!("expected paragraph start, got {other:?}"),
        }
        let list_starts = patched
            .iter()
            .filter(|e| matches!(e, RunEntry::ParagraphStart { p_pr_xml, .. } if p_pr_xml.contains("numPr")))
            .count();
        assert_eq!(list_starts, 2);
        let inserted: Vec<&str> = patched
            .iter()
            .filter_map(|e| match e {
                RunEntry::Insertion { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(inserted, vec!["one", "two"]);
    }

    #[test]
    fn test_existing_list_num_id_reused() {
        let xml = r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="42"/></w:numPr></w:pPr><w:r><w:t>first</w:t></w:r></w:p>"#;
        let patched = patch(xml, "first\n- second", &redline_options());
        let second = patched
            .iter()
            .filter_map(|e| match e {
                RunEntry::ParagraphStart { p_pr_xml, .. } => Some(p_pr_xml.as_str()),
                _ => None,
            })
            .nth(1)
            .unwrap();
        assert!(second.contains(r#"<w:numId w:val="42"/>"#));
    }

    #[test]
    fn test_bookmarks_and_preexisting_deletions_pass_through() {
        let xml = r#"<w:p><w:bookmarkStart w:id="0" w:name="m"/><w:r><w:t>keep</w:t></w:r><w:del w:author="X"><w:r><w:delText>old</w:delText></w:r></w:del><w:bookmarkEnd w:id="0"/></w:p>"#;
        let patched = patch(xml, "keep", &redline_options());
        assert_eq!(
            patched
                .iter()
                .filter(|e| matches!(e, RunEntry::Bookmark { .. }))
                .count(),
            2
        );
        assert!(patched.iter().any(
            |e| matches!(e, RunEntry::Deletion { node_xml: Some(_), .. })
        ));
    }
}
