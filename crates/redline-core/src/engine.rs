//! The reconciliation entry point.
//!
//! `apply_redline` runs the full pipeline: sanitize the proposed text,
//! strip Markdown, ingest the paragraph XML, diff, patch, serialize, and
//! wrap. It never propagates an error on the edit path; malformed input
//! comes back as the unchanged XML plus a warning in the envelope.

use crate::diff::{DiffKind, diff_words};
use crate::error::Error;
use crate::ingest::ingest_paragraphs;
use crate::markdown::strip_formatting;
use crate::numbering::NumberingService;
use crate::package::{add_namespace_decls, build_package};
use crate::patch::{PatchOptions, patch_model};
use crate::revision::RevisionSettings;
use crate::serialize::{SerializeOptions, serialize_model};
use tracing::{debug, warn};

/// Options for [`apply_redline`].
#[derive(Debug, Clone)]
pub struct RedlineOptions {
    /// Author stamped onto revisions.
    pub author: String,
    /// Emit tracked changes (`w:ins`/`w:del`) instead of accepted edits.
    pub generate_redlines: bool,
    /// Optional font forced onto inserted runs.
    pub font: Option<String>,
    /// Fixed ISO-8601 revision date; defaults to the current UTC time.
    pub date: Option<String>,
    /// Paragraph id the caller is targeting; carried through untouched.
    pub target_paragraph_id: Option<String>,
}

impl Default for RedlineOptions {
    fn default() -> Self {
        Self {
            author: "AI".to_string(),
            generate_redlines: true,
            font: None,
            date: None,
            target_paragraph_id: None,
        }
    }
}

/// The result envelope of an edit.
#[derive(Debug, Clone)]
pub struct RedlineResult {
    pub oxml: String,
    pub has_changes: bool,
    pub warnings: Vec<String>,
    /// Whether the result needs a `numbering.xml` part.
    pub include_numbering: bool,
    pub numbering_xml: Option<String>,
}

impl RedlineResult {
    fn unchanged(paragraph_xml: &str, warnings: Vec<String>) -> Self {
        Self {
            oxml: paragraph_xml.to_string(),
            has_changes: false,
            warnings,
            include_numbering: false,
            numbering_xml: None,
        }
    }
}

/// Reconcile a paragraph's XML against the requested replacement text.
pub fn apply_redline(
    paragraph_xml: &str,
    original_text: &str,
    modified_text: &str,
    options: &RedlineOptions,
) -> RedlineResult {
    let mut warnings = Vec::new();

    let modified = sanitize_model_text(modified_text);
    if original_text == modified {
        return RedlineResult::unchanged(paragraph_xml, warnings);
    }

    let cleaned = strip_formatting(&modified);

    let ingested = match ingest_paragraphs(paragraph_xml) {
        Ok(ingested) => ingested,
        Err(err) => {
            warn!(error = %err, "returning paragraph unchanged");
            return RedlineResult::unchanged(paragraph_xml, vec![err.to_string()]);
        }
    };

    // The model's accepted text is authoritative; a caller-supplied
    // original that disagrees gets a warning but the edit proceeds.
    if ingested.accepted_text != original_text {
        warn!(
            expected = %original_text,
            actual = %ingested.accepted_text,
            "caller-supplied original text does not match the paragraph"
        );
        warnings.push(format!(
            "original text does not match paragraph content; diffing against {:?}",
            ingested.accepted_text
        ));
    }

    let ops = diff_words(&ingested.accepted_text, &cleaned.text);
    let has_changes = ops.iter().any(|op| op.kind != DiffKind::Equal);
    if !has_changes {
        return RedlineResult::unchanged(paragraph_xml, warnings);
    }
    debug!(op_count = ops.len(), "applying diff");

    let mut numbering = NumberingService::new();
    let patch_options = PatchOptions {
        generate_redlines: options.generate_redlines,
        author: &options.author,
    };
    let patched = patch_model(ingested.run_model, &ops, &patch_options, &mut numbering);

    let revision = match &options.date {
        Some(date) => RevisionSettings::with_date(&options.author, date),
        None => RevisionSettings::new(&options.author),
    };
    let serialized = serialize_model(
        &patched,
        ingested.first_p_pr.as_deref().filter(|p| !p.is_empty()),
        &cleaned.hints,
        &SerializeOptions {
            revision: &revision,
            generate_redlines: options.generate_redlines,
            font: options.font.as_deref(),
        },
    );

    if serialized.is_empty() {
        warn!("pipeline produced no output for a changed paragraph");
        return RedlineResult::unchanged(paragraph_xml, vec![Error::EmptyOutput.to_string()]);
    }

    if numbering.needs_numbering_part() {
        let numbering_xml = numbering.generate_numbering_xml();
        RedlineResult {
            oxml: build_package(&serialized, Some(&numbering_xml), None),
            has_changes: true,
            warnings,
            include_numbering: true,
            numbering_xml: Some(numbering_xml),
        }
    } else {
        let oxml = match add_namespace_decls(&serialized) {
            Ok(oxml) => oxml,
            Err(err) => {
                return RedlineResult::unchanged(paragraph_xml, vec![err.to_string()]);
            }
        };
        RedlineResult {
            oxml,
            has_changes: true,
            warnings,
            include_numbering: false,
            numbering_xml: None,
        }
    }
}

/// Trim the proposed text and strip the stray `Text:` prefix one known AI
/// client emits.
fn sanitize_model_text(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.strip_prefix("Text:") {
        Some(rest) => rest.trim_start().to_string(),
        None => trimmed.to_string(),
    }
}
