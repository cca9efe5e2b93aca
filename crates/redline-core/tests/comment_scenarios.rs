//! End-to-end comment injection scenarios.

use redline_core::{CommentOptions, CommentRequest, inject_comments_into_ooxml};

fn options() -> CommentOptions {
    CommentOptions {
        author: "Ada Lovelace".to_string(),
        date: Some("2024-05-01T12:00:00Z".to_string()),
    }
}

fn request(index: usize, find: &str, content: &str) -> CommentRequest {
    CommentRequest {
        paragraph_index: index,
        text_to_find: find.to_string(),
        comment_content: content.to_string(),
    }
}

/// Reconstruct the visible text of an emitted document.
fn visible_text(oxml: &str) -> String {
    let mut out = String::new();
    let mut rest = oxml;
    while let Some(pos) = rest.find("<w:t") {
        rest = &rest[pos + 4..];
        // Skip elements sharing the prefix, like <w:tab/>.
        if !rest.starts_with('>') && !rest.starts_with(' ') {
            continue;
        }
        let Some(open_end) = rest.find('>') else { break };
        let body = &rest[open_end + 1..];
        let Some(close) = body.find("</w:t>") else { break };
        out.push_str(&body[..close]);
        rest = &body[close + 6..];
    }
    out
}

#[test]
fn comment_surgery_across_two_runs() {
    // "bold world" spans the bold middle run and the trailing run.
    let xml = concat!(
        "<w:p>",
        "<w:r><w:t>Hello </w:t></w:r>",
        "<w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>",
        "<w:r><w:t> world!</w:t></w:r>",
        "</w:p>"
    );
    let result =
        inject_comments_into_ooxml(xml, &[request(1, "bold world", "spans runs")], &options());
    assert_eq!(result.comments_applied, 1);
    assert!(result.warnings.is_empty());
    let oxml = &result.oxml;

    // Start marker sits immediately before the bold run.
    let start_marker = oxml.find("<w:commentRangeStart").unwrap();
    let bold_run = oxml.find("<w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>").unwrap();
    assert!(start_marker < bold_run);

    // The trailing run was split at the end offset: " world" stays inside
    // the range, "!" follows the end marker and reference run.
    let end_marker = oxml.find("<w:commentRangeEnd").unwrap();
    let reference = oxml.find("<w:commentReference").unwrap();
    let world = oxml.find("world</w:t>").unwrap();
    let bang = oxml.find("<w:t>!</w:t>").unwrap();
    assert!(world < end_marker && end_marker < reference && reference < bang);

    // The paragraph's visible text is unchanged by the surgery.
    assert_eq!(visible_text(oxml), "Hello bold world!");

    // Exactly one matched marker pair with the same id.
    let id_of = |needle: &str| {
        let at = oxml.find(needle).unwrap();
        oxml[at..]
            .split(r#"w:id=""#)
            .nth(1)
            .unwrap()
            .split('"')
            .next()
            .unwrap()
            .to_string()
    };
    assert_eq!(id_of("<w:commentRangeStart"), id_of("<w:commentRangeEnd"));

    // comments.xml carries the same id and the derived initials.
    let comments = result.comments_xml.unwrap();
    assert!(comments.contains(&format!(r#"w:id="{}""#, id_of("<w:commentRangeStart"))));
    assert!(comments.contains(r#"w:initials="AL""#));
}

#[test]
fn comment_inside_full_document_body() {
    let xml = concat!(
        "<w:document>",
        "<w:body>",
        "<w:p><w:r><w:t>first paragraph</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>second paragraph</w:t></w:r></w:p>",
        "</w:body>",
        "</w:document>"
    );
    let result = inject_comments_into_ooxml(
        xml,
        &[request(2, "second", "targets paragraph two")],
        &options(),
    );
    assert_eq!(result.comments_applied, 1);
    // Paragraph one untouched, markers only in paragraph two.
    let first = result.oxml.find("first paragraph").unwrap();
    let marker = result.oxml.find("<w:commentRangeStart").unwrap();
    assert!(marker > first);
    assert_eq!(visible_text(&result.oxml), "first paragraphsecond paragraph");
}

#[test]
fn comment_spanning_into_hyperlink_content() {
    let xml = concat!(
        "<w:p>",
        "<w:r><w:t>Visit </w:t></w:r>",
        r#"<w:hyperlink r:id="rId4"><w:r><w:t>our site</w:t></w:r></w:hyperlink>"#,
        "</w:p>"
    );
    let result =
        inject_comments_into_ooxml(xml, &[request(1, "Visit our", "crosses boundary")], &options());
    assert_eq!(result.comments_applied, 1);
    assert_eq!(visible_text(&result.oxml), "Visit our site");
    // The end marker lands inside the hyperlink, after the split of
    // "our site" into "our" and " site".
    let link = result.oxml.find("<w:hyperlink").unwrap();
    let end_marker = result.oxml.find("<w:commentRangeEnd").unwrap();
    assert!(end_marker > link);
}

#[test]
fn multiple_requests_allocate_distinct_ids() {
    let xml = concat!(
        "<w:p><w:r><w:t>alpha beta</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>gamma delta</w:t></w:r></w:p>"
    );
    let result = inject_comments_into_ooxml(
        xml,
        &[request(1, "alpha", "one"), request(2, "delta", "two")],
        &options(),
    );
    assert_eq!(result.comments_applied, 2);
    let comments = result.comments_xml.unwrap();
    let ids: Vec<u64> = comments
        .split(r#"w:id=""#)
        .skip(1)
        .map(|rest| rest.split('"').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);
}
