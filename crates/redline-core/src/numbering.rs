//! List-marker detection and `numbering.xml` synthesis.
//!
//! When inserted text begins with a list marker the patcher promotes the
//! paragraph to a list item. Three stock list definitions cover the common
//! cases (bullet, legal multi-level, outline); anything else gets a custom
//! definition allocated on the fly. The service is created fresh per
//! reconciliation call and remembers whether any list paragraph properties
//! were built, which is what decides whether a `numbering.xml` part ships
//! with the result.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Word number formats the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListFormat {
    Bullet,
    Decimal,
    LowerLetter,
    UpperLetter,
    LowerRoman,
    UpperRoman,
    /// Dotted multi-level numbering (`1.`, `1.2`, `1.2.3.`).
    Outline,
}

impl ListFormat {
    /// The `w:numFmt` value for this format.
    pub fn num_fmt(self) -> &'static str {
        match self {
            ListFormat::Bullet => "bullet",
            ListFormat::Decimal | ListFormat::Outline => "decimal",
            ListFormat::LowerLetter => "lowerLetter",
            ListFormat::UpperLetter => "upperLetter",
            ListFormat::LowerRoman => "lowerRoman",
            ListFormat::UpperRoman => "upperRoman",
        }
    }

    fn is_bullet(self) -> bool {
        self == ListFormat::Bullet
    }
}

/// How the marker terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerSuffix {
    /// `1.`, `a.`
    Period,
    /// `(1)`, `(a)`
    ParenBoth,
    /// Bare glyph or digits.
    None,
}

/// Classification of one list marker token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerFormat {
    pub format: ListFormat,
    pub suffix: MarkerSuffix,
    /// Indent level the marker implies (outline depth; 0 otherwise).
    pub depth: usize,
}

/// The list a paragraph already belongs to, read from its `w:pPr`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberingContext {
    pub num_id: String,
    pub ilvl: usize,
    pub kind: ListKind,
}

/// Broad list family, for deciding whether an existing numId can be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered,
    Unknown,
}

/// A recognized marker at the head of an inserted line.
#[derive(Debug, Clone, PartialEq)]
pub struct ListMarkerMatch<'a> {
    /// The marker token itself.
    pub marker: &'a str,
    /// The line with marker and following whitespace removed.
    pub rest: &'a str,
    /// Byte length of marker plus consumed whitespace.
    pub consumed: usize,
}

static OUTLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*\.?$").expect("static pattern"));
static MARKER: Lazy<Regex> = Lazy::new(|| {
    // bullet | dotted numbers | (token) | letter-or-roman-dot | digits
    Regex::new(r"^([-*•]|\d+(?:\.\d+)*\.?|\([A-Za-z0-9]{1,5}\)|[A-Za-z]\.|[ivxlcdm]{2,6}\.|[IVXLCDM]{2,6}\.|\d+)(\s*)")
        .expect("static pattern")
});

/// Recognize a list marker at the start of `line`.
///
/// With `allow_no_space`, a marker directly followed by text still counts;
/// otherwise the marker must be followed by whitespace or end the line.
pub fn match_list_marker(line: &str, allow_no_space: bool) -> Option<ListMarkerMatch<'_>> {
    let trimmed_start = line.len() - line.trim_start().len();
    let body = &line[trimmed_start..];
    let caps = MARKER.captures(body)?;
    let marker = caps.get(1).expect("marker group");
    let spaces = caps.get(2).expect("space group");
    if spaces.as_str().is_empty() && marker.end() != body.len() && !allow_no_space {
        return None;
    }
    let consumed = trimmed_start + spaces.end();
    Some(ListMarkerMatch {
        marker: marker.as_str(),
        rest: &line[consumed..],
        consumed,
    })
}

/// Classify a marker token into format, suffix, and outline depth.
pub fn detect_numbering_format(marker: &str) -> MarkerFormat {
    if matches!(marker, "-" | "*" | "•") {
        return MarkerFormat {
            format: ListFormat::Bullet,
            suffix: MarkerSuffix::None,
            depth: 0,
        };
    }
    // Dotted numbers are outline: "1." at depth 0, "1.2" at depth 1, and
    // so on. A bare digit string falls through to plain decimal below.
    if OUTLINE.is_match(marker) && marker.contains('.') {
        let depth = marker
            .trim_end_matches('.')
            .split('.')
            .count()
            .saturating_sub(1);
        return MarkerFormat {
            format: ListFormat::Outline,
            suffix: MarkerSuffix::Period,
            depth,
        };
    }
    if marker.starts_with('(') && marker.ends_with(')') {
        let token = &marker[1..marker.len() - 1];
        return MarkerFormat {
            format: classify_token(token),
            suffix: MarkerSuffix::ParenBoth,
            depth: 0,
        };
    }
    if let Some(token) = marker.strip_suffix('.') {
        return MarkerFormat {
            format: classify_token(token),
            suffix: MarkerSuffix::Period,
            depth: 0,
        };
    }
    if marker.starts_with(|c: char| c.is_ascii_digit()) {
        return MarkerFormat {
            format: ListFormat::Decimal,
            suffix: MarkerSuffix::None,
            depth: 0,
        };
    }
    MarkerFormat {
        format: ListFormat::Bullet,
        suffix: MarkerSuffix::None,
        depth: 0,
    }
}

/// Classify the alphanumeric core of a `(x)` or `x.` marker.
///
/// Roman wins over alphabetic when the token is made purely of roman
/// numeral letters in a single case; `(i)` is lowerRoman, `(a)` lowerAlpha.
fn classify_token(token: &str) -> ListFormat {
    if token.chars().all(|c| c.is_ascii_digit()) {
        return ListFormat::Decimal;
    }
    let lower = token.chars().all(|c| c.is_ascii_lowercase());
    let upper = token.chars().all(|c| c.is_ascii_uppercase());
    let roman = token
        .to_ascii_lowercase()
        .chars()
        .all(|c| "ivxlcdm".contains(c));
    match (roman, lower, upper) {
        (true, true, _) => ListFormat::LowerRoman,
        (true, _, true) => ListFormat::UpperRoman,
        (false, true, _) => ListFormat::LowerLetter,
        (false, _, true) => ListFormat::UpperLetter,
        _ => ListFormat::Decimal,
    }
}

/// A custom list definition allocated for a non-stock marker format.
#[derive(Debug, Clone, PartialEq)]
struct CustomListConfig {
    num_id: String,
    format: ListFormat,
    suffix: MarkerSuffix,
}

/// Per-call numbering state.
#[derive(Debug, Default)]
pub struct NumberingService {
    custom_ids: HashMap<String, String>,
    custom_configs: Vec<CustomListConfig>,
    next_custom_id: u64,
    used: bool,
}

/// Stock numId bindings: 1 → bullet, 2 → legal, 3 → outline.
const NUM_ID_BULLET: &str = "1";
const NUM_ID_LEGAL: &str = "2";
const NUM_ID_OUTLINE: &str = "3";

impl NumberingService {
    pub fn new() -> Self {
        Self {
            next_custom_id: 1000,
            ..Self::default()
        }
    }

    /// Resolve a numId for a requested marker format.
    ///
    /// Priority: reuse the paragraph's existing list when compatible, then
    /// a previously allocated custom id, then the stock definitions, then a
    /// fresh custom id (level 0 only; deeper levels fall back to the legal
    /// list whose sublevels are `(a)`, `(i)`, `(1)`, `a.`).
    pub fn get_or_create_num_id(
        &mut self,
        requested: &MarkerFormat,
        context: Option<&NumberingContext>,
    ) -> String {
        if let Some(ctx) = context {
            let compatible = match ctx.kind {
                ListKind::Unknown => true,
                ListKind::Bullet => requested.format.is_bullet(),
                ListKind::Numbered => !requested.format.is_bullet(),
            };
            if compatible {
                return ctx.num_id.clone();
            }
        }

        let signature = format!("custom_{:?}_{:?}", requested.format, requested.suffix);
        if let Some(id) = self.custom_ids.get(&signature) {
            return id.clone();
        }

        match (requested.format, requested.suffix) {
            (ListFormat::Outline, _) => return NUM_ID_OUTLINE.to_string(),
            (ListFormat::Bullet, _) => return NUM_ID_BULLET.to_string(),
            (ListFormat::Decimal, MarkerSuffix::Period | MarkerSuffix::None) => {
                return NUM_ID_LEGAL.to_string();
            }
            _ => {}
        }

        if requested.depth == 0 {
            let id = self.next_custom_id.to_string();
            self.next_custom_id += 1;
            self.custom_ids.insert(signature, id.clone());
            self.custom_configs.push(CustomListConfig {
                num_id: id.clone(),
                format: requested.format,
                suffix: requested.suffix,
            });
            return id;
        }

        NUM_ID_LEGAL.to_string()
    }

    /// Build the `w:pPr` that turns a paragraph into a list item.
    pub fn build_list_p_pr(&mut self, num_id: &str, ilvl: usize) -> String {
        self.used = true;
        format!(
            r#"<w:pPr><w:numPr><w:ilvl w:val="{ilvl}"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr>"#
        )
    }

    /// Whether any list paragraph properties were built this call.
    pub fn needs_numbering_part(&self) -> bool {
        self.used
    }

    /// Synthesize the companion `numbering.xml` part.
    pub fn generate_numbering_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(
            r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        );

        // abstractNum 0: nine-level bullet with cycling glyphs.
        out.push_str(r#"<w:abstractNum w:abstractNumId="0">"#);
        let glyphs = [("\u{2022}", "Symbol"), ("o", "Courier New"), ("\u{25AA}", "Wingdings")];
        for level in 0..9 {
            let (glyph, font) = glyphs[level % glyphs.len()];
            out.push_str(&bullet_level(level, glyph, font));
        }
        out.push_str("</w:abstractNum>");

        // abstractNum 1: legal multi-level (1. → (a) → (i) → (1) → a.).
        out.push_str(r#"<w:abstractNum w:abstractNumId="1">"#);
        let legal = [
            ("decimal", "%{}."),
            ("lowerLetter", "(%{})"),
            ("lowerRoman", "(%{})"),
            ("decimal", "(%{})"),
            ("lowerLetter", "%{}."),
        ];
        for level in 0..9 {
            let (fmt, template) = legal[level % legal.len()];
            let text = template.replace("{}", &(level + 1).to_string());
            out.push_str(&numbered_level(level, fmt, &text));
        }
        out.push_str("</w:abstractNum>");

        // abstractNum 2: outline (%1., %1.%2, ..., %1.%2.%3.%4.%5).
        out.push_str(r#"<w:abstractNum w:abstractNumId="2">"#);
        for level in 0..5 {
            let mut text = (1..=level + 1)
                .map(|n| format!("%{n}"))
                .collect::<Vec<_>>()
                .join(".");
            if level == 0 {
                text.push('.');
            }
            out.push_str(&numbered_level(level, "decimal", &text));
        }
        out.push_str("</w:abstractNum>");

        // One abstractNum per tracked custom configuration.
        for (i, config) in self.custom_configs.iter().enumerate() {
            let abstract_id = 3 + i;
            let text = match config.suffix {
                MarkerSuffix::Period => "%1.".to_string(),
                MarkerSuffix::ParenBoth => "(%1)".to_string(),
                MarkerSuffix::None => "%1".to_string(),
            };
            out.push_str(&format!(r#"<w:abstractNum w:abstractNumId="{abstract_id}">"#));
            out.push_str(&numbered_level(0, config.format.num_fmt(), &text));
            out.push_str("</w:abstractNum>");
        }

        // numId bindings: 1 → 0, 2 → 1, 3 → 2, plus customs.
        for (num_id, abstract_id) in [("1", 0), ("2", 1), ("3", 2)] {
            out.push_str(&format!(
                r#"<w:num w:numId="{num_id}"><w:abstractNumId w:val="{abstract_id}"/></w:num>"#
            ));
        }
        for (i, config) in self.custom_configs.iter().enumerate() {
            out.push_str(&format!(
                r#"<w:num w:numId="{}"><w:abstractNumId w:val="{}"/></w:num>"#,
                config.num_id,
                3 + i
            ));
        }

        out.push_str("</w:numbering>");
        out
    }
}

fn bullet_level(level: usize, glyph: &str, font: &str) -> String {
    let indent = 720 * (level + 1);
    format!(
        r#"<w:lvl w:ilvl="{level}"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="{glyph}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="360"/></w:pPr><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:hint="default"/></w:rPr></w:lvl>"#
    )
}

fn numbered_level(level: usize, num_fmt: &str, lvl_text: &str) -> String {
    let indent = 720 * (level + 1);
    format!(
        r#"<w:lvl w:ilvl="{level}"><w:start w:val="1"/><w:numFmt w:val="{num_fmt}"/><w:lvlText w:val="{lvl_text}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="360"/></w:pPr></w:lvl>"#
    )
}
