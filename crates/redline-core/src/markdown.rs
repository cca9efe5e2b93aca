//! Markdown and HTML inline-formatting pre-processing.
//!
//! The replacement text an AI client proposes may carry inline formatting
//! markers (`**bold**`, `<i>italic</i>`, or their HTML-escaped forms). The
//! engine diffs against plain text, so the markers are stripped up front
//! and turned into format hints whose offsets index the cleaned text; the
//! serializer later applies them to inserted spans.
//!
//! The regex crate has no backreferences or lookaround, so each HTML tag
//! gets its own pattern, and single-delimiter emphasis uses a character
//! class to avoid eating doubled delimiters. Pattern priority plus the
//! "earliest start, longest span" sweep resolves the `***` / `**++`
//! ambiguities.

use once_cell::sync::Lazy;
use regex::Regex;

/// Inline formatting toggles derived from one marker pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatFlags {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl FormatFlags {
    pub const BOLD: Self = Self {
        bold: true,
        italic: false,
        underline: false,
        strikethrough: false,
    };
    pub const ITALIC: Self = Self {
        bold: false,
        italic: true,
        underline: false,
        strikethrough: false,
    };
    pub const UNDERLINE: Self = Self {
        bold: false,
        italic: false,
        underline: true,
        strikethrough: false,
    };
    pub const STRIKETHROUGH: Self = Self {
        bold: false,
        italic: false,
        underline: false,
        strikethrough: true,
    };

    /// Combine two sets of flags.
    pub fn union(self, other: Self) -> Self {
        Self {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            strikethrough: self.strikethrough || other.strikethrough,
        }
    }

    /// Whether any flag is set.
    pub fn any(self) -> bool {
        self.bold || self.italic || self.underline || self.strikethrough
    }
}

const BOLD_ITALIC: FormatFlags = FormatFlags {
    bold: true,
    italic: true,
    underline: false,
    strikethrough: false,
};
const BOLD_UNDERLINE: FormatFlags = FormatFlags {
    bold: true,
    italic: false,
    underline: true,
    strikethrough: false,
};

/// A formatting span over the cleaned text.
///
/// Hints may nest (`**a *b* c**` yields an outer bold hint and an inner
/// italic hint); flags compose by union wherever spans overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatHint {
    pub start: usize,
    pub end: usize,
    pub flags: FormatFlags,
}

/// The result of stripping formatting markers.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedText {
    /// The text with all recognized markers removed.
    pub text: String,
    /// Formatting spans, offsets into `text`.
    pub hints: Vec<FormatHint>,
}

struct Pattern {
    regex: Regex,
    flags: FormatFlags,
}

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    let mut patterns = Vec::new();
    let tag_flags = [
        ("b", FormatFlags::BOLD),
        ("strong", FormatFlags::BOLD),
        ("i", FormatFlags::ITALIC),
        ("em", FormatFlags::ITALIC),
        ("u", FormatFlags::UNDERLINE),
        ("s", FormatFlags::STRIKETHROUGH),
        ("strike", FormatFlags::STRIKETHROUGH),
        ("del", FormatFlags::STRIKETHROUGH),
    ];
    // HTML tags, then their HTML-escaped forms, then Markdown delimiters.
    for (tag, flags) in tag_flags {
        patterns.push(Pattern {
            regex: Regex::new(&format!("(?is)<{tag}>(.*?)</{tag}>")).expect("static pattern"),
            flags,
        });
    }
    for (tag, flags) in tag_flags {
        patterns.push(Pattern {
            regex: Regex::new(&format!("(?is)&lt;{tag}&gt;(.*?)&lt;/{tag}&gt;"))
                .expect("static pattern"),
            flags,
        });
    }
    let markdown: [(&str, FormatFlags); 9] = [
        (r"(?s)\*\*\*(.+?)\*\*\*", BOLD_ITALIC),
        (r"(?s)\*\*\+\+(.+?)\+\+\*\*", BOLD_UNDERLINE),
        (r"(?s)\*\*(.+?)\*\*", FormatFlags::BOLD),
        (r"(?s)__(.+?)__", FormatFlags::BOLD),
        (r"(?s)\+\+(.+?)\+\+", FormatFlags::UNDERLINE),
        (r"(?s)~~(.+?)~~", FormatFlags::STRIKETHROUGH),
        (r"~([^~]+?)~", FormatFlags::STRIKETHROUGH),
        (r"\*([^*]+?)\*", FormatFlags::ITALIC),
        (r"_([^_]+?)_", FormatFlags::ITALIC),
    ];
    for (pattern, flags) in markdown {
        patterns.push(Pattern {
            regex: Regex::new(pattern).expect("static pattern"),
            flags,
        });
    }
    patterns
});

#[derive(Debug, Clone, Copy)]
struct RawMatch {
    start: usize,
    end: usize,
    inner_start: usize,
    inner_end: usize,
    flags: FormatFlags,
    priority: usize,
}

/// Strip formatting markers, returning the cleaned text and format hints.
pub fn strip_formatting(text: &str) -> CleanedText {
    let (clean, hints) = process(text);
    CleanedText { text: clean, hints }
}

fn process(text: &str) -> (String, Vec<FormatHint>) {
    let matches = top_level_matches(text);
    if matches.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let mut clean = String::new();
    let mut hints = Vec::new();
    let mut pos = 0;
    for m in matches {
        clean.push_str(&text[pos..m.start]);
        let (inner_clean, inner_hints) = process(&text[m.inner_start..m.inner_end]);
        let base = clean.len();
        hints.push(FormatHint {
            start: base,
            end: base + inner_clean.len(),
            flags: m.flags,
        });
        // Descendant hints are rebased into the outer scope.
        for h in inner_hints {
            hints.push(FormatHint {
                start: base + h.start,
                end: base + h.end,
                flags: h.flags,
            });
        }
        clean.push_str(&inner_clean);
        pos = m.end;
    }
    clean.push_str(&text[pos..]);
    (clean, hints)
}

/// Find all pattern matches and keep only the top-level ones.
///
/// Matches are sorted by (start asc, end desc, pattern priority) and swept
/// with a monotonic end cursor, so the earliest-starting, longest match
/// wins and anything overlapping it is handled by recursion instead.
fn top_level_matches(text: &str) -> Vec<RawMatch> {
    let mut matches = Vec::new();
    for (priority, pattern) in PATTERNS.iter().enumerate() {
        for caps in pattern.regex.captures_iter(text) {
            let whole = caps.get(0).expect("match group 0");
            let inner = caps.get(1).expect("match group 1");
            matches.push(RawMatch {
                start: whole.start(),
                end: whole.end(),
                inner_start: inner.start(),
                inner_end: inner.end(),
                flags: pattern.flags,
                priority,
            });
        }
    }
    matches.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.end.cmp(&a.end))
            .then(a.priority.cmp(&b.priority))
    });

    let mut kept = Vec::new();
    let mut last_end = 0;
    for m in matches {
        if m.start >= last_end {
            last_end = m.end;
            kept.push(m);
        }
    }
    kept
}
