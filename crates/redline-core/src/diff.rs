//! Word-level diffing with offset tracking.
//!
//! Both strings are tokenized into alternating runs of non-space and space
//! characters, then diffed token-wise with Myers. Operating on whole tokens
//! keeps every edit boundary on a word edge, which is what makes run
//! splitting and formatting inheritance behave the way Word users expect.
//! The token ops are projected back to byte offsets over the original text,
//! and a semantic-cleanup pass factors the common character prefix and
//! suffix out of every delete+insert pair, so `"Hello"` → `"Hello, world"`
//! surfaces as an equality plus an insertion of `", world"` rather than a
//! wholesale replacement.

use similar::{Algorithm, DiffOp as TokenOp, capture_diff_slices};

/// The kind of a diff operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Equal,
    Delete,
    Insert,
}

/// One diff operation.
///
/// `start..end` index the original text; for `Insert` the range is empty
/// (insertions span no original text) and `new_start` locates the inserted
/// text inside the new string.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOp {
    pub kind: DiffKind,
    pub start: usize,
    pub end: usize,
    /// Byte offset of `text` within the new string.
    pub new_start: usize,
    pub text: String,
}

/// Compute a word-level diff whose offsets over `original` form a partition.
pub fn diff_words(original: &str, new: &str) -> Vec<DiffOp> {
    // Degenerate inputs short-circuit to a single op.
    if original == new {
        return vec![DiffOp {
            kind: DiffKind::Equal,
            start: 0,
            end: original.len(),
            new_start: 0,
            text: original.to_string(),
        }];
    }
    if original.is_empty() {
        return vec![DiffOp {
            kind: DiffKind::Insert,
            start: 0,
            end: 0,
            new_start: 0,
            text: new.to_string(),
        }];
    }
    if new.is_empty() {
        return vec![DiffOp {
            kind: DiffKind::Delete,
            start: 0,
            end: original.len(),
            new_start: 0,
            text: original.to_string(),
        }];
    }

    let old_tokens = tokenize(original);
    let new_tokens = tokenize(new);
    let old_starts = token_starts(&old_tokens);
    let new_starts = token_starts(&new_tokens);

    let mut ops = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_tokens, &new_tokens) {
        match op {
            TokenOp::Equal {
                old_index,
                new_index,
                len,
            } => {
                let (start, end) = (old_starts[old_index], old_starts[old_index + len]);
                ops.push(DiffOp {
                    kind: DiffKind::Equal,
                    start,
                    end,
                    new_start: new_starts[new_index],
                    text: original[start..end].to_string(),
                });
            }
            TokenOp::Delete {
                old_index,
                old_len,
                new_index,
            } => {
                push_delete(
                    &mut ops,
                    original,
                    old_starts[old_index],
                    old_starts[old_index + old_len],
                    new_starts[new_index],
                );
            }
            TokenOp::Insert {
                old_index,
                new_index,
                new_len,
            } => {
                push_insert(
                    &mut ops,
                    new,
                    old_starts[old_index],
                    new_starts[new_index],
                    new_starts[new_index + new_len],
                );
            }
            TokenOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                // A replacement is a delete followed by an insert anchored
                // at the end of the deleted range.
                let del_end = old_starts[old_index + old_len];
                push_delete(
                    &mut ops,
                    original,
                    old_starts[old_index],
                    del_end,
                    new_starts[new_index],
                );
                push_insert(
                    &mut ops,
                    new,
                    del_end,
                    new_starts[new_index],
                    new_starts[new_index + new_len],
                );
            }
        }
    }
    factor_replacements(ops)
}

/// Factor common character prefixes/suffixes out of delete+insert pairs.
///
/// Token-wise Myers reports `"Hello"` → `"Hello,"` as a replacement of the
/// whole token. The shared `"Hello"` must survive as an equality or the
/// patcher would strike text the caller never touched.
fn factor_replacements(ops: Vec<DiffOp>) -> Vec<DiffOp> {
    let mut out: Vec<DiffOp> = Vec::new();
    let mut iter = ops.into_iter().peekable();
    while let Some(op) = iter.next() {
        let is_replace_pair = op.kind == DiffKind::Delete
            && iter
                .peek()
                .is_some_and(|next| next.kind == DiffKind::Insert && next.start == op.end);
        if !is_replace_pair {
            out.push(op);
            continue;
        }
        let del = op;
        let ins = iter.next().expect("peeked insert");

        let prefix = common_prefix_len(&del.text, &ins.text);
        let suffix = common_suffix_len(&del.text[prefix..], &ins.text[prefix..]);
        let del_len = del.text.len();
        let ins_len = ins.text.len();

        if prefix > 0 {
            out.push(DiffOp {
                kind: DiffKind::Equal,
                start: del.start,
                end: del.start + prefix,
                new_start: ins.new_start,
                text: del.text[..prefix].to_string(),
            });
        }
        if prefix + suffix < del_len {
            out.push(DiffOp {
                kind: DiffKind::Delete,
                start: del.start + prefix,
                end: del.end - suffix,
                new_start: ins.new_start + prefix,
                text: del.text[prefix..del_len - suffix].to_string(),
            });
        }
        if prefix + suffix < ins_len {
            out.push(DiffOp {
                kind: DiffKind::Insert,
                start: del.end - suffix,
                end: del.end - suffix,
                new_start: ins.new_start + prefix,
                text: ins.text[prefix..ins_len - suffix].to_string(),
            });
        }
        if suffix > 0 {
            out.push(DiffOp {
                kind: DiffKind::Equal,
                start: del.end - suffix,
                end: del.end,
                new_start: ins.new_start + ins_len - suffix,
                text: del.text[del_len - suffix..].to_string(),
            });
        }
    }
    out
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        len += ca.len_utf8();
    }
    len
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().rev().zip(b.chars().rev()) {
        if ca != cb {
            break;
        }
        len += ca.len_utf8();
    }
    len
}

fn push_delete(ops: &mut Vec<DiffOp>, original: &str, start: usize, end: usize, new_start: usize) {
    if let Some(DiffOp {
        kind: DiffKind::Delete,
        end: prev_end,
        text,
        ..
    }) = ops.last_mut()
        && *prev_end == start
    {
        *prev_end = end;
        text.push_str(&original[start..end]);
        return;
    }
    ops.push(DiffOp {
        kind: DiffKind::Delete,
        start,
        end,
        new_start,
        text: original[start..end].to_string(),
    });
}

fn push_insert(ops: &mut Vec<DiffOp>, new: &str, at: usize, new_start: usize, new_end: usize) {
    if let Some(DiffOp {
        kind: DiffKind::Insert,
        start,
        text,
        ..
    }) = ops.last_mut()
        && *start == at
    {
        text.push_str(&new[new_start..new_end]);
        return;
    }
    ops.push(DiffOp {
        kind: DiffKind::Insert,
        start: at,
        end: at,
        new_start,
        text: new[new_start..new_end].to_string(),
    });
}

/// Split into maximal runs of whitespace and non-whitespace characters.
fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut run_start = 0;
    let mut run_is_space: Option<bool> = None;
    for (i, ch) in s.char_indices() {
        let is_space = ch.is_whitespace();
        match run_is_space {
            Some(prev) if prev == is_space => {}
            Some(_) => {
                tokens.push(&s[run_start..i]);
                run_start = i;
                run_is_space = Some(is_space);
            }
            None => run_is_space = Some(is_space),
        }
    }
    if run_is_space.is_some() {
        tokens.push(&s[run_start..]);
    }
    tokens
}

/// Byte offset of each token, plus the final end offset.
fn token_starts(tokens: &[&str]) -> Vec<usize> {
    let mut starts = Vec::with_capacity(tokens.len() + 1);
    let mut offset = 0;
    for token in tokens {
        starts.push(offset);
        offset += token.len();
    }
    starts.push(offset);
    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn concat_original(ops: &[DiffOp]) -> String {
        ops.iter()
            .filter(|op| op.kind != DiffKind::Insert)
            .map(|op| op.text.as_str())
            .collect()
    }

    fn concat_new(ops: &[DiffOp]) -> String {
        ops.iter()
            .filter(|op| op.kind != DiffKind::Delete)
            .map(|op| op.text.as_str())
            .collect()
    }

    #[test]
    fn test_equal_strings_short_circuit() {
        let ops = diff_words("Hello world", "Hello world");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, DiffKind::Equal);
        assert_eq!(ops[0].text, "Hello world");
    }

    #[test]
    fn test_empty_original_short_circuit() {
        let ops = diff_words("", "Hello");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, DiffKind::Insert);
        assert_eq!((ops[0].start, ops[0].end), (0, 0));
    }

    #[test]
    fn test_empty_new_short_circuit() {
        let ops = diff_words("Hello", "");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, DiffKind::Delete);
        assert_eq!((ops[0].start, ops[0].end), (0, 5));
    }

    #[test]
    fn test_pure_append_keeps_shared_prefix() {
        // Token-wise this is a replacement of "Hello" by "Hello,"; the
        // cleanup pass must surface the shared prefix as an equality.
        let ops = diff_words("Hello", "Hello, world");
        let kinds: Vec<DiffKind> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(kinds, vec![DiffKind::Equal, DiffKind::Insert]);
        assert_eq!(ops[0].text, "Hello");
        assert_eq!(ops[1].text, ", world");
        assert_eq!((ops[1].start, ops[1].end), (5, 5));
    }

    #[test]
    fn test_shared_suffix_survives_replacement() {
        let ops = diff_words("cat", "hat");
        let kinds: Vec<DiffKind> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![DiffKind::Delete, DiffKind::Insert, DiffKind::Equal]
        );
        assert_eq!(ops[0].text, "c");
        assert_eq!(ops[1].text, "h");
        assert_eq!(ops[2].text, "at");
        assert_eq!((ops[2].start, ops[2].end), (1, 3));
    }

    #[test]
    fn test_pure_tail_delete() {
        let ops = diff_words("Hello, world", "Hello,");
        assert_eq!(concat_original(&ops), "Hello, world");
        assert_eq!(concat_new(&ops), "Hello,");
        let delete = ops.iter().find(|op| op.kind == DiffKind::Delete).unwrap();
        assert_eq!(delete.text, " world");
        assert_eq!((delete.start, delete.end), (6, 12));
    }

    #[test]
    fn test_replace_emits_delete_then_insert() {
        let ops = diff_words("Hello world", "Hello moon");
        let kinds: Vec<DiffKind> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![DiffKind::Equal, DiffKind::Delete, DiffKind::Insert]
        );
        assert_eq!(ops[1].text, "world");
        assert_eq!(ops[2].text, "moon");
        // The insert is anchored at the end of the deleted range.
        assert_eq!(ops[2].start, ops[1].end);
        assert_eq!(ops[2].start, ops[2].end);
    }

    #[test]
    fn test_word_level_not_char_level() {
        // A changed word is replaced wholesale, not patched per-character.
        let ops = diff_words("the cat sat", "the dog sat");
        let delete = ops.iter().find(|op| op.kind == DiffKind::Delete).unwrap();
        assert_eq!(delete.text, "cat");
    }

    #[test]
    fn test_insert_tracks_new_offsets() {
        let ops = diff_words("Hello world", "Hello brave world");
        let insert = ops.iter().find(|op| op.kind == DiffKind::Insert).unwrap();
        assert_eq!(insert.text, "brave ");
        assert_eq!(&"Hello brave world"[insert.new_start..], "brave world");
    }

    #[test]
    fn test_non_insert_ops_partition_original() {
        let ops = diff_words("a b c d", "a x c");
        let mut cursor = 0;
        for op in ops.iter().filter(|op| op.kind != DiffKind::Insert) {
            assert_eq!(op.start, cursor);
            cursor = op.end;
        }
        assert_eq!(cursor, "a b c d".len());
    }

    proptest! {
        #[test]
        fn prop_diff_partition(
            original in "[ab ]{0,24}",
            new in "[ab ]{0,24}",
        ) {
            let ops = diff_words(&original, &new);
            prop_assert_eq!(concat_original(&ops), original.clone());
            prop_assert_eq!(concat_new(&ops), new.clone());
            // Insertions span no original text.
            for op in ops.iter().filter(|op| op.kind == DiffKind::Insert) {
                prop_assert_eq!(op.start, op.end);
            }
        }
    }
}
