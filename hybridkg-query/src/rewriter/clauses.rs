//! Clause boundaries in masked query text.
//!
//! All functions here take text already passed through
//! [`mask_literals`](super::literals::mask_literals), so keywords inside
//! string literals are invisible.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static CLAUSE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(WHERE|RETURN|WITH|ORDER\s+BY|SKIP|LIMIT|OPTIONAL\s+MATCH|MATCH|UNWIND|CALL|CREATE|MERGE|SET|DETACH\s+DELETE|DELETE|REMOVE|FOREACH|LOAD|UNION(?:\s+ALL)?)\b",
    )
    .expect("valid clause pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    Where,
    Union,
    Other,
}

#[derive(Debug, Clone)]
struct Clause {
    kind: ClauseKind,
    start: usize,
    end: usize,
    depth: usize,
}

/// Bracket nesting level at every byte.
///
/// Opening brackets carry the level outside them and closing brackets the
/// level after them, so a closing bracket sits below the content it ends.
fn nesting_levels(masked: &str) -> Vec<usize> {
    let mut depth = 0_usize;
    masked
        .bytes()
        .map(|byte| match byte {
            b'(' | b'[' | b'{' => {
                depth += 1;
                depth - 1
            }
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                depth
            }
            _ => depth,
        })
        .collect()
}

/// Whether the word before `offset` is `STARTS` or `ENDS`.
fn follows_string_operator(masked: &str, offset: usize) -> bool {
    let before = masked[..offset].trim_end();
    let word_start = before
        .rfind(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .map_or(0, |index| index + 1);
    let word = &before[word_start..];
    word.eq_ignore_ascii_case("STARTS") || word.eq_ignore_ascii_case("ENDS")
}

fn clauses(masked: &str, levels: &[usize]) -> Vec<Clause> {
    CLAUSE_REGEX
        .find_iter(masked)
        .filter(|found| {
            // Property access and parameters share names with keywords.
            let preceding = masked[..found.start()].chars().next_back();
            !matches!(preceding, Some('.' | '$'))
        })
        .filter_map(|found| {
            let keyword = found.as_str();
            let kind = if keyword.eq_ignore_ascii_case("WHERE") {
                ClauseKind::Where
            } else if keyword.get(..5).is_some_and(|head| head.eq_ignore_ascii_case("UNION")) {
                ClauseKind::Union
            } else if keyword.eq_ignore_ascii_case("WITH")
                && follows_string_operator(masked, found.start())
            {
                return None;
            } else {
                ClauseKind::Other
            };
            Some(Clause {
                kind,
                start: found.start(),
                end: found.end(),
                depth: levels[found.start()],
            })
        })
        .collect()
}

/// Byte ranges of the top-level UNION branches, in source order.
///
/// A query without a top-level UNION is a single branch spanning the whole
/// text. UNIONs nested in subqueries do not split.
pub(crate) fn union_branches(masked: &str) -> Vec<Range<usize>> {
    let levels = nesting_levels(masked);
    let mut branches = Vec::new();
    let mut start = 0;
    for clause in clauses(masked, &levels) {
        if clause.kind == ClauseKind::Union && clause.depth == 0 {
            branches.push(start..clause.start);
            start = clause.end;
        }
    }
    branches.push(start..masked.len());
    branches
}

/// Byte ranges of every `WHERE ...` span, in source order.
///
/// A span starts at its `WHERE` keyword and ends before the next clause
/// keyword at the same nesting level, before the bracket closing the
/// enclosing subquery, or at the end of text. Trailing whitespace is
/// excluded. `STARTS WITH` and `ENDS WITH` do not end a span.
pub(crate) fn where_spans(masked: &str) -> Vec<Range<usize>> {
    let levels = nesting_levels(masked);
    let clauses = clauses(masked, &levels);
    let bytes = masked.as_bytes();

    clauses
        .iter()
        .enumerate()
        .filter(|(_, clause)| clause.kind == ClauseKind::Where)
        .map(|(index, clause)| {
            let next_clause = clauses[index + 1..]
                .iter()
                .find(|next| next.depth == clause.depth)
                .map_or(masked.len(), |next| next.start);
            let closing = (clause.end..masked.len())
                .find(|&offset| levels[offset] < clause.depth)
                .unwrap_or(masked.len());

            let mut end = next_clause.min(closing);
            while end > clause.start && bytes[end - 1].is_ascii_whitespace() {
                end -= 1;
            }
            clause.start..end
        })
        .collect()
}

/// Apply `(range, replacement)` edits to `text`.
///
/// Ranges must not overlap. Empty ranges insert.
pub(crate) fn apply_edits(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start).then(b.0.end.cmp(&a.0.end)));
    let mut out = text.to_string();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}
