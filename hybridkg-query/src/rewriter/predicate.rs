//! Locating extended predicate calls in query text.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use hybridkg_core::{HybridKgError, Result};

use super::literals::{mask_literals, unescape_parens, unquote};

static PREDICATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:IS_)?(FUZZY|SEMANTIC)_MATCH\s*\(").expect("valid predicate pattern")
});

/// A variable, optionally followed by one property access.
static TARGET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_]\w*(?:\s*\.\s*[A-Za-z_]\w*)?$").expect("valid target pattern")
});

/// Which extended predicate a call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PredicateKind {
    Fuzzy,
    Semantic,
}

impl PredicateKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Fuzzy => "FUZZY_MATCH",
            Self::Semantic => "SEMANTIC_MATCH",
        }
    }
}

/// One `FUZZY_MATCH(target, 'phrase')` or `SEMANTIC_MATCH(...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Predicate {
    pub(crate) kind: PredicateKind,
    /// Byte range of the whole call, name through closing parenthesis.
    pub(crate) range: Range<usize>,
    /// Target expression as written, e.g. `c.name`.
    pub(crate) target: String,
    /// Unquoted phrase with literal parentheses restored.
    pub(crate) phrase: String,
}

impl Predicate {
    /// The variable the target expression hangs off, e.g. `fm` for
    /// `fm.description`.
    pub(crate) fn entity(&self) -> &str {
        self.target.split('.').next().unwrap_or_default().trim()
    }

    /// The property named by the target expression, if any.
    pub(crate) fn property(&self) -> Option<&str> {
        self.target
            .split_once('.')
            .map(|(_, property)| property.trim())
            .filter(|property| !property.is_empty())
    }
}

/// Find every extended predicate call of the given kind in source order.
///
/// `text` must already have literal parentheses escaped.
pub(crate) fn find_predicates(text: &str, kind: PredicateKind) -> Result<Vec<Predicate>> {
    Ok(find_all_predicates(text)?
        .into_iter()
        .filter(|predicate| predicate.kind == kind)
        .collect())
}

/// Find every extended predicate call in source order.
pub(crate) fn find_all_predicates(text: &str) -> Result<Vec<Predicate>> {
    let masked = mask_literals(text);
    let mut predicates = Vec::new();

    for captures in PREDICATE_REGEX.captures_iter(&masked) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let kind = if captures[1].eq_ignore_ascii_case("fuzzy") {
            PredicateKind::Fuzzy
        } else {
            PredicateKind::Semantic
        };

        let open = whole.end() - 1;
        let (close, commas) = matching_close(&masked, open).ok_or_else(|| {
            HybridKgError::validation(format!("unbalanced parentheses in {} call", kind.name()))
        })?;
        let [comma] = commas[..] else {
            return Err(HybridKgError::validation(format!(
                "{} expects a target and a quoted phrase",
                kind.name()
            )));
        };

        let target = text[open + 1..comma].trim();
        if target.is_empty() {
            return Err(HybridKgError::validation(format!(
                "{} is missing its target expression",
                kind.name()
            )));
        }
        if !TARGET_REGEX.is_match(target) {
            return Err(HybridKgError::validation(format!(
                "{} target must be a variable or a `variable.property` access, got `{target}`",
                kind.name()
            )));
        }
        let phrase = unquote(text[comma + 1..close].trim()).ok_or_else(|| {
            HybridKgError::validation(format!(
                "{} expects a quoted phrase as its second argument",
                kind.name()
            ))
        })?;

        predicates.push(Predicate {
            kind,
            range: whole.start()..close + 1,
            target: target.to_string(),
            phrase: unescape_parens(&phrase),
        });
    }

    Ok(predicates)
}

/// Offset of the bracket closing the one at `open`, plus offsets of the
/// commas directly inside it.
fn matching_close(masked: &str, open: usize) -> Option<(usize, Vec<usize>)> {
    let mut depth = 0_usize;
    let mut commas = Vec::new();
    for (offset, byte) in masked.bytes().enumerate().skip(open) {
        match byte {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (byte == b')').then_some((offset, commas));
                }
            }
            b',' if depth == 1 => commas.push(offset),
            _ => {}
        }
    }
    None
}
