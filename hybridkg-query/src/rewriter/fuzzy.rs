//! `FUZZY_MATCH` expansion into full-text index subqueries.

use hybridkg_core::config::RewriterConfig;
use hybridkg_core::{HybridKgError, Result};

use super::clauses::{apply_edits, union_branches};
use super::literals::mask_literals;
use super::predicate::{Predicate, PredicateKind, find_predicates};

/// Characters with meaning in the full-text query syntax.
const LUCENE_SPECIAL: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

/// Build the full-text query expression for a phrase: every whitespace
/// separated token gets the fuzzy suffix.
///
/// The result is ready to sit inside a single-quoted query literal.
pub(crate) fn fulltext_expression(phrase: &str, suffix: &str) -> String {
    phrase
        .split_whitespace()
        .map(|token| {
            let mut escaped = String::with_capacity(token.len() + suffix.len());
            for ch in token.chars() {
                if LUCENE_SPECIAL.contains(&ch) {
                    // One backslash for the index, escaped once for the literal.
                    escaped.push_str("\\\\");
                } else if ch == '\'' {
                    escaped.push('\\');
                }
                escaped.push(ch);
            }
            escaped.push_str(suffix);
            escaped
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn subquery(predicate: &Predicate, number: usize, config: &RewriterConfig) -> String {
    let collected = predicate
        .property()
        .map_or_else(|| "node".to_string(), |property| format!("node.{property}"));
    format!(
        "CALL {{\n  CALL db.index.fulltext.queryNodes('{index}', '{expression}') YIELD node, score\n  WHERE score > {threshold}\n  RETURN collect({collected}) AS fuzzy_list_{number}\n}}",
        index = config.fulltext_index,
        expression = fulltext_expression(&predicate.phrase, &config.fuzzy_suffix),
        threshold = config.fuzzy_threshold,
    )
}

/// Replace every `FUZZY_MATCH(target, 'phrase')` with `target IN fuzzy_list_<n>`
/// and prepend the subquery computing each list to the UNION branch that
/// uses it.
///
/// Lists are numbered from `1` in source order across the whole query.
/// `text` must already have literal parentheses escaped.
pub(crate) fn expand_fuzzy(text: &str, config: &RewriterConfig) -> Result<String> {
    let predicates = find_predicates(text, PredicateKind::Fuzzy)?;
    if predicates.is_empty() {
        return Ok(text.to_string());
    }

    let masked = mask_literals(text);
    let mut edits = Vec::with_capacity(predicates.len() + 1);
    let mut number = 0;

    for branch in union_branches(&masked) {
        let mut subqueries = Vec::new();
        for predicate in predicates
            .iter()
            .filter(|p| branch.contains(&p.range.start))
        {
            if predicate.phrase.split_whitespace().next().is_none() {
                return Err(HybridKgError::validation(
                    "FUZZY_MATCH phrase must contain at least one token",
                ));
            }
            number += 1;
            subqueries.push(subquery(predicate, number, config));
            edits.push((
                predicate.range.clone(),
                format!("{} IN fuzzy_list_{number}", predicate.target),
            ));
        }

        if !subqueries.is_empty() {
            let leading = masked[branch.clone()].len() - masked[branch.clone()].trim_start().len();
            let at = branch.start + leading;
            edits.push((at..at, format!("{}\n", subqueries.join("\n"))));
        }
    }

    Ok(apply_edits(text, edits))
}
