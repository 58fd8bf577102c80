//! `SEMANTIC_MATCH` expansion into similarity projections.

use hybridkg_core::config::RewriterConfig;
use hybridkg_core::{HybridKgError, Result};

use super::clauses::{apply_edits, where_spans};
use super::literals::mask_literals;
use super::predicate::{PredicateKind, find_predicates};

/// A query parameter that must be bound to the embedding of a phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVector {
    /// Parameter name without the `$`, e.g. `vector_1`.
    pub param: String,
    /// Phrase to embed.
    pub phrase: String,
}

/// Replace every `SEMANTIC_MATCH(target, 'phrase')` with
/// `similarity_<n> > threshold`, inserting one
/// `WITH *, sim(entity.embedding, $vector_<n>) AS similarity_<n>, ...`
/// clause before each WHERE span that uses it.
///
/// Numbers start at `1` and continue across spans. Returns the rewritten
/// text and the vectors the caller still has to embed, in number order.
pub(crate) fn expand_semantic(
    text: &str,
    config: &RewriterConfig,
) -> Result<(String, Vec<PendingVector>)> {
    let predicates = find_predicates(text, PredicateKind::Semantic)?;
    if predicates.is_empty() {
        return Ok((text.to_string(), Vec::new()));
    }

    let masked = mask_literals(text);
    let spans = where_spans(&masked);
    let mut per_span: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
    for (index, predicate) in predicates.iter().enumerate() {
        // Innermost enclosing span wins for nested subqueries.
        let span = spans
            .iter()
            .enumerate()
            .filter(|(_, span)| {
                span.start <= predicate.range.start && predicate.range.end <= span.end
            })
            .min_by_key(|(_, span)| span.len())
            .map(|(span_index, _)| span_index)
            .ok_or_else(|| {
                HybridKgError::validation("SEMANTIC_MATCH is only supported inside a WHERE clause")
            })?;
        per_span[span].push(index);
    }

    let mut edits = Vec::new();
    let mut pending = Vec::new();
    for (span, members) in spans.iter().zip(&per_span) {
        if members.is_empty() {
            continue;
        }
        // Pattern and list-comprehension WHEREs cannot be preceded by WITH.
        let closer = masked[span.end..].trim_start().chars().next();
        if matches!(closer, Some(')' | ']')) {
            return Err(HybridKgError::validation(
                "SEMANTIC_MATCH is only supported in a clause-level WHERE, not inside a pattern or list",
            ));
        }
        let mut projections = Vec::with_capacity(members.len());
        for &index in members {
            let predicate = &predicates[index];
            let number = pending.len() + 1;
            let param = format!("vector_{number}");
            projections.push(format!(
                "{function}({entity}.{property}, ${param}) AS similarity_{number}",
                function = config.similarity_function,
                entity = predicate.entity(),
                property = config.embedding_property,
            ));
            edits.push((
                predicate.range.clone(),
                format!("similarity_{number} > {}", config.semantic_threshold),
            ));
            pending.push(PendingVector {
                param,
                phrase: predicate.phrase.clone(),
            });
        }
        edits.push((
            span.start..span.start,
            format!("WITH *, {} ", projections.join(", ")),
        ));
    }

    Ok((apply_edits(text, edits), pending))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_semantic_match() {
        let query = "MATCH (fm:FailureMode) WHERE SEMANTIC_MATCH(fm.description, 'corrosion') RETURN fm.description";
        let (out, pending) = expand_semantic(query, &RewriterConfig::default()).unwrap();

        assert_eq!(
            out,
            "MATCH (fm:FailureMode) WITH *, vector.similarity.cosine(fm.embedding, $vector_1) AS similarity_1 \
             WHERE similarity_1 > 0.6418 RETURN fm.description"
        );
        assert_eq!(
            pending,
            vec![PendingVector {
                param: "vector_1".to_string(),
                phrase: "corrosion".to_string()
            }]
        );
    }

    #[test]
    fn test_two_matches_in_one_span_share_one_with() {
        let query = "MATCH (fm:FailureMode)-[:HAS_EFFECT]->(fe:FailureEffect) \
                     WHERE SEMANTIC_MATCH(fm.description, 'leak') AND SEMANTIC_MATCH(fe.description, 'fire') \
                     RETURN fm.description";
        let (out, pending) = expand_semantic(query, &RewriterConfig::default()).unwrap();

        assert!(out.contains(
            "WITH *, vector.similarity.cosine(fm.embedding, $vector_1) AS similarity_1, \
             vector.similarity.cosine(fe.embedding, $vector_2) AS similarity_2 WHERE"
        ));
        assert!(out.contains("similarity_1 > 0.6418 AND similarity_2 > 0.6418"));
        assert_eq!(out.matches("WITH *").count(), 1);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].phrase, "fire");
    }

    #[test]
    fn test_independent_spans_are_numbered_apart() {
        let query = "MATCH (a:FailureCause) WHERE SEMANTIC_MATCH(a.description, 'wear') RETURN a.description AS d \
                     UNION \
                     MATCH (b:FailureEffect) WHERE SEMANTIC_MATCH(b.description, 'noise') RETURN b.description AS d";
        let (out, pending) = expand_semantic(query, &RewriterConfig::default()).unwrap();

        assert_eq!(out.matches("WITH *").count(), 2);
        assert!(out.contains("(a.embedding, $vector_1) AS similarity_1 WHERE similarity_1 >"));
        assert!(out.contains("(b.embedding, $vector_2) AS similarity_2 WHERE similarity_2 >"));
        assert_eq!(
            pending.iter().map(|p| p.param.as_str()).collect::<Vec<_>>(),
            vec!["vector_1", "vector_2"]
        );
    }

    #[test]
    fn test_configured_threshold_and_function() {
        let config = RewriterConfig::default()
            .with_semantic_threshold(0.8)
            .with_similarity_function("vector.similarity.euclidean");
        let (out, _) = expand_semantic(
            "MATCH (n) WHERE SEMANTIC_MATCH(n.text, 'x') RETURN n",
            &config,
        )
        .unwrap();
        assert!(out.contains("vector.similarity.euclidean(n.embedding, $vector_1)"));
        assert!(out.contains("similarity_1 > 0.8"));
    }

    #[test]
    fn test_semantic_match_in_inline_pattern_where_is_rejected() {
        let query = "MATCH (fm:FailureMode WHERE SEMANTIC_MATCH(fm.description, 'corrosion')) RETURN fm.rpn";
        let err = expand_semantic(query, &RewriterConfig::default()).unwrap_err();
        assert!(matches!(err, HybridKgError::Validation { .. }));

        let listed = "MATCH (c:Component) \
                      RETURN [m IN c.modes WHERE SEMANTIC_MATCH(m.description, 'leak')] AS modes";
        assert!(expand_semantic(listed, &RewriterConfig::default()).is_err());
    }

    #[test]
    fn test_semantic_match_in_exists_subquery_is_allowed() {
        let query = "MATCH (c:Component) WHERE EXISTS { MATCH (c)-[:HAS]->(fm:FailureMode) \
                     WHERE SEMANTIC_MATCH(fm.description, 'leak') } RETURN c.name";
        let (out, pending) = expand_semantic(query, &RewriterConfig::default()).unwrap();
        assert!(out.contains("WITH *, vector.similarity.cosine(fm.embedding, $vector_1) AS similarity_1 WHERE similarity_1 >"));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_semantic_match_outside_where_is_rejected() {
        let query = "MATCH (n) RETURN SEMANTIC_MATCH(n.text, 'x')";
        assert!(expand_semantic(query, &RewriterConfig::default()).is_err());
    }
}
