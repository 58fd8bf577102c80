//! Extended predicate rewriting through the public API.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use test_case::test_case;

use common::RecordingEmbedder;
use hybridkg_core::HybridKgError;
use hybridkg_core::config::RewriterConfig;
use hybridkg_query::rewriter::{ExtendedQueryRewriter, QueryRewriter, expand_extended_predicates};

fn expand(query: &str) -> String {
    expand_extended_predicates(query, &RewriterConfig::default())
        .unwrap()
        .text
}

#[test_case("MATCH (n) RETURN n.id AS id" ; "plain")]
#[test_case("MATCH (c:Component) WHERE c.name STARTS WITH 'Hyd' RETURN c.name" ; "starts with")]
#[test_case("MATCH (c) WHERE c.note = \"uses FUZZY_MATCH(a, 'b')\" RETURN c" ; "predicate inside literal")]
#[test_case("MATCH (a) RETURN a.x AS x\nUNION ALL\nMATCH (b) RETURN b.x AS x" ; "union without predicates")]
#[test_case("MATCH (c)\n  WHERE c.rpn > 100\n  RETURN c.rpn\n  ORDER BY c.rpn DESC LIMIT 5" ; "multiline")]
fn test_queries_without_predicates_are_untouched(query: &str) {
    let expanded = expand_extended_predicates(query, &RewriterConfig::default()).unwrap();
    assert_eq!(expanded.text, query);
    assert!(expanded.pending_vectors.is_empty());
}

#[test_case(1, 0 ; "one in first branch")]
#[test_case(1, 1 ; "one per branch")]
#[test_case(2, 3 ; "several per branch")]
#[test_case(0, 2 ; "only second branch")]
fn test_fuzzy_subqueries_stay_in_their_branch(first: usize, second: usize) {
    let branch = |label: &str, offset: usize, count: usize| {
        let predicates: Vec<String> = (0..count)
            .map(|i| format!("FUZZY_MATCH(x.name, 'phrase {}')", offset + i + 1))
            .collect();
        let filter = if predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicates.join(" OR "))
        };
        format!("MATCH (x:{label}){filter} RETURN x.name AS name")
    };
    let query = format!(
        "{}\nUNION\n{}",
        branch("Component", 0, first),
        branch("SubComponent", first, second)
    );

    let out = expand(&query);
    let total = first + second;
    assert_eq!(out.matches("CALL db.index.fulltext.queryNodes").count(), total);

    let (head, tail) = out.split_once("\nUNION\n").unwrap();
    for n in 1..=total {
        let declared = format!("AS fuzzy_list_{n}\n");
        let used = format!("x.name IN fuzzy_list_{n}");
        let phrase = format!("'phrase~ {n}~'");
        let branch_text = if n <= first { head } else { tail };
        assert_eq!(branch_text.matches(&declared).count(), 1, "{out}");
        assert_eq!(branch_text.matches(&used).count(), 1, "{out}");
        assert!(branch_text.contains(&phrase), "{out}");
        assert_eq!(out.matches(&declared).count(), 1);
    }
    assert!(!out.contains("FUZZY_MATCH"));
}

#[test]
fn test_fuzzy_single_predicate_exact_text() {
    let out = expand(
        "MATCH (s:Subsystem)-[:HAS_COMPONENT]->(c:Component) \
         WHERE FUZZY_MATCH(c.name, 'cabin controls') RETURN c.name AS name",
    );
    assert_eq!(
        out,
        "CALL {\n  CALL db.index.fulltext.queryNodes('entity_text_index', 'cabin~ controls~') YIELD node, score\n  WHERE score > 0.5\n  RETURN collect(node.name) AS fuzzy_list_1\n}\n\
         MATCH (s:Subsystem)-[:HAS_COMPONENT]->(c:Component) WHERE c.name IN fuzzy_list_1 RETURN c.name AS name"
    );
}

#[test]
fn test_semantic_single_predicate_exact_text() {
    let out = expand(
        "MATCH (fm:FailureMode)-[:CAUSED_BY]->(fc:FailureCause) \
         WHERE SEMANTIC_MATCH(fc.description, 'water ingress') RETURN fm.description",
    );
    assert_eq!(
        out,
        "MATCH (fm:FailureMode)-[:CAUSED_BY]->(fc:FailureCause) \
         WITH *, vector.similarity.cosine(fc.embedding, $vector_1) AS similarity_1 \
         WHERE similarity_1 > 0.6418 RETURN fm.description"
    );
}

#[test_case("IS_FUZZY_MATCH" ; "is prefix")]
#[test_case("fuzzy_match" ; "lower case")]
fn test_fuzzy_synonyms(name: &str) {
    let out = expand(&format!(
        "MATCH (c:Component) WHERE {name}(c.name, 'pump') RETURN c.name"
    ));
    assert!(out.contains("WHERE c.name IN fuzzy_list_1"));
    assert!(out.contains("'pump~'"));
}

#[test]
fn test_semantic_synonym() {
    let out = expand(
        "MATCH (fm:FailureMode) WHERE IS_SEMANTIC_MATCH(fm.description, 'corrosion') RETURN fm.rpn",
    );
    assert!(out.contains("WHERE similarity_1 > 0.6418 RETURN fm.rpn"));
}

#[test]
fn test_each_where_gets_its_own_projection() {
    let out = expand(
        "MATCH (fm:FailureMode) WHERE SEMANTIC_MATCH(fm.description, 'leak') \
         WITH fm MATCH (fm)-[:HAS_EFFECT]->(fe:FailureEffect) \
         WHERE SEMANTIC_MATCH(fe.description, 'fire') RETURN fe.description",
    );
    assert_eq!(out.matches("WITH *, ").count(), 2);
    let first = out.find("AS similarity_1").unwrap();
    let second = out.find("AS similarity_2").unwrap();
    assert!(first < second);
    assert!(out.contains("WHERE similarity_2 > 0.6418 RETURN fe.description"));
}

#[test]
fn test_configured_thresholds_are_used() {
    let config = RewriterConfig::default()
        .with_fuzzy_threshold(0.8)
        .with_semantic_threshold(0.75)
        .with_fulltext_index("fmea_text");
    let expanded = expand_extended_predicates(
        "MATCH (c:Component)-[:HAS_SUB_COMPONENT]->(s:SubComponent)-[:HAS_FAILURE_MODE]->(fm:FailureMode) \
         WHERE FUZZY_MATCH(c.name, 'pump') AND SEMANTIC_MATCH(fm.description, 'seal leak') RETURN s.name",
        &config,
    )
    .unwrap();

    assert!(expanded.text.contains("queryNodes('fmea_text', 'pump~')"));
    assert!(expanded.text.contains("WHERE score > 0.8"));
    assert!(expanded.text.contains("c.name IN fuzzy_list_1 AND similarity_1 > 0.75"));
    assert_eq!(expanded.pending_vectors.len(), 1);
    assert_eq!(expanded.pending_vectors[0].phrase, "seal leak");
}

#[test]
fn test_apostrophe_in_comment_does_not_hide_predicates() {
    let out = expand(
        "// driver's side\nMATCH (c:Component) /* can't be empty */\n\
         WHERE FUZZY_MATCH(c.name, 'door') RETURN c.name",
    );
    assert!(out.starts_with("// driver's side\nCALL {"), "{out}");
    assert!(out.contains("WHERE c.name IN fuzzy_list_1 RETURN c.name"), "{out}");
    assert!(!out.contains("FUZZY_MATCH"));
}

#[test_case("MATCH (c) WHERE FUZZY_MATCH(c.name) RETURN c" ; "one argument")]
#[test_case("MATCH (c) WHERE FUZZY_MATCH(c.name, 'a', 'b') RETURN c" ; "three arguments")]
#[test_case("MATCH (c) WHERE FUZZY_MATCH(c.name, pump) RETURN c" ; "unquoted phrase")]
#[test_case("MATCH (c) WHERE FUZZY_MATCH(c.name, 'pump' RETURN c" ; "unbalanced")]
#[test_case("MATCH (c) WHERE SEMANTIC_MATCH(, 'leak') RETURN c" ; "empty target")]
#[test_case("MATCH (c) RETURN SEMANTIC_MATCH(c.description, 'leak')" ; "semantic outside where")]
#[test_case("MATCH (c) WHERE FUZZY_MATCH(toLower(c.name), 'cabin controls') RETURN c" ; "wrapped fuzzy target")]
#[test_case("MATCH (fm) WHERE SEMANTIC_MATCH(toLower(fm.description), 'leak') RETURN fm" ; "wrapped semantic target")]
#[test_case("MATCH (fm:FailureMode WHERE SEMANTIC_MATCH(fm.description, 'corrosion')) RETURN fm.rpn" ; "semantic in pattern where")]
fn test_malformed_predicates_are_rejected(query: &str) {
    let err = expand_extended_predicates(query, &RewriterConfig::default()).unwrap_err();
    assert!(matches!(err, HybridKgError::Validation { .. }), "{err}");
}

#[tokio::test]
async fn test_rewriter_embeds_unquoted_phrases() {
    let embedder = Arc::new(RecordingEmbedder::default());
    let rewriter = ExtendedQueryRewriter::new(embedder.clone());

    let rewritten = rewriter
        .rewrite(
            "MATCH (fm:FailureMode) WHERE SEMANTIC_MATCH(fm.description, 'driver\\'s seat (left)') \
             RETURN fm.description",
        )
        .await
        .unwrap();

    assert_eq!(
        *embedder.texts.lock().unwrap(),
        vec!["driver's seat (left)".to_string()]
    );
    assert_eq!(rewritten.params["vector_1"], json!([0.6f32, 0.8f32]));
    assert!(!rewritten.text.contains("SEMANTIC_MATCH"));
}
