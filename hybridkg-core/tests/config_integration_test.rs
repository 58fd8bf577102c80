//! Integration tests for configuration loading.

use hybridkg_core::config::{Backoff, HybridKgConfig};
use hybridkg_core::HybridKgError;
use std::io::Write;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_load_config_file_with_defaults_and_placeholders() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "rewriter": {{
                "semantic_threshold": 0.7,
                "fulltext_index": "${{HYBRIDKG_TEST_UNSET_INDEX:fmea_text}}"
            }},
            "executor": {{ "vector_top_k": 10, "call_timeout_seconds": 30 }},
            "retry": {{ "max_retries": 2, "delay_ms": 100, "backoff": "exponential" }},
            "llm": {{ "provider": "openai", "model": "gpt-4o", "api_key": "sk-test" }}
        }}"#
    )
    .unwrap();

    let config = HybridKgConfig::from_json_file(file.path()).await.unwrap();

    assert_eq!(config.rewriter.fulltext_index, "fmea_text");
    assert!((config.rewriter.semantic_threshold - 0.7).abs() < f32::EPSILON);
    assert!((config.rewriter.fuzzy_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.executor.vector_top_k, Some(10));
    assert_eq!(config.executor.id_field, "id");
    assert_eq!(config.retry.backoff, Backoff::Exponential);
    assert_eq!(config.evaluation.execution_error_prefix, "EXECUTION ERROR");
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_missing_file_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = HybridKgConfig::from_json_file(dir.path().join("absent.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, HybridKgError::Configuration { .. }));
}

#[tokio::test]
async fn test_invalid_section_is_rejected_by_validate() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "executor": {{ "vector_top_k": 0 }} }}"#).unwrap();

    let config = HybridKgConfig::from_json_file(file.path()).await.unwrap();
    assert!(config.validate().is_err());
}
