//! Scoring of hybrid retrieval strategies.
//!
//! Two evaluations are provided:
//!
//! - **Result evaluation** ([`batch::PlanOutputEvaluator`]): runs gold and
//!   generated queries, maps differing column names with a chat model, and
//!   scores rows, columns and order ([`metrics`]). Results go to a CSV
//!   report with a trailing `avg` row ([`report`]).
//! - **Nugget evaluation** ([`nugget::NuggetEvaluator`]): splits reference
//!   answers into claims and checks free-text answers against them.
//!
//! # Example
//!
//! ```rust
//! use hybridkg_eval::dataset::EvalConfig;
//! use hybridkg_eval::metrics::calc_row_metrics;
//! use serde_json::json;
//!
//! let gold = vec![json!({"name": "Alice", "age": 30}).as_object().cloned().unwrap()];
//! let metrics = calc_row_metrics(&gold, &gold, &EvalConfig::default());
//! assert_eq!(metrics.precision_all, 1.0);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alias;
pub mod batch;
pub mod dataset;
pub mod metrics;
pub mod nugget;
pub mod report;
pub mod run;

pub use batch::{EvaluationReport, PlanOutputEvaluator, QueryGenerator};
pub use dataset::{EvalConfig, GeneratedQuery, GoldQuery, OrderSpec, QaEntry, SortDirection};
pub use metrics::{ColMetrics, Metrics, RowMetrics, calc_col_metrics, calc_row_metrics};
pub use nugget::{
    MatchStatus, Nugget, NuggetEvaluation, NuggetEvaluator, NuggetJudgement, NuggetMatch,
    NuggetMetrics, NuggetStatus, nugget_metrics,
};
pub use run::{RunEntry, answer_questions};
