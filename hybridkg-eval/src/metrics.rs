//! Result-set scoring.
//!
//! Records are compared as sets of `(field, value)` pairs. Each gold record
//! greedily claims the unmatched generated record sharing the most pairs, and
//! precision/recall are computed over all pairs.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use hybridkg_core::Record;

use crate::dataset::{EvalConfig, SortDirection};

/// Row-level scores of one result set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowMetrics {
    /// Correct pairs over generated pairs.
    pub precision_all: f64,
    /// Correct pairs over gold pairs.
    pub recall_all: f64,
    /// 1.0 when the declared order holds (or none is declared), else 0.0.
    pub order_correctness: f64,
}

/// Field-name scores of one result set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColMetrics {
    /// Shared fields over generated fields.
    pub precision_col: f64,
    /// Shared fields over gold fields.
    pub recall_col: f64,
}

/// All scores of one evaluated question, one CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Question identifier, `avg` for the summary row.
    pub question_id: String,
    /// See [`RowMetrics::precision_all`].
    pub precision_all: f64,
    /// See [`RowMetrics::recall_all`].
    pub recall_all: f64,
    /// See [`ColMetrics::precision_col`].
    pub precision_col: f64,
    /// See [`ColMetrics::recall_col`].
    pub recall_col: f64,
    /// Generated query length over gold query length.
    #[serde(rename = "query_length")]
    pub query_length_ratio: f64,
    /// See [`RowMetrics::order_correctness`].
    pub order_correctness: f64,
}

impl Metrics {
    /// Combine the parts of one question's score.
    pub fn new<S: Into<String>>(
        question_id: S,
        rows: RowMetrics,
        cols: ColMetrics,
        query_length_ratio: f64,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            precision_all: rows.precision_all,
            recall_all: rows.recall_all,
            precision_col: cols.precision_col,
            recall_col: cols.recall_col,
            query_length_ratio,
            order_correctness: rows.order_correctness,
        }
    }

    /// Apply `f` to every numeric field.
    #[must_use]
    pub fn map_values(mut self, f: impl Fn(f64) -> f64) -> Self {
        for value in self.values_mut() {
            *value = f(*value);
        }
        self
    }

    fn values_mut(&mut self) -> [&mut f64; 6] {
        [
            &mut self.precision_all,
            &mut self.recall_all,
            &mut self.precision_col,
            &mut self.recall_col,
            &mut self.query_length_ratio,
            &mut self.order_correctness,
        ]
    }

    fn values(&self) -> [f64; 6] {
        [
            self.precision_all,
            self.recall_all,
            self.precision_col,
            self.recall_col,
            self.query_length_ratio,
            self.order_correctness,
        ]
    }

    /// Mean of every numeric field across `rows`, labelled `question_id`.
    ///
    /// Returns `None` for an empty slice.
    #[allow(clippy::cast_precision_loss)]
    pub fn average<S: Into<String>>(question_id: S, rows: &[Metrics]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let mut sums = [0.0; 6];
        for row in rows {
            for (sum, value) in sums.iter_mut().zip(row.values()) {
                *sum += value;
            }
        }
        let count = rows.len() as f64;
        let [precision_all, recall_all, precision_col, recall_col, query_length_ratio, order_correctness] =
            sums.map(|sum| sum / count);
        Some(Self {
            question_id: question_id.into(),
            precision_all,
            recall_all,
            precision_col,
            recall_col,
            query_length_ratio,
            order_correctness,
        })
    }
}

type PairSet = BTreeSet<(String, String)>;

fn structural_pairs(record: &Record, optional_columns: &[String]) -> PairSet {
    record
        .iter()
        .filter(|(field, _)| !optional_columns.contains(field))
        .map(|(field, value)| (field.clone(), value.to_string()))
        .collect()
}

fn incorrect_optionals(gold: &Record, generated: &Record, optional_columns: &[String]) -> usize {
    optional_columns
        .iter()
        .filter(|column| match (gold.get(*column), generated.get(*column)) {
            (Some(expected), Some(actual)) => expected != actual,
            _ => false,
        })
        .count()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Score `generated` against `gold` row by row.
///
/// Boundary cases: both empty scores 1.0 everywhere; an empty generated set
/// against a non-empty gold set has precision 1.0 and recall 0.0; a
/// non-empty generated set against an empty gold set has precision 0.0 and
/// recall 1.0.
pub fn calc_row_metrics(gold: &[Record], generated: &[Record], config: &EvalConfig) -> RowMetrics {
    let order_correctness = order_correctness(generated, config);

    match (gold.is_empty(), generated.is_empty()) {
        (true, true) => {
            return RowMetrics {
                precision_all: 1.0,
                recall_all: 1.0,
                order_correctness: 1.0,
            };
        }
        (false, true) => {
            return RowMetrics {
                precision_all: 1.0,
                recall_all: 0.0,
                order_correctness,
            };
        }
        (true, false) => {
            return RowMetrics {
                precision_all: 0.0,
                recall_all: 1.0,
                order_correctness,
            };
        }
        (false, false) => {}
    }

    let optional = &config.optional_columns;
    let generated_pairs: Vec<PairSet> = generated
        .iter()
        .map(|record| structural_pairs(record, optional))
        .collect();
    let mut matched = vec![false; generated.len()];

    let mut correct_pairs = 0;
    let mut total_gold_pairs = 0;
    let mut total_predicted_pairs: usize = generated_pairs.iter().map(BTreeSet::len).sum();

    for gold_record in gold {
        let gold_pairs = structural_pairs(gold_record, optional);
        total_gold_pairs += gold_pairs.len();

        let mut best: Option<(usize, usize)> = None;
        for (index, candidate) in generated_pairs.iter().enumerate() {
            if matched[index] {
                continue;
            }
            let shared = gold_pairs.intersection(candidate).count();
            if shared > best.map_or(0, |(_, count)| count) {
                best = Some((index, shared));
            }
        }

        if let Some((index, shared)) = best {
            matched[index] = true;
            correct_pairs += shared;
            let wrong = incorrect_optionals(gold_record, &generated[index], optional);
            total_gold_pairs += wrong;
            total_predicted_pairs += wrong;
        }
    }

    RowMetrics {
        precision_all: ratio(correct_pairs, total_predicted_pairs),
        recall_all: ratio(correct_pairs, total_gold_pairs),
        order_correctness,
    }
}

/// Score field names, ignoring optional columns on both sides.
pub fn calc_col_metrics<G, C>(gold_fields: G, generated_fields: C, optional_columns: &[String]) -> ColMetrics
where
    G: IntoIterator,
    G::Item: AsRef<str>,
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    let keep = |field: &str| !optional_columns.iter().any(|column| column == field);
    let gold: BTreeSet<String> = gold_fields
        .into_iter()
        .filter(|field| keep(field.as_ref()))
        .map(|field| field.as_ref().to_string())
        .collect();
    let generated: BTreeSet<String> = generated_fields
        .into_iter()
        .filter(|field| keep(field.as_ref()))
        .map(|field| field.as_ref().to_string())
        .collect();

    let shared = gold.intersection(&generated).count();
    ColMetrics {
        precision_col: ratio(shared, generated.len()),
        recall_col: ratio(shared, gold.len()),
    }
}

/// 1.0 when `records` already follow the declared order, else 0.0.
///
/// Records missing the order field sort as null, before everything else.
pub fn order_correctness(records: &[Record], config: &EvalConfig) -> f64 {
    let Some(order) = &config.order else {
        return 1.0;
    };
    let in_order = records
        .iter()
        .map(|record| record.get(order.field()).unwrap_or(&Value::Null))
        .tuple_windows()
        .all(|(previous, next)| {
            let ordering = compare_values(previous, next);
            match order.direction() {
                SortDirection::Asc => ordering != Ordering::Greater,
                SortDirection::Desc => ordering != Ordering::Less,
            }
        });
    if in_order { 1.0 } else { 0.0 }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Characters of the generated query over characters of the gold query.
#[allow(clippy::cast_precision_loss)]
pub fn query_length_ratio(gold_query: &str, generated_query: &str) -> f64 {
    let gold_chars = gold_query.chars().count();
    if gold_chars == 0 {
        return 0.0;
    }
    generated_query.chars().count() as f64 / gold_chars as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::OrderSpec;
    use approx::assert_relative_eq;
    use serde_json::json;
    use test_case::test_case;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn people() -> Vec<Record> {
        records(json!([{"name": "Alice", "age": 30}, {"name": "Bob", "age": 25}]))
    }

    #[test]
    fn test_identical_sets_score_one() {
        let gold = people();
        let m = calc_row_metrics(&gold, &gold, &EvalConfig::default());
        assert_relative_eq!(m.precision_all, 1.0);
        assert_relative_eq!(m.recall_all, 1.0);
        assert_relative_eq!(m.order_correctness, 1.0);
    }

    #[test_case(json!([]), json!([]), 1.0, 1.0 ; "both empty")]
    #[test_case(json!([{"a": 1}]), json!([]), 1.0, 0.0 ; "generated empty")]
    #[test_case(json!([]), json!([{"a": 1}]), 0.0, 1.0 ; "gold empty")]
    fn test_boundary_policy(gold: Value, generated: Value, precision: f64, recall: f64) {
        let m = calc_row_metrics(&records(gold), &records(generated), &EvalConfig::default());
        assert_relative_eq!(m.precision_all, precision);
        assert_relative_eq!(m.recall_all, recall);
        assert_relative_eq!(m.order_correctness, 1.0);
    }

    #[test_case(json!([{"name": "Alice", "age": 30}]), 1.0, 0.5 ; "missing row")]
    #[test_case(
        json!([{"name": "Alice", "age": 30}, {"name": "Bob", "age": 25}, {"name": "Charlie", "age": 35}]),
        4.0 / 6.0, 1.0 ; "additional row"
    )]
    #[test_case(json!([{"name": "Alice", "age": 30}, {"name": "Charlie", "age": 25}]), 0.75, 0.75 ; "wrong value")]
    #[test_case(json!([{"name": "Alice"}, {"name": "Bob"}]), 1.0, 0.5 ; "missing column")]
    #[test_case(
        json!([{"name": "Alice", "age": 30, "city": "York"}, {"name": "Bob", "age": 25, "city": "York"}]),
        4.0 / 6.0, 1.0 ; "additional column"
    )]
    fn test_partial_matches(generated: Value, precision: f64, recall: f64) {
        let m = calc_row_metrics(&people(), &records(generated), &EvalConfig::default());
        assert_relative_eq!(m.precision_all, precision, epsilon = 1e-9);
        assert_relative_eq!(m.recall_all, recall, epsilon = 1e-9);
    }

    #[test]
    fn test_greedy_match_prefers_largest_overlap() {
        let gold = records(json!([{"a": 1, "b": 2, "c": 3}]));
        let generated = records(json!([{"a": 1, "b": 9, "c": 9}, {"a": 1, "b": 2, "c": 9}]));
        let m = calc_row_metrics(&gold, &generated, &EvalConfig::default());
        // Two of three gold pairs found; six generated pairs.
        assert_relative_eq!(m.recall_all, 2.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(m.precision_all, 2.0 / 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_values_of_different_types_do_not_match() {
        let gold = records(json!([{"rpn": 30}]));
        let generated = records(json!([{"rpn": "30"}]));
        let m = calc_row_metrics(&gold, &generated, &EvalConfig::default());
        assert_relative_eq!(m.precision_all, 0.0);
        assert_relative_eq!(m.recall_all, 0.0);
    }

    #[test]
    fn test_optional_columns_skip_matching_but_count_wrong_values() {
        let config = EvalConfig::default().with_optional_columns(["rpn"]);
        let gold = records(json!([{"fm": "leak", "rpn": 120}, {"fm": "wear", "rpn": 80}]));

        let right = records(json!([{"fm": "leak", "rpn": 120}, {"fm": "wear"}]));
        let m = calc_row_metrics(&gold, &right, &config);
        assert_relative_eq!(m.precision_all, 1.0);
        assert_relative_eq!(m.recall_all, 1.0);

        let wrong = records(json!([{"fm": "leak", "rpn": 999}, {"fm": "wear", "rpn": 80}]));
        let m = calc_row_metrics(&gold, &wrong, &config);
        // 2 correct structural pairs, one wrong optional on each side.
        assert_relative_eq!(m.precision_all, 2.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(m.recall_all, 2.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_column_metrics() {
        let gold = ["name", "age", "city"];
        let same = calc_col_metrics(gold, ["name", "age", "city"], &[]);
        assert_relative_eq!(same.precision_col, 1.0);
        assert_relative_eq!(same.recall_col, 1.0);

        let wrong = calc_col_metrics(gold, ["name", "age", "country"], &[]);
        assert_relative_eq!(wrong.precision_col, 2.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(wrong.recall_col, 2.0 / 3.0, epsilon = 1e-9);

        let extra = calc_col_metrics(gold, ["name", "age", "city", "country"], &[]);
        assert_relative_eq!(extra.precision_col, 0.75);
        assert_relative_eq!(extra.recall_col, 1.0);

        let optional = calc_col_metrics(gold, ["name", "age"], &["city".to_string()]);
        assert_relative_eq!(optional.recall_col, 1.0);

        let empty = calc_col_metrics(gold, Vec::<String>::new(), &[]);
        assert_relative_eq!(empty.precision_col, 0.0);
        assert_relative_eq!(empty.recall_col, 0.0);
    }

    #[test_case(SortDirection::Desc, json!([{"rpn": 180}, {"rpn": 120}, {"rpn": 120}]), 1.0 ; "desc holds")]
    #[test_case(SortDirection::Desc, json!([{"rpn": 120}, {"rpn": 180}]), 0.0 ; "desc broken")]
    #[test_case(SortDirection::Asc, json!([{"rpn": 9}, {"rpn": 10}]), 1.0 ; "numeric not lexical")]
    #[test_case(SortDirection::Asc, json!([{"name": "a"}, {"rpn": 1}]), 1.0 ; "missing field sorts first")]
    fn test_order_correctness(direction: SortDirection, generated: Value, expected: f64) {
        let config = EvalConfig::default().with_order(OrderSpec::new("rpn", direction));
        assert_relative_eq!(order_correctness(&records(generated), &config), expected);
    }

    #[test]
    fn test_average_and_rounding() {
        let rows = vec![
            Metrics::new(
                "1",
                RowMetrics { precision_all: 1.0, recall_all: 0.5, order_correctness: 1.0 },
                ColMetrics { precision_col: 1.0, recall_col: 1.0 },
                1.2,
            ),
            Metrics::new(
                "2",
                RowMetrics { precision_all: 0.0, recall_all: 0.0, order_correctness: 0.0 },
                ColMetrics { precision_col: 0.5, recall_col: 1.0 / 3.0 },
                0.8,
            ),
        ];

        let avg = Metrics::average("avg", &rows).unwrap().map_values(|v| (v * 1e4).round() / 1e4);
        assert_eq!(avg.question_id, "avg");
        assert_relative_eq!(avg.precision_all, 0.5);
        assert_relative_eq!(avg.recall_all, 0.25);
        assert_relative_eq!(avg.recall_col, 0.6667);
        assert_relative_eq!(avg.query_length_ratio, 1.0);
        assert!(Metrics::average("avg", &[]).is_none());
    }

    #[test]
    fn test_query_length_ratio() {
        assert_relative_eq!(query_length_ratio("abcd", "ab"), 0.5);
        assert_relative_eq!(query_length_ratio("", "ab"), 0.0);
    }
}
