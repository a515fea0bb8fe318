//! Turns the classifier's raw JSON into a verdict.

use serde_json::Value;
use shared::domain::{Candidate, SentimentResult, Verdict};

const CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Normalizes a classifier response.
///
/// The expected shape is `[[{label, score}, ...]]`; a flat `[{label, score}, ...]`
/// is accepted too. Anything else yields `None`, which callers render as
/// "no result" rather than an error.
pub fn normalize(raw: &Value) -> Option<SentimentResult> {
    if is_falsy(raw) {
        return None;
    }

    let mut candidates = extract_candidates(raw)?;
    if candidates.is_empty() {
        return None;
    }

    // Vec::sort_by is stable, so equal scores keep response order.
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let top = candidates.into_iter().next()?;
    let label = top.label?.to_uppercase();
    let verdict = decide(&label, top.score);

    Some(SentimentResult {
        label,
        score: top.score,
        verdict,
    })
}

/// `score` must be strictly above the threshold; exactly 0.5 is neutral.
pub fn decide(label: &str, score: f64) -> Verdict {
    if label == "POSITIVE" && score > CONFIDENCE_THRESHOLD {
        Verdict::Positive
    } else if label == "NEGATIVE" && score > CONFIDENCE_THRESHOLD {
        Verdict::Negative
    } else {
        Verdict::Neutral
    }
}

fn extract_candidates(raw: &Value) -> Option<Vec<Candidate>> {
    let outer = raw.as_array()?;
    let list = match outer.first() {
        Some(Value::Array(inner)) => inner,
        _ => outer,
    };
    Some(list.iter().map(candidate_from).collect())
}

fn candidate_from(entry: &Value) -> Candidate {
    Candidate {
        label: entry
            .get("label")
            .and_then(Value::as_str)
            .map(str::to_string),
        score: entry.get("score").and_then(Value::as_f64).unwrap_or(0.0),
    }
}

fn is_falsy(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict_of(raw: Value) -> Option<Verdict> {
        normalize(&raw).map(|result| result.verdict)
    }

    #[test]
    fn confident_positive_and_negative() {
        for s in [0.51, 0.75, 0.999, 1.0] {
            assert_eq!(
                verdict_of(json!([[{"label": "POSITIVE", "score": s}]])),
                Some(Verdict::Positive)
            );
            assert_eq!(
                verdict_of(json!([[{"label": "NEGATIVE", "score": s}]])),
                Some(Verdict::Negative)
            );
        }
    }

    #[test]
    fn low_confidence_is_neutral_including_exact_threshold() {
        for s in [0.0, 0.25, 0.5] {
            assert_eq!(
                verdict_of(json!([[{"label": "POSITIVE", "score": s}]])),
                Some(Verdict::Neutral)
            );
            assert_eq!(
                verdict_of(json!([[{"label": "NEGATIVE", "score": s}]])),
                Some(Verdict::Neutral)
            );
        }
    }

    #[test]
    fn only_the_top_scored_candidate_matters() {
        let result = normalize(&json!([[
            {"label": "POSITIVE", "score": 0.1},
            {"label": "negative", "score": 0.9},
            {"label": "POSITIVE", "score": 0.4}
        ]]))
        .expect("result");
        assert_eq!(result.label, "NEGATIVE");
        assert_eq!(result.score, 0.9);
        assert_eq!(result.verdict, Verdict::Negative);
    }

    #[test]
    fn other_labels_are_neutral() {
        let result = normalize(&json!([[{"label": "LABEL_1", "score": 0.99}]])).expect("result");
        assert_eq!(result.label, "LABEL_1");
        assert_eq!(result.verdict, Verdict::Neutral);
    }

    #[test]
    fn empty_and_falsy_inputs_yield_nothing() {
        assert!(normalize(&Value::Null).is_none());
        assert!(normalize(&json!(false)).is_none());
        assert!(normalize(&json!(0)).is_none());
        assert!(normalize(&json!("")).is_none());
        assert!(normalize(&json!([])).is_none());
        assert!(normalize(&json!([[]])).is_none());
        assert!(normalize(&json!({"error": "loading"})).is_none());
    }

    #[test]
    fn flat_list_is_accepted() {
        let result = normalize(&json!([{"label": "POSITIVE", "score": 0.9}])).expect("result");
        assert_eq!(
            result,
            SentimentResult {
                label: "POSITIVE".into(),
                score: 0.9,
                verdict: Verdict::Positive,
            }
        );
    }

    #[test]
    fn missing_score_counts_as_zero_and_non_text_label_is_rejected() {
        let result = normalize(&json!([[{"label": "positive"}]])).expect("result");
        assert_eq!(result.score, 0.0);
        assert_eq!(result.verdict, Verdict::Neutral);

        assert!(normalize(&json!([[{"label": 1, "score": 0.9}]])).is_none());
        assert!(normalize(&json!([[{"score": 0.9}, {"label": "POSITIVE", "score": 0.1}]])).is_none());
    }

    #[test]
    fn ties_keep_response_order() {
        let result = normalize(&json!([[
            {"label": "NEGATIVE", "score": 0.7},
            {"label": "POSITIVE", "score": 0.7}
        ]]))
        .expect("result");
        assert_eq!(result.verdict, Verdict::Negative);
    }
}
