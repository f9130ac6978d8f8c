//! Property tests for the response normalizer.

use eza_normalize::{normalize, to_raw_shape};
use eza_types::RiskLevel;
use proptest::prelude::*;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Every legacy location of an integer 0-100 score.
fn score_shapes(score: u32) -> Vec<Value> {
    let fraction = f64::from(score) / 100.0;
    vec![
        json!({"eza_score": {"eza_score": score}}),
        json!({"eza_score": {"final_score": fraction}}),
        json!({"analysis": {"eza_score": {"eza_score": score}}}),
        json!({"analysis": {"eza_score": {"final_score": fraction}}}),
        json!({"_raw": {"eza_score": {"eza_score": score}}}),
        json!({"_raw": {"eza_score": {"final_score": fraction}}}),
        json!({"overall_score": score}),
        json!({"overallScore": score.to_string()}),
        json!({"eza_score": score}),
        json!({"score": score}),
        json!({"final_score": fraction}),
        json!({"stage": "immediate", "immediate": {"score": score}}),
        json!({"risk_summary": {"score": score}}),
        json!({"_raw": {"score": score}}),
    ]
}

fn arb_location() -> impl Strategy<Value = Value> {
    (
        prop_oneof![Just("P1"), Just("P2"), Just("P7")],
        prop_oneof![Just("low"), Just("medium"), Just("high"), Just("critical")],
        "[a-z]{1,8}",
        prop::collection::vec(prop_oneof![Just("EU-AI-5"), Just("DSA-25"), Just("GDPR-9")], 0..3),
        0u64..5000,
    )
        .prop_map(|(pattern, severity, evidence, policies, start)| {
            json!({
                "pattern_id": pattern,
                "type": "manipulation",
                "severity": severity,
                "evidence": evidence,
                "policy_refs": policies,
                "start": start,
                "end": start + 4,
            })
        })
}

fn arb_body() -> impl Strategy<Value = Value> {
    (
        prop::option::of(0.0f64..100.0),
        prop::option::of(prop_oneof![
            Just("low"),
            Just("High"),
            Just("moderate"),
            Just("unknown"),
            Just("???")
        ]),
        prop::collection::vec("[a-z]{1,6}", 0..6),
        prop::collection::vec(arb_location(), 0..6),
        prop::option::of(("[a-z]{1,8}", prop::option::of(0.0f64..1.0))),
        any::<bool>(),
    )
        .prop_map(|(score, risk, flags, locations, intent, with_bias)| {
            let mut body = serde_json::Map::new();
            if let Some(score) = score {
                body.insert("eza_score".into(), json!({"eza_score": score}));
            }
            if let Some(risk) = risk {
                body.insert("risk_level".into(), json!(risk));
            }
            body.insert("flags".into(), json!(flags));
            body.insert("risk_locations".into(), Value::Array(locations));
            if let Some((label, score)) = intent {
                body.insert("intent".into(), json!({"label": label, "score": score}));
            }
            if with_bias {
                body.insert("bias".into(), json!({"score": 0.3, "notes": ["x"]}));
            }
            Value::Object(body)
        })
}

/// The same body delivered flat, wrapped in `analysis` or wrapped in `_raw`.
fn arb_payload() -> impl Strategy<Value = Value> {
    (arb_body(), 0u8..3).prop_map(|(body, wrapper)| match wrapper {
        0 => body,
        1 => json!({"analysis": body, "analysis_id": "an-1"}),
        _ => json!({"_raw": body}),
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Every legacy shape carrying the same score yields the same 0-100 value.
    #[test]
    fn equivalent_scores_agree_across_shapes(score in 0u32..=100) {
        for payload in score_shapes(score) {
            let result = normalize(&payload);
            prop_assert_eq!(result.overall_score, Some(f64::from(score)), "payload {}", payload);
        }
    }

    /// Fraction-keyed scores are rescaled by round(raw * 100).
    #[test]
    fn fraction_scores_are_rescaled(raw in 0.0f64..=1.0) {
        let expected = (raw * 100.0).round();
        let nested = normalize(&json!({"eza_score": {"final_score": raw}}));
        let flat = normalize(&json!({"final_score": raw}));
        prop_assert_eq!(nested.overall_score, Some(expected));
        prop_assert_eq!(flat.overall_score, Some(expected));
    }

    /// Scores always land in [0, 100].
    #[test]
    fn scores_are_bounded(raw in -1.0e6f64..1.0e6) {
        let result = normalize(&json!({"score": raw}));
        let score = result.overall_score.unwrap();
        prop_assert!((0.0..=100.0).contains(&score));
    }

    /// Normalizing the canonical raw shape reproduces the result.
    #[test]
    fn normalize_is_idempotent_on_raw_shape(payload in arb_payload()) {
        let first = normalize(&payload);
        let second = normalize(&to_raw_shape(&first));
        prop_assert!(second.content_eq(&first), "first {:?}\nsecond {:?}", first, second);
    }

    /// Grouped locations never repeat a pattern and account for every raw location.
    #[test]
    fn grouped_locations_account_for_every_raw_location(
        locations in prop::collection::vec(arb_location(), 0..12)
    ) {
        let count = locations.len() as u32;
        let result = normalize(&json!({"risk_locations": locations}));
        let total: u32 = result.risk_locations.iter().map(|l| l.occurrence_count).sum();
        prop_assert_eq!(total, count);
        let mut ids: Vec<_> = result.risk_locations.iter().map(|l| l.pattern_id.clone()).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), result.risk_locations.len());
    }

    /// Arbitrary JSON never panics and non-objects come back complete.
    #[test]
    fn arbitrary_scalars_degrade(text in ".*", number in any::<i64>(), flag in any::<bool>()) {
        for payload in [json!(text), json!(number), json!(flag), Value::Null] {
            let result = normalize(&payload);
            prop_assert!(result.is_complete());
            prop_assert_eq!(result.risk_level, RiskLevel::Unknown);
        }
    }
}

#[test]
fn pattern_p7_scenario() {
    let result = normalize(&json!({
        "risk_locations": [
            {"pattern_id": "P7", "severity": "medium", "start": 0, "end": 5},
            {"pattern_id": "P7", "severity": "high", "start": 30, "end": 41}
        ]
    }));
    assert_eq!(result.risk_locations.len(), 1);
    assert_eq!(result.risk_locations[0].severity, eza_types::Severity::High);
    assert_eq!(result.risk_locations[0].occurrence_count, 2);
}
