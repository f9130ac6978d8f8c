//! Property tests: staged aggregation only ever refines.

use eza_stage::{AggregatorState, IgnoreReason, StageOutcome, StagedAggregator};
use eza_types::Completeness;
use proptest::prelude::*;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_stage_payload() -> impl Strategy<Value = Value> {
    (0u8..3, 0u32..=100, prop::collection::vec("[a-z]{2,5}", 0..3)).prop_map(
        |(stage, score, flags)| match stage {
            0 => json!({"stage": "immediate", "analysis_id": "a1", "score": score}),
            1 => json!({"risk_summary": {"score": score, "flags": flags}, "analysis_id": "a1"}),
            _ => json!({"stage": "full", "analysis_id": "a1", "score": score, "flags": flags}),
        },
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// States never move backwards, whatever the arrival order.
    #[test]
    fn states_are_monotonic(payloads in prop::collection::vec(arb_stage_payload(), 1..12)) {
        let mut agg = StagedAggregator::new("req");
        let mut previous = agg.state();
        for payload in &payloads {
            agg.apply(payload);
            prop_assert!(agg.state() >= previous);
            previous = agg.state();
        }
    }

    /// Once complete, nothing changes the result.
    #[test]
    fn complete_results_are_frozen(
        before in prop::collection::vec(arb_stage_payload(), 0..4),
        full_score in 0u32..=100,
        after in prop::collection::vec(arb_stage_payload(), 1..8),
    ) {
        let mut agg = StagedAggregator::new("req");
        for payload in &before {
            agg.apply(payload);
        }
        let outcome = agg.apply(&json!({"stage": "full", "score": full_score, "flags": ["pii"]}));
        if outcome == StageOutcome::Completed {
            let frozen = agg.snapshot().clone();
            prop_assert_eq!(frozen.completeness, Completeness::Complete);
            for payload in &after {
                prop_assert_eq!(
                    agg.apply(payload),
                    StageOutcome::Ignored(IgnoreReason::AlreadyComplete)
                );
                prop_assert_eq!(agg.snapshot(), &frozen);
            }
        } else {
            prop_assert_eq!(outcome, StageOutcome::Ignored(IgnoreReason::AlreadyComplete));
        }
    }
}

#[test]
fn immediate_then_full_then_stale_duplicate() {
    let immediate = json!({"stage": "immediate", "analysis_id": "a1", "score": 12});
    let full = json!({
        "stage": "full",
        "analysis_id": "a1",
        "eza_score": {"eza_score": 88},
        "flags": ["bias"],
        "breakdown": {"bias": {"score": 0.1}}
    });

    let mut agg = StagedAggregator::new("req");
    agg.apply(&immediate);
    assert_eq!(agg.state(), AggregatorState::HaveImmediateScore);
    assert_eq!(agg.apply(&full), StageOutcome::Completed);
    let after_full = agg.snapshot().clone();

    agg.apply(&immediate);
    let result = agg.snapshot();
    assert_eq!(result.completeness, Completeness::Complete);
    assert_eq!(result.overall_score, Some(88.0));
    assert_eq!(result.flags, vec!["bias"]);
    assert_eq!(result, &after_full);
}
