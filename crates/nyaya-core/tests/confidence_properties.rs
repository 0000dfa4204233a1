//! Property tests for confidence scoring and entity deduplication.

use nyaya_core::confidence::{
    calculate_action_confidence, calculate_summary_confidence, summary_record_confidence,
};
use nyaya_core::evidence::{EntitySet, dedup_sorted};
use proptest::prelude::*;

fn names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Z][a-z]{0,6}", 0..20)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn summary_confidence_bounded(q in -2.0f64..3.0, e in 0usize..1000, l in 0usize..1000) {
        let c = calculate_summary_confidence(q, e, l);
        prop_assert!((0.0..=1.0).contains(&c));
    }

    #[test]
    fn summary_confidence_monotone(
        q in 0.0f64..=1.0,
        dq in 0.0f64..=1.0,
        e in 0usize..50,
        de in 0usize..50,
        l in 0usize..50,
        dl in 0usize..50,
    ) {
        let base = calculate_summary_confidence(q, e, l);
        let more = calculate_summary_confidence((q + dq).min(1.0), e + de, l + dl);
        prop_assert!(more + 1e-12 >= base);
    }

    #[test]
    fn action_confidence_bounded_and_monotone(
        p in 0usize..10,
        c in -1.0f64..2.0,
        s in -1.0f64..2.0,
        dp in 0usize..5,
        dc in 0.0f64..1.0,
        ds in 0.0f64..1.0,
    ) {
        let base = calculate_action_confidence(p, c, s);
        prop_assert!(base <= 100);
        let more = calculate_action_confidence(p + dp, c + dc, s + ds);
        prop_assert!(more >= base);
    }

    #[test]
    fn record_confidence_bounded(words in 0usize..400, issues in 0usize..10, facts in 0usize..10) {
        let text = vec!["w"; words].join(" ");
        let c = summary_record_confidence(&text, issues, facts);
        prop_assert!((0.0..=1.0).contains(&c));
    }

    #[test]
    fn dedup_is_idempotent(values in names()) {
        let once = dedup_sorted(values);
        let twice = dedup_sorted(once.clone());
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn entity_set_dedup_is_idempotent(persons in names(), dates in names()) {
        let mut set = EntitySet { persons, dates, ..Default::default() };
        set.dedup();
        let snapshot = set.clone();
        set.dedup();
        prop_assert_eq!(set, snapshot);
    }
}
