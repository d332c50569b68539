//! Property tests for topic aggregation.

mod common;

use std::collections::BTreeMap;

use common::base_time;
use prep_algo::{BktParams, MAX_P_KNOWN, MIN_P_KNOWN};
use prep_analytics::aggregator::TopicAggregator;
use prep_analytics::model::{KnowledgeState, QuizAttempt};
use proptest::prelude::*;

const TOPICS: &[&str] = &["Paging", "Deadlocks", "Scheduling", "Sorting", "Subnetting"];

fn attempt_strategy() -> impl Strategy<Value = QuizAttempt> {
    (
        0..TOPICS.len(),
        prop::option::of(any::<bool>()),
        0.0f64..=10.0,
        0.0f64..=300.0,
    )
        .prop_map(|(topic, is_correct, score, time_taken)| QuizAttempt {
            topic: TOPICS[topic].to_string(),
            is_correct,
            score: Some(score),
            time_taken,
            question_id: None,
            subject: None,
            difficulty: None,
        })
}

fn params_strategy() -> impl Strategy<Value = BktParams> {
    (0.0f64..=1.0, 0.0f64..=0.5, 0.0f64..=0.5, MIN_P_KNOWN..=MAX_P_KNOWN).prop_map(
        |(p_learn, p_slip, p_guess, p_known)| BktParams {
            p_learn,
            p_slip,
            p_guess,
            p_known,
        },
    )
}

fn state_strategy() -> impl Strategy<Value = KnowledgeState> {
    prop::collection::btree_map(
        prop::sample::select(TOPICS).prop_map(str::to_string),
        params_strategy(),
        0..TOPICS.len(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn mastery_stays_in_bounds(
        attempts in prop::collection::vec(attempt_strategy(), 0..40),
        previous in state_strategy(),
    ) {
        let out = TopicAggregator::default().aggregate_at(&attempts, &previous, base_time()).unwrap();

        for params in out.new_state.values() {
            prop_assert!((MIN_P_KNOWN..=MAX_P_KNOWN).contains(&params.p_known));
        }
        for metrics in out.metrics.values() {
            prop_assert!((MIN_P_KNOWN..=MAX_P_KNOWN).contains(&metrics.mastery_probability));
            prop_assert!(metrics.forecasted_score <= 100);
        }
    }

    #[test]
    fn attempts_are_partitioned_by_topic(
        attempts in prop::collection::vec(attempt_strategy(), 0..40),
    ) {
        let out = TopicAggregator::default()
            .aggregate_at(&attempts, &KnowledgeState::new(), base_time())
            .unwrap();

        let mut expected: BTreeMap<&str, u32> = BTreeMap::new();
        for a in &attempts {
            *expected.entry(a.topic.as_str()).or_default() += 1;
        }

        prop_assert_eq!(out.metrics.len(), expected.len());
        let total: u32 = out.metrics.values().map(|m| m.attempts_count).sum();
        prop_assert_eq!(total as usize, attempts.len());
        for (topic, count) in expected {
            prop_assert_eq!(out.metrics[topic].attempts_count, count);
        }
    }

    #[test]
    fn untouched_topics_carry_over(
        attempts in prop::collection::vec(attempt_strategy(), 0..20),
        previous in state_strategy(),
    ) {
        let out = TopicAggregator::default().aggregate_at(&attempts, &previous, base_time()).unwrap();

        for (topic, params) in &previous {
            prop_assert!(out.new_state.contains_key(topic));
            if !out.metrics.contains_key(topic) {
                prop_assert_eq!(&out.new_state[topic], params);
            }
        }
    }

    #[test]
    fn aggregation_is_deterministic(
        attempts in prop::collection::vec(attempt_strategy(), 0..20),
        previous in state_strategy(),
    ) {
        let aggregator = TopicAggregator::default();
        let first = aggregator.aggregate_at(&attempts, &previous, base_time()).unwrap();
        let second = aggregator.aggregate_at(&attempts, &previous, base_time()).unwrap();
        prop_assert_eq!(first, second);
    }
}
