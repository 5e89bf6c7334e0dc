// tests/property/routing_test.rs

//! Property-based tests for the routing expression engine: arbitrary
//! i32-range integers always satisfy `{n:int}`, and a captured value is
//! always reproduced verbatim by a template that does no transformation.

use cascade_route::routing::RoutingExpressionEngine;
use cascade_route::routing::RoutingResult;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

    #[test]
    fn any_i32_round_trips_through_an_int_capture(n in any::<i32>()) {
        let engine = RoutingExpressionEngine::new();
        let parsed = engine.compile("/users/{id:int} => /u/{id} [v1]").unwrap();
        let input = format!("/users/{n}");
        match engine.evaluate(&parsed, &input, None) {
            RoutingResult::Found { rewritten_path_and_query, .. } => {
                prop_assert_eq!(rewritten_path_and_query, format!("/u/{n}"));
            }
            other => prop_assert!(false, "expected a match for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn an_alphanumeric_segment_round_trips_through_a_plain_capture(
        segment in "[a-zA-Z0-9]{1,32}"
    ) {
        let engine = RoutingExpressionEngine::new();
        let parsed = engine.compile("/items/{slug} => /i/{slug} [v1]").unwrap();
        let input = format!("/items/{segment}");
        match engine.evaluate(&parsed, &input, None) {
            RoutingResult::Found { rewritten_path_and_query, .. } => {
                prop_assert_eq!(rewritten_path_and_query, format!("/i/{segment}"));
            }
            other => prop_assert!(false, "expected a match for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_segments_never_match_an_int_capture(
        segment in "[a-zA-Z]{1,16}"
    ) {
        let engine = RoutingExpressionEngine::new();
        let parsed = engine.compile("/users/{id:int} => /u/{id} [v1]").unwrap();
        let input = format!("/users/{segment}");
        prop_assert_eq!(engine.evaluate(&parsed, &input, None), RoutingResult::NotFound);
    }
}
