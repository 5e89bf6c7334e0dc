// tests/unit_routing_flags_test.rs

use cascade_route::routing::RoutingExpressionEngine;

#[test]
fn trailing_flag_block_drives_raw_and_version() {
    let engine = RoutingExpressionEngine::new();
    let parsed = engine.compile("/a/{x} => /b/{x} [v1]").unwrap();
    assert_eq!(parsed.syntax_version(), 1);
}

#[test]
fn multiple_flags_in_one_block_are_all_applied() {
    let engine = RoutingExpressionEngine::new();
    // `raw` and `sort-raw` both come from a single bracketed block.
    let parsed = engine.compile("{all:**}[raw,sort-raw] => /out?q={all} [v1]").unwrap();
    match engine.evaluate(&parsed, "/x?b=2&a=1", None) {
        cascade_route::routing::RoutingResult::Found { rewritten_path_and_query, .. } => {
            assert_eq!(rewritten_path_and_query, "/out?q=%2Fx%3Fa%3D1%26b%3D2");
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn missing_version_flag_is_rejected_at_compile_time() {
    let engine = RoutingExpressionEngine::new();
    assert!(engine.compile("/a/{x} => /b/{x}").is_err());
}

#[test]
fn unknown_flag_is_rejected() {
    let engine = RoutingExpressionEngine::new();
    assert!(engine.compile("/a/{x}[bogus-flag] => /b/{x} [v1]").is_err());
}
