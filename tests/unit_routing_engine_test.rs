// tests/unit_routing_engine_test.rs

use cascade_route::config::RoutingConfig;
use cascade_route::routing::{RoutingExpressionEngine, RoutingResult};

#[test]
fn rewrites_simple_int_capture() {
    let engine = RoutingExpressionEngine::new();
    let parsed = engine.compile("/users/{id:int} => /u/{id} [v1]").unwrap();
    match engine.evaluate(&parsed, "/users/123", None) {
        RoutingResult::Found { rewritten_path_and_query, .. } => {
            assert_eq!(rewritten_path_and_query, "/u/123");
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn optional_capture_falls_back_to_default_in_template() {
    let engine = RoutingExpressionEngine::new();
    let parsed = engine.compile("/search/{term:?} => /find?q={term:?:default(all)} [v1]").unwrap();
    match engine.evaluate(&parsed, "/search/", None) {
        RoutingResult::Found { rewritten_path_and_query, .. } => {
            assert_eq!(rewritten_path_and_query, "/find?q=all");
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn transformation_pipeline_applies_in_template() {
    let engine = RoutingExpressionEngine::new();
    let parsed = engine.compile("/users/{id} => /u/{id:upper} [v1]").unwrap();
    match engine.evaluate(&parsed, "/users/abc", None) {
        RoutingResult::Found { rewritten_path_and_query, .. } => {
            assert_eq!(rewritten_path_and_query, "/u/ABC");
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn non_matching_input_yields_not_found_not_an_error() {
    let engine = RoutingExpressionEngine::new();
    let parsed = engine.compile("/users/{id:int} => /u/{id} [v1]").unwrap();
    assert_eq!(engine.evaluate(&parsed, "/users/abc", None), RoutingResult::NotFound);
}

#[test]
fn capture_followed_by_literal_text_compiles_and_matches() {
    let engine = RoutingExpressionEngine::new();
    let parsed = engine.compile("/users/{id}/posts/{slug} => /u/{id}/p/{slug} [v1]").unwrap();
    match engine.evaluate(&parsed, "/users/7/posts/hello-world", None) {
        RoutingResult::Found { rewritten_path_and_query, .. } => {
            assert_eq!(rewritten_path_and_query, "/u/7/p/hello-world");
        }
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn missing_separator_is_rejected_at_compile_time() {
    let engine = RoutingExpressionEngine::new();
    assert!(engine.compile("/users/{id:int} /u/{id} [v1]").is_err());
}

#[test]
fn widened_config_accepts_a_version_the_default_engine_rejects() {
    let default_engine = RoutingExpressionEngine::new();
    assert!(default_engine.compile("/a/{x} => /b/{x} [v2]").is_err());

    let widened = RoutingExpressionEngine::with_config(&RoutingConfig { min_syntax_version: 1, max_syntax_version: 2 });
    assert!(widened.compile("/a/{x} => /b/{x} [v2]").is_ok());
}

#[test]
fn provider_flag_is_carried_through_to_result() {
    let engine = RoutingExpressionEngine::new();
    let parsed = engine.compile("/users/{id} => /u/{id} [provider=cold-storage,v1]").unwrap();
    match engine.evaluate(&parsed, "/users/7", None) {
        RoutingResult::Found { provider, .. } => {
            assert_eq!(provider.name.as_deref(), Some("cold-storage"));
        }
        other => panic!("expected a match, got {other:?}"),
    }
}
