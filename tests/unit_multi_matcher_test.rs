// tests/unit_multi_matcher_test.rs

use cascade_route::routing::{CharClassCache, MultiValueMatcher};

#[test]
fn compiles_and_matches_simple_path() {
    let cache = CharClassCache::default();
    let matcher = MultiValueMatcher::compile("/users/{id:int}", &cache).unwrap();
    let result = matcher.matches("/users/123", None);
    assert!(result.success);
    assert_eq!(result.captures.get("id").unwrap(), "123");
}

#[test]
fn compiles_query_matcher_and_enforces_required_keys() {
    let cache = CharClassCache::default();
    let matcher = MultiValueMatcher::compile("/search?q={term}", &cache).unwrap();
    assert!(!matcher.matches("/search", None).success);
    assert!(matcher.matches("/search?q=shoes", None).success);
}

#[test]
fn optional_query_value_matcher_allows_missing_key() {
    let cache = CharClassCache::default();
    let matcher = MultiValueMatcher::compile("/search?q={term:?}", &cache).unwrap();
    assert!(matcher.matches("/search", None).success);
}

#[test]
fn raw_mode_canonicalizes_and_sorts() {
    let cache = CharClassCache::default();
    let matcher = MultiValueMatcher::compile("{all:**}[raw,sort-raw]", &cache).unwrap();
    let result = matcher.matches("/x?b=2&a=1", None);
    assert!(result.success);
    assert_eq!(result.captures.get("all").unwrap(), "/x?a=1&b=2");
}

#[test]
fn accept_webp_gate_rejects_missing_header() {
    let cache = CharClassCache::default();
    let matcher = MultiValueMatcher::compile("/img/{name}[accept-webp]", &cache).unwrap();
    assert!(!matcher.matches("/img/a", None).success);
    assert!(matcher.matches("/img/a", Some("image/webp,image/*")).success);
}

#[test]
fn prohibit_excess_rejects_unknown_query_keys() {
    let cache = CharClassCache::default();
    let matcher = MultiValueMatcher::compile("/search?q={term}[query-prohibit-excess]", &cache).unwrap();
    assert!(!matcher.matches("/search?q=a&unexpected=1", None).success);
    assert!(matcher.matches("/search?q=a", None).success);
}

#[test]
fn raw_forbids_query_prohibit_excess_at_compile_time() {
    let cache = CharClassCache::default();
    assert!(MultiValueMatcher::compile("{all:**}[raw,query-prohibit-excess]", &cache).is_err());
}

#[test]
fn linear_scaling_matches_long_repeated_input() {
    let cache = CharClassCache::default();
    let matcher = MultiValueMatcher::compile("/sku-list/{series:allow([A-Za-z0-9])}/", &cache).unwrap();
    let body = "dress1251".repeat(10_000);
    let input = format!("/sku-list/{body}/");
    let start = std::time::Instant::now();
    let result = matcher.matches(&input, None);
    assert!(result.success);
    assert!(start.elapsed() < std::time::Duration::from_secs(2));

    let without_trailing_slash = format!("/sku-list/{body}");
    let start = std::time::Instant::now();
    assert!(!matcher.matches(&without_trailing_slash, None).success);
    assert!(start.elapsed() < std::time::Duration::from_secs(2));
}
