// tests/unit_condition_test.rs

use cascade_route::routing::CharClassCache;
use cascade_route::routing::{Condition, MatchExpression};

#[test]
fn int32_condition_rejects_bare_sign_and_overflow() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{n:int32}", &cache, false).unwrap();
    assert!(expr.match_input("0").is_some());
    assert!(expr.match_input("-123").is_some());
    assert!(expr.match_input("2147483647").is_some());
    assert!(expr.match_input("2147483648").is_none());
    assert!(expr.match_input("-").is_none());
    assert!(expr.match_input("").is_none());
    assert!(expr.match_input("123abc").is_none());
}

#[test]
fn hex_condition_accepts_mixed_case_digits_only() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{h:hex}", &cache, false).unwrap();
    assert!(expr.match_input("deadBEEF").is_some());
    assert!(expr.match_input("").is_none());
    assert!(expr.match_input("ghij").is_none());
}

#[test]
fn range_condition_enforces_inclusive_bounds() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{n:range(1,10)}", &cache, false).unwrap();
    assert!(expr.match_input("1").is_some());
    assert!(expr.match_input("10").is_some());
    assert!(expr.match_input("0").is_none());
    assert!(expr.match_input("11").is_none());
}

#[test]
fn length_condition_counts_chars_not_bytes() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{s:length(2,4)}", &cache, false).unwrap();
    assert!(expr.match_input("ab").is_some());
    assert!(expr.match_input("abcd").is_some());
    assert!(expr.match_input("a").is_none());
    assert!(expr.match_input("abcde").is_none());
}

#[test]
fn guid_condition_checks_dash_grouped_hex_lengths() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{g:guid}", &cache, false).unwrap();
    assert!(expr.match_input("01234567-89ab-cdef-0123-456789abcdef").is_some());
    assert!(expr.match_input("not-a-guid").is_none());
}

#[test]
fn equals_condition_honors_case_insensitive_suffix() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{s:equals-i(Foo,Bar)}", &cache, false).unwrap();
    assert!(expr.match_input("foo").is_some());
    assert!(expr.match_input("BAR").is_some());
    assert!(expr.match_input("baz").is_none());
}

#[test]
fn allow_condition_rejects_empty_span_and_disallowed_bytes() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{s:allow([a-z])}", &cache, false).unwrap();
    assert!(expr.match_input("abc").is_some());
    assert!(expr.match_input("").is_none());
    assert!(expr.match_input("ABC").is_none());
}

#[test]
fn starts_with_condition_accepts_any_alternative_not_just_the_first() {
    // A segment beginning with the second alternative must still match:
    // `starts-with` with arguments is a post-boundary condition checked
    // against the whole captured span, not a start-boundary scan for the
    // first alternative only.
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{x:starts-with(a,bb)}", &cache, false).unwrap();
    assert!(expr.match_input("bb-thing").is_some());
    assert!(expr.match_input("a-thing").is_some());
    assert!(expr.match_input("cc-thing").is_none());
}

#[test]
fn ends_with_condition_checks_the_captured_span_suffix() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{x:ends-with(.jpg,.png)}", &cache, false).unwrap();
    assert!(expr.match_input("photo.jpg").is_some());
    assert!(expr.match_input("photo.png").is_some());
    assert!(expr.match_input("photo.gif").is_none());
}

#[test]
fn contains_condition_matches_a_substring_anywhere_in_the_span() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{x:contains(mid)}", &cache, false).unwrap();
    assert!(expr.match_input("a-mid-dle").is_some());
    assert!(expr.match_input("nothing-here").is_none());
}

#[test]
fn starts_with_chars_condition_checks_a_fixed_prefix_length_against_a_charclass() {
    let cache = CharClassCache::default();
    let expr = MatchExpression::compile("{x:starts-with-chars(3,[a-z])}", &cache, false).unwrap();
    assert!(expr.match_input("abcDEF").is_some());
    assert!(expr.match_input("abCdef").is_none());
}

#[test]
fn condition_check_matches_direct_enum_usage() {
    let cond = Condition::Alpha;
    assert!(cond.check("hello"));
    assert!(!cond.check("hello1"));
    assert!(!cond.check(""));
}
