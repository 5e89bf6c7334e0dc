// tests/unit_multi_template_test.rs

use cascade_route::routing::{MultiTemplate, TemplateValidationContext};
use std::collections::{HashMap, HashSet};

fn ctx(known: &[&str], optional: &[&str]) -> TemplateValidationContext {
    TemplateValidationContext::new(
        known.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
        optional.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
    )
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn path_only_template_renders_plain_path() {
    let context = ctx(&["id"], &[]);
    let template = MultiTemplate::compile("/u/{id}", &context).unwrap();
    let rendered = template.render(&vars(&[("id", "123")])).unwrap();
    assert_eq!(rendered, "/u/123");
}

#[test]
fn required_empty_query_value_is_emitted_as_bare_key() {
    // `v` is not an optional matcher variable here — this exercises the
    // "non-optional binding that happens to render empty" half of spec
    // §9's open question, not the optional-capture half.
    let context = ctx(&["v"], &[]);
    let template = MultiTemplate::compile("/find?q={v}", &context).unwrap();
    let rendered = template.render(&vars(&[("v", "")])).unwrap();
    assert_eq!(rendered, "/find?q=");
}

#[test]
fn optional_empty_query_value_is_omitted_entirely() {
    let context = ctx(&["v"], &["v"]);
    let template = MultiTemplate::compile("/find?q={v:?}", &context).unwrap();
    let rendered = template.render(&vars(&[("v", "")])).unwrap();
    assert_eq!(rendered, "/find");
}

#[test]
fn multiple_query_pairs_are_joined_with_ampersand_in_declared_order() {
    let context = ctx(&["a", "b"], &[]);
    let template = MultiTemplate::compile("/search?first={a}&second={b}", &context).unwrap();
    let rendered = template.render(&vars(&[("a", "1"), ("b", "2")])).unwrap();
    assert_eq!(rendered, "/search?first=1&second=2");
}

#[test]
fn rendering_rejects_a_path_traversal_result() {
    let context = ctx(&["seg"], &[]);
    let template = MultiTemplate::compile("/files/{seg}", &context).unwrap();
    let result = template.render(&vars(&[("seg", "..")]));
    assert!(result.is_err());
}

#[test]
fn rendering_rejects_a_traversal_sequence_smuggled_through_a_query_value() {
    // The path half is clean; the traversal only shows up once the query
    // value is substituted in, so the blanket path+query check (not just
    // the path-scoped one) has to catch it.
    let context = ctx(&["next"], &[]);
    let template = MultiTemplate::compile("/redirect?to={next}", &context).unwrap();
    let result = template.render(&vars(&[("next", "../../etc/passwd")]));
    assert!(result.is_err());
}

#[test]
fn path_template_variable_that_renders_to_no_value_fails_the_render() {
    // `equals` with no matching alternative and no fallback drops the
    // value entirely; in a path segment (as opposed to a query value) that
    // must fail the whole render rather than silently emit an empty
    // segment.
    let context = ctx(&["fmt"], &[]);
    let template = MultiTemplate::compile("/img.{fmt:equals(jpg,png)}", &context).unwrap();
    assert!(template.render(&vars(&[("fmt", "gif")])).is_err());
    assert_eq!(template.render(&vars(&[("fmt", "jpg")])).unwrap(), "/img.jpg");
}

#[test]
fn unknown_template_variable_is_rejected_at_compile_time() {
    let context = ctx(&["id"], &[]);
    assert!(MultiTemplate::compile("/u/{nope}", &context).is_err());
}

#[test]
fn map_default_only_applies_when_the_preceding_map_missed() {
    let context = ctx(&["fmt"], &[]);
    let template = MultiTemplate::compile("/img.{fmt:map(jpg,jpeg,png,png):map_default(bin)}", &context).unwrap();

    let matched = template.render(&vars(&[("fmt", "jpg")])).unwrap();
    assert_eq!(matched, "/img.jpeg");

    let unmatched = template.render(&vars(&[("fmt", "gif")])).unwrap();
    assert_eq!(unmatched, "/img.bin");
}

#[test]
fn optional_matcher_variable_without_optional_handling_is_rejected() {
    let context = ctx(&["id"], &["id"]);
    assert!(MultiTemplate::compile("/u/{id}", &context).is_err());
    assert!(MultiTemplate::compile("/u/{id:?}", &context).is_ok());
    assert!(MultiTemplate::compile("/u/{id:default(0)}", &context).is_ok());
}
