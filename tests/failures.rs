mod common;

use std::sync::Arc;

use serde_json::json;
use vellum::{locals, Engine, ErrorKind, Locals, RenderingMissing, Scope};

use crate::common::View;

#[test]
fn test_unknown_partial_fails_with_its_name() {
    let view = View::new(&[("index", "<%= render :missing %>")]);
    let err = view.render("index", locals! {}).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnresolvedPartial(ref name) if name == "missing"));
}

#[test]
fn test_render_without_a_name_needs_a_named_scope() {
    let template = Engine::new().compile("t", "<%= render %>").unwrap();
    let scope = Scope::new(None, Locals::new(), Arc::new(RenderingMissing));
    let err = template.render(&scope).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingPartialName));
}

#[test]
fn test_unresolved_members_fail_at_render_time() {
    let view = View::new(&[("index", "a<%= nope %>b")]);
    let err = view.render("index", locals! {}).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NoMember(ref name) if name == "nope"));
}

#[test]
fn test_iterating_a_scalar_fails() {
    let view = View::new(&[("index", "<% n.each do |x| %><%= x %><% end %>")]);
    let err = view.render("index", locals! { n => 5 }).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotIterable(_)));
}

#[test]
fn test_malformed_code_fails_at_compile_time() {
    let err = Engine::new().compile("t", "ok\n<%= title | %>").unwrap_err();
    match err.kind {
        ErrorKind::Syntax { ref template, line, .. } => {
            assert_eq!(template, "t");
            assert_eq!(line, 2);
        }
        ref other => panic!("unexpected error kind: {:?}", other),
    }
}

#[test]
fn test_unclosed_tag_fails_at_compile_time() {
    let err = Engine::new().compile("t", "<p><%= title").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
}

#[test]
fn test_unclosed_block_fails_at_compile_time() {
    let err = Engine::new().compile("t", "<% if ready %>almost").unwrap_err();
    assert!(err.to_string().contains("never closed"));
}

#[test]
fn test_blocks_on_context_members_are_rejected() {
    let view = View::with_context(
        &[("index", "<%= greeting do %>important body<% end %>")],
        json!({"greeting": "hi"}),
    );
    let err = view.render("index", locals! {}).unwrap_err();
    assert!(err.to_string().contains("only `render` can take a block"));
}

#[test]
fn test_context_failures_surface_unchanged() {
    let view = View::with_context(&[("index", "<%= settings.theme %>")], json!({"settings": {}}));
    let err = view.render("index", locals! {}).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NoMember(ref name) if name == "theme"));
}
