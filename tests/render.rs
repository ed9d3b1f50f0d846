mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use vellum::{locals, ScopeValue};

use crate::common::View;

#[test]
fn test_renders_literal_templates() {
    let view = View::new(&[("index", "<p>plain & simple</p>")]);
    let out = view.render("index", locals! {}).unwrap();
    assert_eq!(out, "<p>plain & simple</p>");
}

#[test]
fn test_interpolation_is_escaped_by_default() {
    let view = View::new(&[("index", "<p><%= bio %></p>")]);
    let out = view.render("index", locals! { bio => "I <3 \"rust\" & co" }).unwrap();
    assert_eq!(out, "<p>I &lt;3 &quot;rust&quot; &amp; co</p>");
}

#[test]
fn test_raw_interpolation_is_verbatim() {
    let view = View::new(&[("index", "<%== markup %>")]);
    let out = view.render("index", locals! { markup => "<em>hi</em>" }).unwrap();
    assert_eq!(out, "<em>hi</em>");
}

#[test]
fn test_iterates_collections_with_trimmed_scaffolding() {
    let view = View::new(&[(
        "list",
        "<ul>\n  <% items.each do |item| %>\n    <li><%= item %></li>\n  <% end %>\n</ul>\n",
    )]);
    let out = view.render("list", locals! { items => json!(["a", "b"]) }).unwrap();
    assert_eq!(out, "<ul>\n    <li>a</li>\n    <li>b</li>\n</ul>\n");
}

#[test]
fn test_iterates_parts_and_resolves_their_data() {
    let view = View::new(&[("names", "<% users.each do |u| %><%= u.name %><% end %>")]);
    let users = ScopeValue::List(vec![
        ScopeValue::Part(view.part(locals! { name => "Jane" })),
        ScopeValue::Part(view.part(locals! { name => "Teresa" })),
    ]);
    let out = view.render("names", locals! { users => users }).unwrap();
    assert_eq!(out, "JaneTeresa");
}

#[test]
fn test_renders_partials_with_keyword_locals() {
    let view = View::new(&[
        ("index", "<%= render :greeting, name: visitor %>"),
        ("greeting", "Hello, <%= name %>!"),
    ]);
    let out = view.render("index", locals! { visitor => "<Jane>" }).unwrap();
    // escaped exactly once, in the partial
    assert_eq!(out, "Hello, &lt;Jane&gt;!");
}

#[test]
fn test_partial_locals_shadow_the_callers() {
    let view = View::new(&[
        ("index", "<%= title %>/<%= render :inner, title: \"inner\" %>/<%= title %>"),
        ("inner", "<%= title %>"),
    ]);
    let out = view.render("index", locals! { title => "outer" }).unwrap();
    assert_eq!(out, "outer/inner/outer");
}

#[test]
fn test_blocks_reach_the_partials_yield() {
    let view = View::new(&[
        ("page", "<%= render :layout do %>Body & soul<% end %>"),
        ("layout", "<header><%= yield %></header>"),
    ]);
    let out = view.render("page", locals! {}).unwrap();
    assert_eq!(out, "<header>Body & soul</header>");
}

#[test]
fn test_block_bodies_see_the_loop_variable() {
    let view = View::new(&[
        ("page", "<% letters.each do |l| %><%= render :card do %><%= l %><% end %><% end %>"),
        ("card", "[<%= yield %>]"),
    ]);
    let out = view.render("page", locals! { letters => json!(["a", "b"]) }).unwrap();
    assert_eq!(out, "[a][b]");
}

#[test]
fn test_part_members_dispatch_to_templates_first() {
    let view = View::new(&[
        ("profile", "<%= user.badge %>"),
        ("badge", "<b><%= user.name %></b>"),
    ]);
    let user = view.part(locals! { user => json!({"name": "Jane"}) });
    let out = view.render("profile", locals! { user => ScopeValue::Part(user) }).unwrap();
    assert_eq!(out, "<b>Jane</b>");
}

#[test]
fn test_context_members_fill_in_behind_locals() {
    let view = View::with_context(
        &[("head", "<title><%= page_title %></title>")],
        json!({"page_title": "Home & Away"}),
    );
    let out = view.render("head", locals! {}).unwrap();
    assert_eq!(out, "<title>Home &amp; Away</title>");

    let out = view.render("head", locals! { page_title => "Shadowed" }).unwrap();
    assert_eq!(out, "<title>Shadowed</title>");
}

#[test]
fn test_format_alias() {
    let view = View::new(&[("index", "<%= format %>")]);
    assert_eq!(view.render("index", locals! {}).unwrap(), "html");
}

#[test]
fn test_conditionals() {
    let view = View::new(&[(
        "status",
        "<% if admin %>admin<% elsif count > 0 %>member<% else %>guest<% end %>",
    )]);
    let render = |admin: bool, count: i64| {
        view.render("status", locals! { admin => admin, count => count }).unwrap()
    };
    assert_eq!(render(true, 0), "admin");
    assert_eq!(render(false, 2), "member");
    assert_eq!(render(false, 0), "guest");
}

#[test]
fn test_rendered_partials_are_not_double_escaped() {
    let view = View::new(&[
        ("index", "<%= render :em %>"),
        ("em", "<em><%= word %></em>"),
    ]);
    let out = view.render("index", locals! { word => "a&b" }).unwrap();
    assert_eq!(out, "<em>a&amp;b</em>");
}
