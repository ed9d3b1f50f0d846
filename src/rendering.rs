use std::sync::Arc;

use serde_json::Value;

use crate::buffer::SafeString;
use crate::errors::{Error, Result};
use crate::scope::Scope;
use crate::value::{Locals, ScopeValue};

/// Inline content handed to a partial, invoked where the partial yields.
/// The lifetime lets a block borrow the state of the render that built it,
/// such as a loop variable's scope.
pub type BlockFn<'a> = dyn Fn() -> Result<SafeString> + 'a;

/// The engine that locates and executes named templates. Supplied by the
/// surrounding view layer; scopes and parts only hold a shared handle to it.
pub trait Rendering {
    /// Renders the partial `name` against `scope`, forwarding `block` for
    /// the partial's `yield`. Fails with
    /// [`ErrorKind::UnresolvedPartial`](crate::ErrorKind::UnresolvedPartial)
    /// when no template matches.
    fn partial(&self, name: &str, scope: Scope, block: Option<&BlockFn<'_>>)
        -> Result<SafeString>;

    /// Builds a brand-new named scope, unrelated to any existing chain.
    ///
    /// `rendering` is the caller's own handle to `self`; the default just
    /// threads it into the new scope.
    fn scope(&self, rendering: Arc<dyn Rendering>, name: Option<String>, locals: Locals) -> Scope {
        Scope::new(name, locals, rendering)
    }

    /// The template format of the current render environment, e.g. `html`.
    fn format(&self) -> &str;

    /// The shared context object of the current render environment.
    fn context(&self) -> &dyn ContextObject;

    /// The inflector used to derive partial names from type names.
    fn inflector(&self) -> &dyn Inflector;

    /// Whether a template named `name` exists in the current render
    /// namespace. Drives the template tier of part member dispatch.
    fn has_template(&self, name: &str) -> bool;
}

/// An application-supplied object that scopes fall back to for any member
/// their locals cannot resolve.
pub trait ContextObject {
    /// Whether the context can resolve `name`. Must agree with
    /// [`call`](Self::call): probing and dispatch never disagree.
    fn responds_to(&self, name: &str) -> bool;

    /// Resolves `name` with the given call arguments.
    fn call(&self, name: &str, args: &[ScopeValue]) -> Result<ScopeValue>;

    /// The value form of the whole context, used when a template refers to
    /// `context` itself rather than one of its members.
    fn as_value(&self) -> ScopeValue {
        ScopeValue::Json(Value::Null)
    }
}

/// A context backed by plain data: members are the object's keys.
impl ContextObject for Value {
    fn responds_to(&self, name: &str) -> bool {
        self.as_object().map_or(false, |o| o.contains_key(name))
    }

    fn call(&self, name: &str, _args: &[ScopeValue]) -> Result<ScopeValue> {
        self.as_object()
            .and_then(|o| o.get(name))
            .cloned()
            .map(ScopeValue::Json)
            .ok_or_else(|| Error::no_member(name))
    }

    fn as_value(&self) -> ScopeValue {
        ScopeValue::Json(self.clone())
    }
}

/// A context that resolves nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyContext;

impl ContextObject for EmptyContext {
    fn responds_to(&self, _name: &str) -> bool {
        false
    }

    fn call(&self, name: &str, _args: &[ScopeValue]) -> Result<ScopeValue> {
        Err(Error::no_member(name))
    }
}

/// Derives partial identifiers from type names.
pub trait Inflector {
    /// `ProductCard` -> `product_card`
    fn underscore(&self, name: &str) -> String;

    /// `Shop::ProductCard` -> `ProductCard`
    fn demodulize(&self, name: &str) -> String;
}

/// Plain snake-casing inflector, sufficient for ASCII type names.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultInflector;

impl Inflector for DefaultInflector {
    fn underscore(&self, name: &str) -> String {
        let chars: Vec<char> = name.chars().collect();
        let mut out = String::with_capacity(name.len() + 4);

        for (i, &c) in chars.iter().enumerate() {
            if c == '-' {
                out.push('_');
                continue;
            }
            if c.is_uppercase() {
                let prev = if i > 0 { Some(chars[i - 1]) } else { None };
                let next = chars.get(i + 1);
                let after_lower = prev.map_or(false, |p| p.is_lowercase() || p.is_numeric());
                // acronym boundary: HTMLParser -> html_parser
                let before_lower =
                    prev.map_or(false, |p| p.is_uppercase()) && next.map_or(false, |n| n.is_lowercase());
                if after_lower || before_lower {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        }

        out
    }

    fn demodulize(&self, name: &str) -> String {
        name.rsplit("::").next().unwrap_or(name).to_string()
    }
}

/// Stand-in rendering for scopes built outside any render pass. Every
/// operation that needs an actual engine fails with a clear message.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderingMissing;

impl Rendering for RenderingMissing {
    fn partial(
        &self,
        name: &str,
        _scope: Scope,
        _block: Option<&BlockFn<'_>>,
    ) -> Result<SafeString> {
        Err(Error::msg(format!(
            "a rendering must be provided to render the `{}` partial",
            name
        )))
    }

    fn format(&self) -> &str {
        "html"
    }

    fn context(&self) -> &dyn ContextObject {
        &EmptyContext
    }

    fn inflector(&self) -> &dyn Inflector {
        &DefaultInflector
    }

    fn has_template(&self, _name: &str) -> bool {
        false
    }
}
