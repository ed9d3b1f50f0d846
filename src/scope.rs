use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::buffer::SafeString;
use crate::errors::{Error, Result};
use crate::rendering::{BlockFn, Inflector, Rendering};
use crate::value::{Locals, ScopeValue};

/// Short member names that fall back to the underscore-prefixed canonical
/// accessors, unless shadowed by a same-named local.
const CONVENIENCE_METHODS: [&str; 3] = ["format", "context", "locals"];

/// Identifies the partial to render: either a plain name or a type name to
/// be inflected (`Shop::ProductCard` -> `product_card`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartialName {
    Name(String),
    Type(String),
}

impl PartialName {
    pub(crate) fn resolve(&self, inflector: &dyn Inflector) -> String {
        match self {
            PartialName::Name(name) => name.clone(),
            PartialName::Type(name) => inflector.underscore(&inflector.demodulize(name)),
        }
    }
}

impl From<&str> for PartialName {
    fn from(name: &str) -> Self {
        PartialName::Name(name.to_string())
    }
}

impl From<String> for PartialName {
    fn from(name: String) -> Self {
        PartialName::Name(name)
    }
}

struct ScopeInner {
    name: Option<String>,
    locals: Locals,
    rendering: Arc<dyn Rendering>,
}

/// The evaluation context of one template render: the active locals, an
/// optional name, and a shared handle to the in-flight [`Rendering`].
///
/// Scopes are immutable; re-scoping (entering a partial with extra locals,
/// binding a loop variable) always builds a new scope. Cloning is cheap and
/// shares the underlying data.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Returns a new scope. `rendering` is shared, not owned: every scope
    /// of one render pass holds the same handle.
    pub fn new(name: Option<String>, locals: Locals, rendering: Arc<dyn Rendering>) -> Scope {
        Scope { inner: Arc::new(ScopeInner { name, locals, rendering }) }
    }

    /// The scope's name, `None` for anonymous scopes.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The scope's locals.
    pub fn locals(&self) -> &Locals {
        &self.inner.locals
    }

    /// The current rendering.
    pub fn rendering(&self) -> &Arc<dyn Rendering> {
        &self.inner.rendering
    }

    /// Renders a partial against this scope.
    ///
    /// Without a `name` the scope's own name is used; an anonymous scope
    /// fails with [`ErrorKind::MissingPartialName`](crate::ErrorKind::MissingPartialName).
    /// Extra `locals` re-scope the partial: the new keys are unioned over
    /// the current ones and win on conflict. Without extra locals the scope
    /// is passed through unchanged, so no allocation happens and equality
    /// with `self` is preserved. A re-scoped partial keeps the current
    /// scope's name, so nested `render` calls stay addressable without
    /// re-specifying it.
    pub fn render(
        &self,
        name: Option<PartialName>,
        locals: Locals,
        block: Option<&BlockFn<'_>>,
    ) -> Result<SafeString> {
        let partial_name = match name {
            Some(name) => name.resolve(self.inner.rendering.inflector()),
            None => match self.inner.name {
                Some(ref own) => own.clone(),
                None => return Err(Error::missing_partial_name()),
            },
        };

        self.inner.rendering.partial(&partial_name, self.render_scope(locals), block)
    }

    /// Builds a brand-new named scope through the rendering, unrelated to
    /// this scope's chain.
    pub fn scope(&self, name: Option<String>, locals: Locals) -> Scope {
        self.inner.rendering.scope(Arc::clone(&self.inner.rendering), name, locals)
    }

    /// Dynamic member resolution, a strict priority chain:
    ///
    /// 1. a local named `name` (terminal, call arguments ignored);
    /// 2. a member the context object responds to, forwarded with `args`;
    /// 3. the convenience aliases `format`, `context` and `locals`;
    /// 4. otherwise [`ErrorKind::NoMember`](crate::ErrorKind::NoMember).
    ///
    /// A local named `context` therefore shadows the alias, and a local
    /// shadows any same-named context member.
    pub fn resolve(&self, name: &str, args: &[ScopeValue]) -> Result<ScopeValue> {
        if let Some(value) = self.inner.locals.get(name) {
            return Ok(value.clone());
        }

        let context = self.inner.rendering.context();
        if context.responds_to(name) {
            return context.call(name, args);
        }

        match name {
            "format" => Ok(self.format_value()),
            "context" => Ok(context.as_value()),
            "locals" => Ok(ScopeValue::Map(self.inner.locals.clone())),
            _ => Err(Error::no_member(name)),
        }
    }

    /// Whether [`resolve`](Self::resolve) would succeed for `name`. Mirrors
    /// the same tiers, so probing and dispatch never disagree.
    pub fn responds_to(&self, name: &str) -> bool {
        self.inner.locals.contains_key(name)
            || self.inner.rendering.context().responds_to(name)
            || CONVENIENCE_METHODS.contains(&name)
    }

    /// The template format of the current render environment.
    pub fn format(&self) -> String {
        self.inner.rendering.format().to_string()
    }

    /// The context object as a template value.
    pub fn context_value(&self) -> ScopeValue {
        self.inner.rendering.context().as_value()
    }

    pub(crate) fn format_value(&self) -> ScopeValue {
        ScopeValue::Json(Value::String(self.format()))
    }

    /// A scope with `locals` unioned over the current ones, new keys
    /// winning. Used when binding loop variables.
    pub(crate) fn extended(&self, locals: Locals) -> Scope {
        let mut merged = self.inner.locals.clone();
        for (key, value) in locals {
            merged.insert(key, value);
        }
        Scope::new(self.inner.name.clone(), merged, Arc::clone(&self.inner.rendering))
    }

    fn render_scope(&self, locals: Locals) -> Scope {
        if locals.is_empty() {
            self.clone()
        } else {
            self.extended(locals)
        }
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
            && self.inner.locals == other.inner.locals
            && Arc::ptr_eq(&self.inner.rendering, &other.inner.rendering)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.inner.name)
            .field("locals", &self.inner.locals)
            .finish_non_exhaustive()
    }
}
