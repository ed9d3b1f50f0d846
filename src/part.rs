use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::buffer::SafeString;
use crate::errors::{Error, Result};
use crate::rendering::{BlockFn, Rendering};
use crate::scope::Scope;
use crate::value::{Locals, ScopeValue};

/// Gives a template bounded, mediated access to one rendered value: the
/// handle to the renderer plus the ability to render partials scoped to it.
#[derive(Clone)]
pub struct Part {
    renderer: Arc<dyn Rendering>,
}

impl Part {
    pub fn new(renderer: Arc<dyn Rendering>) -> Part {
        Part { renderer }
    }

    pub fn renderer(&self) -> &Arc<dyn Rendering> {
        &self.renderer
    }

    /// Whether a template named `name` exists in the current render
    /// namespace.
    pub fn template_exists(&self, name: &str) -> bool {
        self.renderer.has_template(name)
    }

    /// Renders the partial `name` against `scope`.
    pub fn render(
        &self,
        name: &str,
        scope: Scope,
        block: Option<&BlockFn<'_>>,
    ) -> Result<SafeString> {
        self.renderer.partial(name, scope, block)
    }
}

impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.renderer, &other.renderer)
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Part").finish_non_exhaustive()
    }
}

struct ValuePartInner {
    part: Part,
    data: Locals,
}

/// A part wrapping a named value: an ordered mapping whose first entry is
/// the primary value. Constructed transiently whenever a collection is
/// iterated or a composite local is accessed from a template; never
/// persisted beyond one render.
#[derive(Clone)]
pub struct ValuePart {
    inner: Arc<ValuePartInner>,
}

impl ValuePart {
    /// Builds a part over `data`.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty: a value part without a primary value is a
    /// programming error at the call site.
    pub fn build(renderer: Arc<dyn Rendering>, data: Locals) -> ValuePart {
        assert!(!data.is_empty(), "a ValuePart requires at least one data entry");
        ValuePart { inner: Arc::new(ValuePartInner { part: Part::new(renderer), data }) }
    }

    /// The wrapped data.
    pub fn data(&self) -> &Locals {
        &self.inner.data
    }

    /// The primary wrapped value: the first entry of the data.
    pub fn value(&self) -> &ScopeValue {
        // non-empty by construction
        self.inner.data.values().next().unwrap()
    }

    fn primary_name(&self) -> &str {
        self.inner.data.keys().next().unwrap()
    }

    /// Indexes into the wrapped value. Only valid when the value itself
    /// supports indexing.
    pub fn index(&self, key: &ScopeValue) -> Result<ScopeValue> {
        index_value(self.value(), key)
    }

    /// The items of the wrapped value. Only valid when the value is a
    /// collection.
    pub fn iter(&self) -> Result<Vec<ScopeValue>> {
        self.value().iter_items()
    }

    /// Merges `additional` into the data, returning a new part over the
    /// merged mapping. When the merge changes nothing the same part is
    /// returned, so call sites keyed on identity see no new allocation.
    pub fn with(&self, additional: Locals) -> ValuePart {
        let mut merged = self.inner.data.clone();
        for (key, value) in additional {
            merged.insert(key, value);
        }

        if merged == self.inner.data {
            self.clone()
        } else {
            ValuePart::build(Arc::clone(&self.inner.part.renderer), merged)
        }
    }

    /// Dynamic member resolution:
    ///
    /// 1. a template named `name` renders scoped to this part;
    /// 2. a data entry named `name`;
    /// 3. a member of the wrapped value;
    /// 4. otherwise [`ErrorKind::NoMember`](crate::ErrorKind::NoMember).
    pub fn resolve(&self, name: &str, args: &[ScopeValue]) -> Result<ScopeValue> {
        if self.inner.part.template_exists(name) {
            return self.render_template(name).map(ScopeValue::Safe);
        }

        if let Some(value) = self.inner.data.get(name) {
            return Ok(value.clone());
        }

        value_member(self.value(), name, args)
    }

    /// Whether `name` is a data entry. Deliberately narrower than
    /// [`resolve`](Self::resolve): template existence and value delegation
    /// stay fallback dispatch only, so probing never forces a template
    /// lookup.
    pub fn responds_to(&self, name: &str) -> bool {
        self.inner.data.contains_key(name)
    }

    /// Renders the partial `name` scoped to this part: the scope carries
    /// the data as locals, with the part itself under its primary name.
    fn render_template(&self, name: &str) -> Result<SafeString> {
        let mut locals = self.inner.data.clone();
        locals.insert(self.primary_name().to_string(), ScopeValue::Part(self.clone()));
        let scope = Scope::new(
            Some(self.primary_name().to_string()),
            locals,
            Arc::clone(&self.inner.part.renderer),
        );
        self.inner.part.render(name, scope, None)
    }
}

impl PartialEq for ValuePart {
    fn eq(&self, other: &Self) -> bool {
        self.inner.part == other.inner.part && self.inner.data == other.inner.data
    }
}

impl fmt::Display for ValuePart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value().to_plain())
    }
}

impl fmt::Debug for ValuePart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ValuePart").field("data", &self.inner.data).finish_non_exhaustive()
    }
}

/// Member access on a plain value, shared by part dispatch and the
/// expression evaluator: object keys first, then the size/position members
/// templates lean on.
pub(crate) fn value_member(value: &ScopeValue, name: &str, args: &[ScopeValue]) -> Result<ScopeValue> {
    match value {
        ScopeValue::Json(Value::Object(map)) => {
            map.get(name).cloned().map(ScopeValue::Json).ok_or_else(|| Error::no_member(name))
        }
        ScopeValue::Map(map) => map.get(name).cloned().ok_or_else(|| Error::no_member(name)),
        ScopeValue::Part(part) => part.resolve(name, args),
        ScopeValue::Json(Value::Array(items)) => match name {
            "size" | "length" | "count" => Ok(ScopeValue::from(items.len() as i64)),
            "first" => Ok(items.first().cloned().map(ScopeValue::Json).unwrap_or(ScopeValue::Json(Value::Null))),
            "last" => Ok(items.last().cloned().map(ScopeValue::Json).unwrap_or(ScopeValue::Json(Value::Null))),
            "empty?" => Ok(ScopeValue::from(items.is_empty())),
            _ => Err(Error::no_member(name)),
        },
        ScopeValue::List(items) => match name {
            "size" | "length" | "count" => Ok(ScopeValue::from(items.len() as i64)),
            "first" => Ok(items.first().cloned().unwrap_or(ScopeValue::Json(Value::Null))),
            "last" => Ok(items.last().cloned().unwrap_or(ScopeValue::Json(Value::Null))),
            "empty?" => Ok(ScopeValue::from(items.is_empty())),
            _ => Err(Error::no_member(name)),
        },
        ScopeValue::Json(Value::String(s)) => match name {
            "size" | "length" => Ok(ScopeValue::from(s.chars().count() as i64)),
            "empty?" => Ok(ScopeValue::from(s.is_empty())),
            _ => Err(Error::no_member(name)),
        },
        _ => Err(Error::no_member(name)),
    }
}

/// Indexing on a plain value: arrays by integer, mappings by key.
pub(crate) fn index_value(value: &ScopeValue, key: &ScopeValue) -> Result<ScopeValue> {
    match (value, key) {
        (ScopeValue::Json(Value::Array(items)), ScopeValue::Json(Value::Number(n))) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .map(ScopeValue::Json)
            .ok_or_else(|| Error::msg(format!("index `{}` is out of bounds", n))),
        (ScopeValue::List(items), ScopeValue::Json(Value::Number(n))) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .ok_or_else(|| Error::msg(format!("index `{}` is out of bounds", n))),
        (ScopeValue::Json(Value::Object(map)), ScopeValue::Json(Value::String(k))) => map
            .get(k)
            .cloned()
            .map(ScopeValue::Json)
            .ok_or_else(|| Error::msg(format!("key `{}` is missing", k))),
        (ScopeValue::Map(map), ScopeValue::Json(Value::String(k))) => {
            map.get(k).cloned().ok_or_else(|| Error::msg(format!("key `{}` is missing", k)))
        }
        (ScopeValue::Part(part), key) => part.index(key),
        (value, key) => Err(Error::msg(format!(
            "`{}` cannot be indexed with `{}`",
            value.to_plain(),
            key.to_plain()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::locals;
    use crate::rendering::{ContextObject, DefaultInflector, EmptyContext, Inflector, RenderingMissing};
    use crate::ErrorKind;

    /// Rendering stub that records which partials it was asked for.
    struct StubRendering {
        templates: HashSet<String>,
        rendered: Mutex<Vec<String>>,
    }

    impl StubRendering {
        fn with_templates(names: &[&str]) -> Arc<StubRendering> {
            Arc::new(StubRendering {
                templates: names.iter().map(|n| n.to_string()).collect(),
                rendered: Mutex::new(vec![]),
            })
        }
    }

    impl Rendering for StubRendering {
        fn partial(
            &self,
            name: &str,
            scope: Scope,
            _block: Option<&BlockFn<'_>>,
        ) -> Result<SafeString> {
            self.rendered.lock().unwrap().push(name.to_string());
            Ok(SafeString::new(format!("[{} for {}]", name, scope.name().unwrap_or("?"))))
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

        fn has_template(&self, name: &str) -> bool {
            self.templates.contains(name)
        }
    }

    fn jane(renderer: Arc<dyn Rendering>) -> ValuePart {
        ValuePart::build(renderer, locals! { name => "Jane" })
    }

    #[test]
    fn test_primary_value_is_first_entry() {
        let part = ValuePart::build(Arc::new(RenderingMissing), locals! { name => "Jane", age => 30 });
        assert_eq!(part.value(), &ScopeValue::from("Jane"));
        assert_eq!(part.to_string(), "Jane");
    }

    #[test]
    #[should_panic(expected = "at least one data entry")]
    fn test_build_from_empty_data_panics() {
        ValuePart::build(Arc::new(RenderingMissing), Locals::new());
    }

    #[test]
    fn test_equality() {
        let renderer: Arc<dyn Rendering> = Arc::new(RenderingMissing);
        let one = jane(Arc::clone(&renderer));
        let two = jane(Arc::clone(&renderer));
        assert_eq!(one, two);

        let other_value = ValuePart::build(Arc::clone(&renderer), locals! { name => "Teresa" });
        assert_ne!(one, other_value);

        // same data, different renderer instance
        let elsewhere = jane(Arc::new(RenderingMissing));
        assert_ne!(one, elsewhere);
    }

    #[test]
    fn test_with_empty_returns_identical_part() {
        let part = jane(Arc::new(RenderingMissing));
        let same = part.with(Locals::new());
        assert!(Arc::ptr_eq(&part.inner, &same.inner));
    }

    #[test]
    fn test_with_no_op_merge_returns_identical_part() {
        let part = jane(Arc::new(RenderingMissing));
        let same = part.with(locals! { name => "Jane" });
        assert!(Arc::ptr_eq(&part.inner, &same.inner));
    }

    #[test]
    fn test_with_change_builds_a_new_part() {
        let part = jane(Arc::new(RenderingMissing));
        let changed = part.with(locals! { name => "Teresa" });
        assert!(!Arc::ptr_eq(&part.inner, &changed.inner));
        assert_eq!(changed.data().get("name"), Some(&ScopeValue::from("Teresa")));
        // the original is untouched
        assert_eq!(part.value(), &ScopeValue::from("Jane"));
    }

    #[test]
    fn test_iteration_matches_the_wrapped_value() {
        let renderer: Arc<dyn Rendering> = Arc::new(RenderingMissing);
        let value = ScopeValue::Json(json!(["a", "b", "c"]));
        let part = ValuePart::build(Arc::clone(&renderer), locals! { letters => value.clone() });
        assert_eq!(part.iter().unwrap(), value.iter_items().unwrap());
    }

    #[test]
    fn test_index_delegates_to_the_wrapped_value() {
        let part = ValuePart::build(
            Arc::new(RenderingMissing),
            locals! { user => ScopeValue::Json(json!({"email": "jane@example.com"})) },
        );
        assert_eq!(
            part.index(&ScopeValue::from("email")).unwrap(),
            ScopeValue::from("jane@example.com")
        );
    }

    #[test]
    fn test_resolve_prefers_templates() {
        let rendering = StubRendering::with_templates(&["special_label"]);
        let part = ValuePart::build(rendering.clone(), locals! { name => "Jane" });
        let resolved = part.resolve("special_label", &[]).unwrap();
        assert_eq!(resolved, ScopeValue::Safe(SafeString::new("[special_label for name]")));
        assert_eq!(*rendering.rendered.lock().unwrap(), vec!["special_label"]);
    }

    #[test]
    fn test_resolve_falls_back_to_data_then_value() {
        let rendering = StubRendering::with_templates(&[]);
        let part = ValuePart::build(
            rendering,
            locals! { user => ScopeValue::Json(json!({"email": "jane@example.com"})) },
        );
        assert_eq!(
            part.resolve("user", &[]).unwrap(),
            ScopeValue::Json(json!({"email": "jane@example.com"}))
        );
        assert_eq!(part.resolve("email", &[]).unwrap(), ScopeValue::from("jane@example.com"));
        let err = part.resolve("missing", &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NoMember(_)));
    }

    #[test]
    fn test_responds_to_checks_only_data() {
        let rendering = StubRendering::with_templates(&["special_label"]);
        let part = ValuePart::build(
            rendering.clone(),
            locals! { user => ScopeValue::Json(json!({"email": "jane@example.com"})) },
        );
        assert!(part.responds_to("user"));
        // template and value delegation are dispatch fallbacks, not
        // advertised capabilities
        assert!(!part.responds_to("special_label"));
        assert!(!part.responds_to("email"));
        // and probing never rendered anything
        assert!(rendering.rendered.lock().unwrap().is_empty());
    }
}
