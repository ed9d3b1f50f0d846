#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use vellum::{
    BlockFn, ContextObject, DefaultInflector, Engine, Error, Inflector, Locals, Rendering, Result,
    SafeString, Scope, Template, ValuePart,
};

/// In-memory view layer backing the integration tests: a fixed set of
/// templates compiled up front, a JSON context object and the `html`
/// format.
pub struct View {
    templates: HashMap<String, Template>,
    context: Value,
    inflector: DefaultInflector,
}

impl View {
    pub fn new(sources: &[(&str, &str)]) -> Arc<View> {
        View::with_context(sources, Value::Null)
    }

    pub fn with_context(sources: &[(&str, &str)], context: Value) -> Arc<View> {
        let engine = Engine::new();
        let templates = sources
            .iter()
            .map(|&(name, source)| {
                let template = engine.compile(name, source).expect("template compiles");
                (name.to_string(), template)
            })
            .collect();
        Arc::new(View { templates, context, inflector: DefaultInflector })
    }

    /// Renders the template `name` with the given locals.
    pub fn render(self: &Arc<Self>, name: &str, locals: Locals) -> Result<SafeString> {
        let rendering: Arc<dyn Rendering> = Arc::clone(self) as Arc<dyn Rendering>;
        let scope = Scope::new(Some(name.to_string()), locals, rendering);
        self.template(name)?.render(&scope)
    }

    /// Wraps `data` in a part bound to this view.
    pub fn part(self: &Arc<Self>, data: Locals) -> ValuePart {
        ValuePart::build(Arc::clone(self) as Arc<dyn Rendering>, data)
    }

    fn template(&self, name: &str) -> Result<&Template> {
        self.templates.get(name).ok_or_else(|| Error::partial_not_found(name))
    }
}

impl Rendering for View {
    fn partial(&self, name: &str, scope: Scope, block: Option<&BlockFn<'_>>) -> Result<SafeString> {
        self.template(name)?.render_with_block(&scope, block)
    }

    fn format(&self) -> &str {
        "html"
    }

    fn context(&self) -> &dyn ContextObject {
        &self.context
    }

    fn inflector(&self) -> &dyn Inflector {
        &self.inflector
    }

    fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}
