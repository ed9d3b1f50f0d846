//! The compilation pipeline: parse, an explicit ordered chain of tree
//! filters, then code generation into an executable [`Template`].

use crate::errors::Result;
use crate::parser::{self, Node};
use crate::template::Template;

mod block;
mod escape;
mod generator;
mod trim;

pub use self::block::BlockFilter;
pub use self::escape::EscapeFilter;
pub use self::trim::TrimFilter;

/// One tree-in, tree-out transformation stage.
pub trait Filter {
    fn apply(&self, template: &str, nodes: Vec<Node>) -> Result<Vec<Node>>;
}

/// Compiles template source into executable [`Template`]s.
///
/// The filter chain is an explicit ordered list passed at construction; no
/// global registry. Every stage is pure, so a failed compile leaves no
/// state behind, and a compiled template never fails for syntax reasons
/// mid-render.
pub struct Engine {
    filters: Vec<Box<dyn Filter + Send + Sync>>,
}

impl Engine {
    /// The standard pipeline: block scoping, whitespace trimming, then
    /// escaping.
    pub fn new() -> Engine {
        Engine::with_filters(vec![
            Box::new(BlockFilter),
            Box::new(TrimFilter),
            Box::new(EscapeFilter),
        ])
    }

    /// An engine with a custom filter chain. The generator still insists
    /// that every interpolation carries an escaping decision, so dropping
    /// [`EscapeFilter`] yields compile errors, not unescaped output.
    pub fn with_filters(filters: Vec<Box<dyn Filter + Send + Sync>>) -> Engine {
        Engine { filters }
    }

    /// Compiles `source` into a template named `name`. All failures,
    /// including malformed embedded code, surface here and never at render
    /// time.
    pub fn compile(&self, name: &str, source: &str) -> Result<Template> {
        let mut nodes = parser::parse(name, source)?;
        for filter in &self.filters {
            nodes = filter.apply(name, nodes)?;
        }
        let program = generator::generate(name, nodes)?;
        Ok(Template::new(name, program))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

pub(crate) use self::generator::{Op, Program};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_literal_template() {
        let template = Engine::new().compile("t", "<p>hello</p>").unwrap();
        assert!(template.is_static());
    }

    #[test]
    fn test_compile_fails_without_escape_filter() {
        let engine = Engine::with_filters(vec![Box::new(BlockFilter), Box::new(TrimFilter)]);
        let err = engine.compile("t", "<%= name %>").unwrap_err();
        assert!(err.to_string().contains("escape"));
    }

    #[test]
    fn test_compile_fails_on_bad_code() {
        let err = Engine::new().compile("t", "a\n<%= 1 + %>").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
