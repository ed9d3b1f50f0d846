use crate::buffer::SafeString;
use crate::compiler::Program;
use crate::errors::Result;
use crate::renderer::Renderer;
use crate::rendering::BlockFn;
use crate::scope::Scope;

/// The executable unit produced by the compilation pipeline.
///
/// Immutable after generation: invoking it only reads the program and
/// writes into a fresh per-invocation buffer, so compiled templates may be
/// cached and shared across concurrent renders without locking.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    name: String,
    program: Program,
}

impl Template {
    pub(crate) fn new(name: &str, program: Program) -> Template {
        Template { name: name.to_string(), program }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the template is compile-time constant: no embedded code
    /// survived compilation.
    pub fn is_static(&self) -> bool {
        self.program.is_static
    }

    /// Renders against `scope`, resolving every unbound name through the
    /// scope's dynamic member resolution.
    pub fn render(&self, scope: &Scope) -> Result<SafeString> {
        self.render_with_block(scope, None)
    }

    /// Renders with inline content for the template's `yield`.
    pub fn render_with_block(
        &self,
        scope: &Scope,
        block: Option<&BlockFn<'_>>,
    ) -> Result<SafeString> {
        Renderer::new(&self.program, block).render(scope)
    }
}
