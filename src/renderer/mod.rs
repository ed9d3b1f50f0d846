//! Executes compiled programs against a scope, writing into an escaping
//! buffer.

use std::cmp::Ordering;

use serde_json::Value;

use crate::buffer::{EscapingBuffer, SafeString};
use crate::compiler::{Op, Program};
use crate::errors::{Error, Result};
use crate::parser::ast::{BinOp, Call, Expr};
use crate::part;
use crate::rendering::BlockFn;
use crate::scope::{PartialName, Scope};
use crate::value::{Locals, ScopeValue};

/// Walks a program's ops, evaluating embedded expressions through the
/// scope's member resolution. One renderer lives for one invocation; no
/// error is caught here, everything propagates to the caller.
pub(crate) struct Renderer<'a> {
    program: &'a Program,
    /// Inline content for this template's `yield`
    block: Option<&'a BlockFn<'a>>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(program: &'a Program, block: Option<&'a BlockFn<'a>>) -> Renderer<'a> {
        Renderer { program, block }
    }

    pub(crate) fn render(&self, scope: &Scope) -> Result<SafeString> {
        let mut buffer = EscapingBuffer::new();
        self.render_ops(&self.program.ops, scope, &mut buffer)?;
        Ok(buffer.into_safe())
    }

    fn render_ops(&self, ops: &[Op], scope: &Scope, buffer: &mut EscapingBuffer) -> Result<()> {
        for op in ops {
            match op {
                Op::Static(s) => buffer.append_safe(s),
                Op::Write { expr, escape } => {
                    let value = self.eval(expr, scope)?;
                    if *escape {
                        buffer.append(value.to_chunk());
                    } else {
                        buffer.append_safe(&value.to_plain());
                    }
                }
                Op::Eval(expr) => {
                    self.eval(expr, scope)?;
                }
                Op::Each { target, var, body } => {
                    let items = self.eval(target, scope)?.iter_items()?;
                    for item in items {
                        let mut locals = Locals::new();
                        locals.insert(var.clone(), item);
                        let inner = scope.extended(locals);
                        self.render_ops(body, &inner, buffer)?;
                    }
                }
                Op::If { arms, otherwise } => {
                    let mut taken = false;
                    for (cond, body) in arms {
                        if self.eval(cond, scope)?.is_truthy() {
                            self.render_ops(body, scope, buffer)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        if let Some(body) = otherwise {
                            self.render_ops(body, scope, buffer)?;
                        }
                    }
                }
                Op::WriteBlock { call, escape, body } => {
                    // the body renders lazily, once per `yield` in the callee
                    let block_fn = || -> Result<SafeString> {
                        let mut inner = EscapingBuffer::new();
                        self.render_ops(body, scope, &mut inner)?;
                        Ok(inner.into_safe())
                    };
                    let block: &BlockFn<'_> = &block_fn;
                    let value = self.eval_call(call, scope, Some(block))?;
                    if *escape {
                        buffer.append(value.to_chunk());
                    } else {
                        buffer.append_safe(&value.to_plain());
                    }
                }
            }
        }

        Ok(())
    }

    fn eval(&self, expr: &Expr, scope: &Scope) -> Result<ScopeValue> {
        match expr {
            Expr::Lit(value) => Ok(ScopeValue::Json(value.clone())),
            Expr::Var(call) => self.eval_call(call, scope, None),
            Expr::Attr { base, member } => {
                if !member.kwargs.is_empty() {
                    return Err(Error::msg(format!(
                        "keyword arguments are not supported on member `{}`",
                        member.name
                    )));
                }
                let base = self.eval(base, scope)?;
                let args = self.eval_args(&member.args, scope)?;
                part::value_member(&base, &member.name, &args)
            }
            Expr::Index { base, index } => {
                let base = self.eval(base, scope)?;
                let index = self.eval(index, scope)?;
                part::index_value(&base, &index)
            }
            Expr::Not(inner) => Ok(ScopeValue::from(!self.eval(inner, scope)?.is_truthy())),
            Expr::Binary { lhs, op, rhs } => self.eval_binary(lhs, *op, rhs, scope),
        }
    }

    fn eval_binary(&self, lhs: &Expr, op: BinOp, rhs: &Expr, scope: &Scope) -> Result<ScopeValue> {
        match op {
            BinOp::And => {
                let lhs = self.eval(lhs, scope)?;
                if !lhs.is_truthy() {
                    return Ok(ScopeValue::from(false));
                }
                Ok(ScopeValue::from(self.eval(rhs, scope)?.is_truthy()))
            }
            BinOp::Or => {
                let lhs = self.eval(lhs, scope)?;
                if lhs.is_truthy() {
                    return Ok(ScopeValue::from(true));
                }
                Ok(ScopeValue::from(self.eval(rhs, scope)?.is_truthy()))
            }
            BinOp::Eq => Ok(ScopeValue::from(self.eval(lhs, scope)? == self.eval(rhs, scope)?)),
            BinOp::NotEq => Ok(ScopeValue::from(self.eval(lhs, scope)? != self.eval(rhs, scope)?)),
            BinOp::Gt | BinOp::Gte | BinOp::Lt | BinOp::Lte => {
                let ordering = compare(&self.eval(lhs, scope)?, &self.eval(rhs, scope)?)?;
                Ok(ScopeValue::from(match op {
                    BinOp::Gt => ordering == Ordering::Greater,
                    BinOp::Gte => ordering != Ordering::Less,
                    BinOp::Lt => ordering == Ordering::Less,
                    BinOp::Lte => ordering != Ordering::Greater,
                    _ => unreachable!(),
                }))
            }
        }
    }

    fn eval_call(
        &self,
        call: &Call,
        scope: &Scope,
        block: Option<&BlockFn<'_>>,
    ) -> Result<ScopeValue> {
        // only `render` forwards a block; there is no block channel through
        // the resolution chain, so dropping the content silently is not an
        // option
        if block.is_some() && call.name != "render" {
            return Err(Error::msg(format!(
                "only `render` can take a block, not `{}`",
                call.name
            )));
        }

        // intrinsics come before the resolution chain, like real methods
        // beat method_missing
        match call.name.as_str() {
            "render" => return self.eval_render(call, scope, block),
            "yield" => {
                return match self.block {
                    Some(block) => block().map(ScopeValue::Safe),
                    None => Err(Error::msg("no block given to yield")),
                }
            }
            "_format" if call.is_bare() => return Ok(scope.format_value()),
            "_context" if call.is_bare() => return Ok(scope.context_value()),
            "_locals" if call.is_bare() => return Ok(ScopeValue::Map(scope.locals().clone())),
            _ => {}
        }

        if !call.kwargs.is_empty() {
            return Err(Error::msg(format!(
                "keyword arguments are only supported on `render`, not `{}`",
                call.name
            )));
        }

        let args = self.eval_args(&call.args, scope)?;
        scope.resolve(&call.name, &args)
    }

    fn eval_render(
        &self,
        call: &Call,
        scope: &Scope,
        block: Option<&BlockFn<'_>>,
    ) -> Result<ScopeValue> {
        if call.args.len() > 1 {
            return Err(Error::msg("`render` takes at most one partial name"));
        }

        let name = match call.args.first() {
            None => None,
            Some(expr) => match self.eval(expr, scope)? {
                ScopeValue::Json(Value::String(name)) => Some(PartialName::Name(name)),
                other => {
                    return Err(Error::msg(format!(
                        "a partial name must be a string or symbol, got `{}`",
                        other.to_plain()
                    )))
                }
            },
        };

        let mut locals = Locals::new();
        for (key, expr) in &call.kwargs {
            locals.insert(key.clone(), self.eval(expr, scope)?);
        }

        scope.render(name, locals, block).map(ScopeValue::Safe)
    }

    fn eval_args(&self, exprs: &[Expr], scope: &Scope) -> Result<Vec<ScopeValue>> {
        exprs.iter().map(|expr| self.eval(expr, scope)).collect()
    }
}

/// Ordering for `<`/`>` style comparisons: numbers and strings only.
fn compare(lhs: &ScopeValue, rhs: &ScopeValue) -> Result<Ordering> {
    match (lhs.to_json_value(), rhs.to_json_value()) {
        (Value::Number(a), Value::Number(b)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                    Error::msg("cannot compare NaN")
                }),
                _ => Err(Error::msg("cannot compare these numbers")),
            }
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(&b)),
        (a, b) => Err(Error::msg(format!("cannot compare `{}` with `{}`", a, b))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::compiler::Engine;
    use crate::locals;
    use crate::rendering::RenderingMissing;

    fn render(source: &str, locals: Locals) -> Result<SafeString> {
        let template = Engine::new().compile("t", source)?;
        let scope = Scope::new(None, locals, Arc::new(RenderingMissing));
        template.render(&scope)
    }

    #[test]
    fn test_literal_round_trip() {
        assert_eq!(render("<p>hi & bye</p>", Locals::new()).unwrap(), "<p>hi & bye</p>");
    }

    #[test]
    fn test_interpolation_escapes_by_default() {
        let out = render("<%= markup %>", locals! { markup => "<b>\"x\"&</b>" }).unwrap();
        assert_eq!(out, "&lt;b&gt;&quot;x&quot;&amp;&lt;&#x2f;b&gt;");
    }

    #[test]
    fn test_raw_interpolation_is_unescaped() {
        let out = render("<%== markup %>", locals! { markup => "<b>x</b>" }).unwrap();
        assert_eq!(out, "<b>x</b>");
    }

    #[test]
    fn test_each_binds_the_loop_variable() {
        let out = render(
            "<% names.each do |n| %><%= n %>,<% end %>",
            locals! { names => json!(["a", "b"]) },
        )
        .unwrap();
        assert_eq!(out, "a,b,");
    }

    #[test]
    fn test_if_elsif_else() {
        let source = "<% if a %>A<% elsif b %>B<% else %>C<% end %>";
        assert_eq!(render(source, locals! { a => true, b => false }).unwrap(), "A");
        assert_eq!(render(source, locals! { a => false, b => true }).unwrap(), "B");
        assert_eq!(render(source, locals! { a => false, b => false }).unwrap(), "C");
    }

    #[test]
    fn test_comparisons() {
        let source = "<% if count > 1 %>many<% else %>one<% end %>";
        assert_eq!(render(source, locals! { count => 3 }).unwrap(), "many");
        assert_eq!(render(source, locals! { count => 1 }).unwrap(), "one");
    }

    #[test]
    fn test_indexing_and_members() {
        let out = render(
            "<%= users[0].name %>/<%= users.size %>",
            locals! { users => json!([{"name": "Jane"}, {"name": "Teresa"}]) },
        )
        .unwrap();
        assert_eq!(out, "Jane/2");
    }

    #[test]
    fn test_blocks_on_plain_calls_are_rejected() {
        let err = render(
            "<%= greeting do %>important body<% end %>",
            locals! { greeting => "hi" },
        )
        .unwrap_err();
        assert!(err.to_string().contains("only `render` can take a block"));
    }

    #[test]
    fn test_yield_without_block_fails() {
        let err = render("<%= yield %>", Locals::new()).unwrap_err();
        assert!(err.to_string().contains("yield"));
    }

    #[test]
    fn test_unresolved_member_propagates() {
        let err = render("<%= missing %>", Locals::new()).unwrap_err();
        assert!(matches!(err.kind, crate::ErrorKind::NoMember(ref name) if name == "missing"));
    }
}
