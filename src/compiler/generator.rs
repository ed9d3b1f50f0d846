use crate::errors::{Error, Result};
use crate::parser::ast::{BlockHead, Call, Expr, Node};

/// One executable instruction of a compiled template.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Op {
    /// Literal template text, appended without escaping
    Static(String),
    /// An interpolated expression
    Write { expr: Expr, escape: bool },
    /// A statement expression, evaluated for effect only
    Eval(Expr),
    /// Iteration with the loop variable bound per item
    Each { target: Expr, var: String, body: Vec<Op> },
    /// Conditional arms in order, with an optional else body
    If { arms: Vec<(Expr, Vec<Op>)>, otherwise: Option<Vec<Op>> },
    /// A call whose block is the enclosed body (`<%= render :layout do %>`)
    WriteBlock { call: Call, escape: bool, body: Vec<Op> },
}

/// The executable form of a template.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Program {
    pub ops: Vec<Op>,
    /// Whether the whole program is compile-time constant
    pub is_static: bool,
}

enum Frame {
    Each { target: Expr, var: String },
    If { arms: Vec<(Expr, Vec<Op>)>, pending: Option<Expr> },
    WriteBlock { call: Call, escape: bool },
}

struct Level {
    frame: Option<Frame>,
    ops: Vec<Op>,
}

/// Nests the flat, filtered node list into ops, coalesces adjacent literal
/// runs, and classifies the program as static or dynamic.
pub(crate) fn generate(template: &str, nodes: Vec<Node>) -> Result<Program> {
    let mut stack = vec![Level { frame: None, ops: vec![] }];

    for node in nodes {
        match node {
            Node::Text(s) => top(&mut stack).ops.push(Op::Static(s)),
            Node::Write { expr, escape, block_open: false } => {
                top(&mut stack).ops.push(Op::Write { expr, escape })
            }
            Node::Write { expr, escape, block_open: true } => match expr {
                Expr::Var(call) => {
                    stack.push(Level { frame: Some(Frame::WriteBlock { call, escape }), ops: vec![] })
                }
                _ => {
                    return Err(Error::msg(format!(
                        "Template '{}': only a call can take a block",
                        template
                    )))
                }
            },
            Node::Eval(expr) => top(&mut stack).ops.push(Op::Eval(expr)),
            Node::Open(BlockHead::Each { target, var }) => {
                stack.push(Level { frame: Some(Frame::Each { target, var }), ops: vec![] })
            }
            Node::Open(BlockHead::If(cond)) => stack.push(Level {
                frame: Some(Frame::If { arms: vec![], pending: Some(cond) }),
                ops: vec![],
            }),
            Node::Elsif(cond) => {
                let level = top(&mut stack);
                match level.frame {
                    Some(Frame::If { ref mut arms, ref mut pending }) => match pending.take() {
                        Some(prev) => {
                            arms.push((prev, std::mem::take(&mut level.ops)));
                            *pending = Some(cond);
                        }
                        None => {
                            return Err(Error::msg(format!(
                                "Template '{}': `elsif` found after `else`",
                                template
                            )))
                        }
                    },
                    _ => {
                        return Err(Error::msg(format!(
                            "Template '{}': `elsif` outside of an `if` block",
                            template
                        )))
                    }
                }
            }
            Node::Else => {
                let level = top(&mut stack);
                match level.frame {
                    Some(Frame::If { ref mut arms, ref mut pending }) => match pending.take() {
                        Some(prev) => arms.push((prev, std::mem::take(&mut level.ops))),
                        None => {
                            return Err(Error::msg(format!(
                                "Template '{}': more than one `else` in an `if` block",
                                template
                            )))
                        }
                    },
                    _ => {
                        return Err(Error::msg(format!(
                            "Template '{}': `else` outside of an `if` block",
                            template
                        )))
                    }
                }
            }
            Node::End => {
                let level = stack.pop().filter(|l| l.frame.is_some()).ok_or_else(|| {
                    Error::msg(format!("Template '{}': unexpected `end` tag", template))
                })?;
                let body = level.ops;
                let op = match level.frame.unwrap() {
                    Frame::Each { target, var } => Op::Each { target, var, body },
                    Frame::WriteBlock { call, escape } => Op::WriteBlock { call, escape, body },
                    Frame::If { mut arms, pending } => {
                        let otherwise = match pending {
                            Some(cond) => {
                                arms.push((cond, body));
                                None
                            }
                            None => Some(body),
                        };
                        Op::If { arms, otherwise }
                    }
                };
                top(&mut stack).ops.push(op);
            }
            Node::Interp { .. } => {
                return Err(Error::msg(format!(
                    "Template '{}': interpolation reached the generator without an escaping \
                     decision; the pipeline is missing its escape filter",
                    template
                )))
            }
            Node::Stmt { line, .. } | Node::Output { line, .. } => {
                return Err(Error::syntax(
                    template,
                    line,
                    "embedded code reached the generator unclassified; the pipeline is missing \
                     its block filter",
                ))
            }
        }
    }

    if stack.len() > 1 {
        return Err(Error::msg(format!(
            "Template '{}': a block is never closed with `end`",
            template
        )));
    }

    let ops = merge_statics(stack.pop().map(|l| l.ops).unwrap_or_default());
    let is_static = ops.iter().all(|op| matches!(op, Op::Static(_)));
    Ok(Program { ops, is_static })
}

fn top(stack: &mut Vec<Level>) -> &mut Level {
    // the root level is never popped
    stack.last_mut().unwrap()
}

/// Coalesces adjacent static runs, recursing into block bodies.
fn merge_statics(ops: Vec<Op>) -> Vec<Op> {
    let mut out: Vec<Op> = Vec::with_capacity(ops.len());

    for op in ops {
        let op = match op {
            Op::Each { target, var, body } => {
                Op::Each { target, var, body: merge_statics(body) }
            }
            Op::If { arms, otherwise } => Op::If {
                arms: arms.into_iter().map(|(cond, body)| (cond, merge_statics(body))).collect(),
                otherwise: otherwise.map(merge_statics),
            },
            Op::WriteBlock { call, escape, body } => {
                Op::WriteBlock { call, escape, body: merge_statics(body) }
            }
            other => other,
        };

        match (out.last_mut(), op) {
            (Some(Op::Static(prev)), Op::Static(s)) => prev.push_str(&s),
            (_, op) => out.push(op),
        }
    }

    out
}
