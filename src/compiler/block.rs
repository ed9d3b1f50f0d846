use crate::compiler::Filter;
use crate::errors::{Error, Result};
use crate::parser::expr::{parse_output, parse_statement, StmtKind};
use crate::parser::Node;

/// Classifies every embedded code fragment, rewriting block boundaries so
/// that later stages nest literal text inside the block's scope instead of
/// after it.
///
/// `Stmt` nodes become `Open`/`Elsif`/`Else`/`End`/`Eval`; `Output` nodes
/// become `Interp`, with `block_open` set when the expression takes the
/// following content as its block.
pub struct BlockFilter;

impl Filter for BlockFilter {
    fn apply(&self, template: &str, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Stmt { code, line } => {
                    let kind = parse_statement(&code)
                        .map_err(|message| Error::syntax(template, line, message))?;
                    out.push(match kind {
                        StmtKind::Open(head) => Node::Open(head),
                        StmtKind::Elsif(cond) => Node::Elsif(cond),
                        StmtKind::Else => Node::Else,
                        StmtKind::End => Node::End,
                        StmtKind::Eval(expr) => Node::Eval(expr),
                    });
                }
                Node::Output { code, raw, line } => {
                    let (expr, block_open) = parse_output(&code)
                        .map_err(|message| Error::syntax(template, line, message))?;
                    out.push(Node::Interp { expr, raw, block_open });
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{BlockHead, Expr};

    fn filter(source: &str) -> Result<Vec<Node>> {
        BlockFilter.apply("t", crate::parser::parse("t", source).unwrap())
    }

    #[test]
    fn test_classifies_statements() {
        let nodes = filter("<% users.each do |u| %><% end %>").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Open(BlockHead::Each { target: Expr::var("users"), var: "u".to_string() }),
                Node::End,
            ]
        );
    }

    #[test]
    fn test_classifies_outputs() {
        let nodes = filter("<%= name %><%== markup %>").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Interp { expr: Expr::var("name"), raw: false, block_open: false },
                Node::Interp { expr: Expr::var("markup"), raw: true, block_open: false },
            ]
        );
    }

    #[test]
    fn test_bad_code_reports_template_and_line() {
        let err = filter("line\n<% users.each do %>").unwrap_err();
        assert!(err.to_string().contains("'t' at line 2"));
    }
}
