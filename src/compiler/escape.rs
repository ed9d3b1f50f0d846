use crate::compiler::Filter;
use crate::errors::Result;
use crate::parser::Node;

/// Decides escaping for every interpolation: expressions escape by default
/// and route through the buffer's escape-on-append path, while expressions
/// explicitly marked raw (`<%==`) bypass it.
///
/// This stage is the only producer of `Write` nodes; the generator refuses
/// anything else, so an interpolation can never reach output without an
/// escaping decision.
pub struct EscapeFilter;

impl Filter for EscapeFilter {
    fn apply(&self, _template: &str, nodes: Vec<Node>) -> Result<Vec<Node>> {
        Ok(nodes
            .into_iter()
            .map(|node| match node {
                Node::Interp { expr, raw, block_open } => {
                    Node::Write { expr, escape: !raw, block_open }
                }
                other => other,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Expr;

    #[test]
    fn test_escapes_by_default_and_honours_raw() {
        let nodes = vec![
            Node::Interp { expr: Expr::var("a"), raw: false, block_open: false },
            Node::Interp { expr: Expr::var("b"), raw: true, block_open: false },
            Node::Text("x".to_string()),
        ];
        let nodes = EscapeFilter.apply("t", nodes).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Write { expr: Expr::var("a"), escape: true, block_open: false },
                Node::Write { expr: Expr::var("b"), escape: false, block_open: false },
                Node::Text("x".to_string()),
            ]
        );
    }
}
