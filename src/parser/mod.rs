//! Turns template source text into a flat sequence of [`Node`]s: literal
//! text runs and embedded-code tags. Tag code is kept as raw strings here;
//! classifying it is the block filter's job.

use crate::errors::{Error, Result};

pub mod ast;
pub mod expr;

pub use self::ast::Node;

/// Recognized tag openers, longest first so `<%==` wins over `<%=`.
const RAW_OUTPUT: &str = "<%==";
const OUTPUT: &str = "<%=";
const COMMENT: &str = "<%#";
const LITERAL: &str = "<%%";
const STMT: &str = "<%";
const CLOSE: &str = "%>";

/// Parses `source` into a flat node list. Fails with
/// [`ErrorKind::Syntax`](crate::ErrorKind::Syntax) on an unclosed tag.
pub fn parse(template: &str, source: &str) -> Result<Vec<Node>> {
    let mut nodes = vec![];
    let mut text = String::new();
    let mut rest = source;
    let mut line = 1;

    while let Some(start) = rest.find(STMT) {
        let (before, at_tag) = rest.split_at(start);
        text.push_str(before);
        line += before.matches('\n').count();

        // `<%%` is a literal `<%`
        if at_tag.starts_with(LITERAL) {
            text.push_str(STMT);
            rest = &at_tag[LITERAL.len()..];
            continue;
        }

        if !text.is_empty() {
            nodes.push(Node::Text(std::mem::take(&mut text)));
        }

        let (opener, raw, comment) = if at_tag.starts_with(RAW_OUTPUT) {
            (RAW_OUTPUT, true, false)
        } else if at_tag.starts_with(OUTPUT) {
            (OUTPUT, false, false)
        } else if at_tag.starts_with(COMMENT) {
            (COMMENT, false, true)
        } else {
            (STMT, false, false)
        };

        let after_opener = &at_tag[opener.len()..];
        let close = after_opener.find(CLOSE).ok_or_else(|| {
            Error::syntax(template, line, format!("`{}` tag is never closed", opener))
        })?;
        let code = &after_opener[..close];
        let tag_line = line;
        line += code.matches('\n').count();

        if !comment {
            let code = code.trim().to_string();
            if raw || opener == OUTPUT {
                nodes.push(Node::Output { code, raw, line: tag_line });
            } else {
                nodes.push(Node::Stmt { code, line: tag_line });
            }
        }

        rest = &after_opener[close + CLOSE.len()..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        nodes.push(Node::Text(text));
    }

    Ok(nodes)
}
