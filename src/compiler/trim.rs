use crate::compiler::Filter;
use crate::errors::Result;
use crate::parser::Node;

/// Removes the whitespace scaffolding of control-flow lines.
///
/// The policy is line-oriented: when a run of control tags sits alone on
/// its line (nothing but indentation before it, nothing but whitespace
/// after it up to the newline), the indentation and the whitespace-only
/// remainder of the line are collapsed. Lines with literal output are never
/// touched. Whitespace-only lines directly following a trimmed control line
/// collapse with it, which keeps the filter idempotent.
///
/// Decisions are made against the untrimmed tree and applied afterwards, so
/// one tag's trimming never changes how its neighbours are judged.
pub struct TrimFilter;

fn is_hws(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// The trailing segment of `s` after its last newline.
fn line_tail(s: &str) -> &str {
    match s.rfind('\n') {
        Some(pos) => &s[pos + 1..],
        None => s,
    }
}

/// Byte length of the leading run of whitespace-only lines in `s`.
fn blank_prefix_len(s: &str) -> usize {
    let mut cut = 0;
    for line in s.split_inclusive('\n') {
        if line.ends_with('\n') && line[..line.len() - 1].chars().all(is_hws) {
            cut += line.len();
        } else {
            break;
        }
    }
    cut
}

impl Filter for TrimFilter {
    fn apply(&self, _template: &str, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut trim_tail = vec![false; nodes.len()];
        let mut trim_head = vec![false; nodes.len()];

        let mut i = 0;
        while i < nodes.len() {
            if !nodes[i].is_control() {
                i += 1;
                continue;
            }
            // a run of adjacent control tags counts as one line unit
            let mut j = i;
            while j + 1 < nodes.len() && nodes[j + 1].is_control() {
                j += 1;
            }

            let at_line_start = if i == 0 {
                true
            } else {
                match &nodes[i - 1] {
                    Node::Text(s) => {
                        line_tail(s).chars().all(is_hws) && (s.contains('\n') || i == 1)
                    }
                    _ => false,
                }
            };

            let at_line_end = match nodes.get(j + 1) {
                None => true,
                Some(Node::Text(s)) => {
                    blank_prefix_len(s) > 0
                        || (j + 2 == nodes.len() && s.chars().all(is_hws))
                }
                Some(_) => false,
            };

            if at_line_start && at_line_end {
                if i > 0 {
                    trim_tail[i - 1] = true;
                }
                if j + 1 < nodes.len() {
                    trim_head[j + 1] = true;
                }
            }

            i = j + 1;
        }

        let mut out = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.into_iter().enumerate() {
            match node {
                Node::Text(s) => {
                    let head_cut = if trim_head[i] {
                        let cut = blank_prefix_len(&s);
                        // a whitespace-only tail of the template vanishes
                        if cut == 0 && s.chars().all(is_hws) {
                            s.len()
                        } else {
                            cut
                        }
                    } else {
                        0
                    };
                    let tail_start = if trim_tail[i] {
                        s.rfind('\n').map(|pos| pos + 1).unwrap_or(0).max(head_cut)
                    } else {
                        s.len()
                    };
                    let trimmed = s[head_cut..tail_start].to_string();
                    if !trimmed.is_empty() {
                        out.push(Node::Text(trimmed));
                    }
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}
