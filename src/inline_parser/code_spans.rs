//! Backtick code spans.
//!
//! The opening run must be matched by a later run of exactly the same
//! length; otherwise the opening run is literal text. Matched content gets
//! the usual normalization: newlines become spaces, and one space is
//! stripped from each end when both are present and the span is not all
//! spaces. Code span content is never rescanned.

use super::ResolutionContext;
use crate::ast::{NodeId, NodeValue, Tree};
use crate::token;

pub(super) fn parse_code_span(tree: &mut Tree, cx: &mut ResolutionContext) -> NodeId {
    let tokens = cx.tokens;
    let start = cx.pos;
    let mut open_end = start;
    while open_end < tokens.len() && tokens[open_end] == token::BACKTICK {
        open_end += 1;
    }
    let fence = open_end - start;

    // Find a closing run of exactly the fence length.
    let mut p = open_end;
    let mut close_start = None;
    while p < tokens.len() && tokens[p] != token::END {
        if tokens[p] == token::BACKTICK {
            let run_start = p;
            while p < tokens.len() && tokens[p] == token::BACKTICK {
                p += 1;
            }
            if p - run_start == fence {
                close_start = Some(run_start);
                break;
            }
        } else {
            p += 1;
        }
    }

    let Some(close_start) = close_start else {
        cx.pos = open_end;
        return tree.alloc(NodeValue::Text("`".repeat(fence)));
    };

    let mut content: String = String::from_utf8_lossy(&tokens[open_end..close_start])
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if content.len() >= 2
        && content.starts_with(' ')
        && content.ends_with(' ')
        && !content.chars().all(|c| c == ' ')
    {
        content = content[1..content.len() - 1].to_string();
    }

    log::trace!("code span ({} backticks): {:?}", fence, content);
    cx.pos = close_start + fence;
    tree.alloc(NodeValue::CodeSpan(content))
}
