//! Backslash escape resolution.
//!
//! `\` before a newline is a hard line break; before ASCII punctuation it
//! suppresses the character's markup meaning and yields the literal
//! character; before anything else (or at end of input) the backslash
//! itself is literal text.

use super::ResolutionContext;
use crate::ast::{NodeId, NodeValue, Tree};
use crate::token;

pub(super) fn parse_backslash(tree: &mut Tree, cx: &mut ResolutionContext) -> NodeId {
    if cx.pos + 1 >= cx.tokens.len() {
        // Trailing backslash: literal, and the block is done.
        cx.pos = cx.tokens.len();
        return tree.alloc(NodeValue::Text("\\".to_string()));
    }
    cx.pos += 1;
    let t = cx.tokens[cx.pos];
    if t == token::NEWLINE {
        cx.pos += 1;
        tree.alloc(NodeValue::HardBreak)
    } else if token::is_ascii_punct(t) {
        cx.pos += 1;
        tree.alloc(NodeValue::Text((t as char).to_string()))
    } else {
        // The escaped character was ordinary; the backslash is literal and
        // the cursor stays on the character for the text segmenter.
        tree.alloc(NodeValue::Text("\\".to_string()))
    }
}
