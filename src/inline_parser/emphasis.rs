//! Delimiter stack and emphasis resolution.
//!
//! Runs of `*`, `_`, and `~` are recorded as they are scanned, each with
//! the flanking verdict that decides whether the run may open and/or close
//! emphasis. Nothing is matched during the scan: a run stays a literal
//! text node until [`process_emphasis`] pairs openers with closers after
//! the block's scan completes (or, scoped, when a link or image is
//! finalized over a sub-range) and splices the matched spans into
//! `Emphasis`/`Strong`/`Strikethrough` nodes.

use super::ResolutionContext;
use crate::ast::{NodeId, NodeValue, Tree};
use crate::token;

/// One recorded delimiter run.
#[derive(Debug)]
pub(super) struct Delimiter {
    /// The literal text node currently holding the run.
    pub node: NodeId,
    /// Marker byte: `*`, `_`, or `~`.
    pub ch: u8,
    /// Marks remaining in the run.
    pub count: usize,
    /// Original run length, for the multiple-of-3 rule.
    pub orig_count: usize,
    pub can_open: bool,
    pub can_close: bool,
}

/// Record a delimiter run: append its literal text node to the block and
/// push a stack entry when the run can participate in emphasis at all. A
/// run that can neither open nor close is already resolved as plain text.
pub(super) fn handle_delim(tree: &mut Tree, cx: &mut ResolutionContext, block: NodeId) {
    let start = cx.pos;
    let ch = cx.tokens[start];
    let mut end = start;
    while end < cx.tokens.len() && cx.tokens[end] == ch {
        end += 1;
    }
    let count = end - start;
    cx.pos = end;

    let (can_open, can_close) = scan_flanking(cx.tokens, start, end, ch);
    log::trace!(
        "delimiter run {}x{:?}: can_open={can_open} can_close={can_close}",
        count,
        ch as char,
    );

    let run = String::from_utf8_lossy(&cx.tokens[start..end]).into_owned();
    let node = tree.alloc(NodeValue::Text(run));
    tree.append_child(block, node);

    if can_open || can_close {
        cx.delimiters.push(Delimiter {
            node,
            ch,
            count,
            orig_count: count,
            can_open,
            can_close,
        });
    }
}

/// The left/right-flanking test over the token alphabet. Sequence
/// boundaries count as whitespace. Underscore runs additionally may not be
/// both-flanking unless bounded by punctuation (no intraword `_`).
fn scan_flanking(tokens: &[u8], start: usize, end: usize, ch: u8) -> (bool, bool) {
    let before = if start == 0 {
        token::NEWLINE
    } else {
        tokens[start - 1]
    };
    let after = match tokens.get(end) {
        Some(&t) if t != token::END => t,
        _ => token::NEWLINE,
    };

    let ws_after = token::is_whitespace(after);
    let punct_after = token::is_ascii_punct(after);
    let ws_before = token::is_whitespace(before);
    let punct_before = token::is_ascii_punct(before);

    let left_flanking = !ws_after && (!punct_after || ws_before || punct_before);
    let right_flanking = !ws_before && (!punct_before || ws_after || punct_after);

    if ch == token::UNDERSCORE {
        (
            left_flanking && (!right_flanking || punct_before),
            right_flanking && (!left_flanking || punct_after),
        )
    } else {
        (left_flanking, right_flanking)
    }
}

/// The multiple-of-3 rule: when either run of a candidate pair can both
/// open and close, the pair is blocked if the original lengths sum to a
/// multiple of 3 without both being multiples of 3 (prevents the
/// `*foo**bar*` misparse). Tilde runs are exempt.
fn odd_match(opener: &Delimiter, closer: &Delimiter) -> bool {
    if opener.ch == token::TILDE {
        return false;
    }
    (closer.can_open || opener.can_close)
        && (opener.orig_count + closer.orig_count) % 3 == 0
        && !(opener.orig_count % 3 == 0 && closer.orig_count % 3 == 0)
}

/// Resolve delimiters above `stack_bottom` into emphasis nodes.
///
/// Closers are taken bottom-to-top; each scans downward for the nearest
/// compatible opener. A match consumes two marks per side when both runs
/// still hold at least two (`Strong`), otherwise one (`Emphasis`); tilde
/// matches become `Strikethrough` either way. Every tree node strictly
/// between the opener's and closer's literal runs is reparented into the
/// new node. Used-up openers are never reconsidered; whatever remains
/// above `stack_bottom` on return has been dropped, its text left literal.
pub(super) fn process_emphasis(tree: &mut Tree, cx: &mut ResolutionContext, stack_bottom: usize) {
    let mut closer = stack_bottom;
    while closer < cx.delimiters.len() {
        if !cx.delimiters[closer].can_close {
            closer += 1;
            continue;
        }

        let opener = (stack_bottom..closer).rev().find(|&j| {
            let o = &cx.delimiters[j];
            o.can_open
                && o.ch == cx.delimiters[closer].ch
                && !odd_match(o, &cx.delimiters[closer])
        });
        let Some(opener) = opener else {
            if !cx.delimiters[closer].can_open {
                // Can never match anything; its text stays literal.
                cx.delimiters.remove(closer);
            } else {
                closer += 1;
            }
            continue;
        };

        let use_delims =
            if cx.delimiters[opener].count >= 2 && cx.delimiters[closer].count >= 2 {
                2
            } else {
                1
            };
        let ch = cx.delimiters[closer].ch;
        let value = if ch == token::TILDE {
            NodeValue::Strikethrough
        } else if use_delims == 2 {
            NodeValue::Strong
        } else {
            NodeValue::Emphasis
        };
        let opener_node = cx.delimiters[opener].node;
        let closer_node = cx.delimiters[closer].node;
        log::debug!("emphasis match: {} marks of {:?}", use_delims, ch as char);

        shrink_run(tree, &mut cx.delimiters[opener], use_delims);
        shrink_run(tree, &mut cx.delimiters[closer], use_delims);

        // Splice the new node in right after the opener's run and hand it
        // every sibling up to the closer's run.
        let emph = tree.alloc(value);
        tree.insert_after(opener_node, emph);
        let mut child = tree.next(emph);
        while let Some(node) = child {
            if node == closer_node {
                break;
            }
            let continuation = tree.unlink(node);
            tree.append_child(emph, node);
            child = continuation;
        }

        // Entries between the pair can no longer match across it.
        cx.delimiters.drain(opener + 1..closer);
        let mut closer_idx = opener + 1;
        if cx.delimiters[opener].count == 0 {
            tree.unlink(opener_node);
            cx.delimiters.remove(opener);
            closer_idx -= 1;
        }
        if cx.delimiters[closer_idx].count == 0 {
            tree.unlink(closer_node);
            cx.delimiters.remove(closer_idx);
        }
        closer = closer_idx;
    }

    // Unmatched entries are dropped; their literal runs stay in the tree.
    cx.delimiters.truncate(stack_bottom);
}

fn shrink_run(tree: &mut Tree, delim: &mut Delimiter, used: usize) {
    delim.count -= used;
    match tree.value_mut(delim.node) {
        NodeValue::Text(run) => run.truncate(delim.count),
        other => unreachable!("delimiter entry must point at a literal run, found {other:?}"),
    }
}
