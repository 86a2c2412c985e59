//! Bracket stack and link/image resolution.
//!
//! `[` and `![` push placeholder text nodes and bracket entries; `]` pops
//! against the top entry and tries, in order, the inline form
//! `(dest "title")`, the full reference `[label]`, and the collapsed or
//! shortcut reference. A successful match reparents everything after the
//! opener's placeholder into the new `Link`/`Image` node, resolves the
//! emphasis delimiters pushed since the opener, and — for links only —
//! deactivates every link opener still on the stack (no links in links;
//! images may nest). Failure leaves both brackets as literal text.

use super::{ResolutionContext, emphasis};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::reference::ReferenceRegistry;
use crate::token;

const MAX_LINK_LABEL: usize = 999;

/// One unresolved `[` or `![` opener.
#[derive(Clone, Debug)]
pub(super) struct Bracket {
    /// The placeholder text node already in the tree.
    pub node: NodeId,
    /// Token index just past the bracket marker.
    pub index: usize,
    pub image: bool,
    /// Cleared once this opener can never match; never set again.
    pub active: bool,
    /// Another opener was pushed right after this one, which rules out the
    /// collapsed `[text][]` shorthand.
    pub bracket_after: bool,
    /// Delimiter-stack height when this opener was pushed; emphasis inside
    /// a finished link resolves from here up.
    pub delim_bottom: usize,
}

pub(super) fn parse_open_bracket(tree: &mut Tree, cx: &mut ResolutionContext) -> NodeId {
    cx.pos += 1;
    let node = tree.alloc(NodeValue::Text("[".to_string()));
    push_bracket(cx, node, cx.pos, false);
    node
}

/// `![` opens an image bracket; a bare `!` is literal text.
pub(super) fn parse_bang(tree: &mut Tree, cx: &mut ResolutionContext) -> NodeId {
    cx.pos += 1;
    if cx.tokens.get(cx.pos) == Some(&token::OPEN_BRACKET) {
        cx.pos += 1;
        let node = tree.alloc(NodeValue::Text("![".to_string()));
        push_bracket(cx, node, cx.pos, true);
        node
    } else {
        tree.alloc(NodeValue::Text("!".to_string()))
    }
}

fn push_bracket(cx: &mut ResolutionContext, node: NodeId, index: usize, image: bool) {
    if let Some(top) = cx.brackets.last_mut() {
        top.bracket_after = true;
    }
    cx.brackets.push(Bracket {
        node,
        index,
        image,
        active: true,
        bracket_after: false,
        delim_bottom: cx.delimiters.len(),
    });
}

/// Resolve a `]` against the bracket stack.
pub(super) fn parse_close_bracket(
    tree: &mut Tree,
    cx: &mut ResolutionContext,
    references: &ReferenceRegistry,
) -> NodeId {
    let start_pos = cx.pos;

    let Some(opener) = cx.brackets.last().cloned() else {
        cx.pos = start_pos + 1;
        return tree.alloc(NodeValue::Text("]".to_string()));
    };
    if !opener.active {
        cx.brackets.pop();
        cx.pos = start_pos + 1;
        return tree.alloc(NodeValue::Text("]".to_string()));
    }

    let mut destination = String::new();
    let mut title = String::new();
    let mut matched = false;
    let mut end_pos = start_pos + 1;

    // Inline form: `(` spnl destination [spnl title] spnl `)`.
    if cx.tokens.get(start_pos + 1) == Some(&token::OPEN_PAREN) {
        let mut p = start_pos + 2;
        p += token::spnl(&cx.tokens[p..]);
        if let Some((consumed, dest)) = parse_link_destination(cx.tokens, p) {
            p += consumed;
            let after_dest = p;
            p += token::spnl(&cx.tokens[p..]);
            if cx.tokens.get(p) == Some(&token::CLOSE_PAREN) {
                destination = dest;
                matched = true;
                end_pos = p + 1;
            } else if p > after_dest
                && let Some((consumed, parsed_title)) = parse_link_title(cx.tokens, p)
            {
                p += consumed;
                p += token::spnl(&cx.tokens[p..]);
                if cx.tokens.get(p) == Some(&token::CLOSE_PAREN) {
                    destination = dest;
                    title = parsed_title;
                    matched = true;
                    end_pos = p + 1;
                }
            }
        }
    }

    // Reference forms: `[label]`, `[text][]`, `[text]`.
    if !matched {
        let before_label = start_pos + 1;
        let mut ref_label: Option<String> = None;
        if let Some((consumed, label)) = parse_link_label(cx.tokens, before_label) {
            ref_label = Some(label);
            end_pos = before_label + consumed;
        } else if !opener.bracket_after {
            // Collapsed/shortcut: the opener's own span is the label.
            let span = &cx.tokens[opener.index..start_pos];
            if !span.is_empty() {
                ref_label = Some(String::from_utf8_lossy(span).into_owned());
                if cx.tokens.get(before_label) == Some(&token::OPEN_BRACKET)
                    && cx.tokens.get(before_label + 1) == Some(&token::CLOSE_BRACKET)
                {
                    end_pos = before_label + 2;
                } else {
                    end_pos = start_pos + 1;
                }
            }
        }
        if let Some(label) = ref_label
            && let Some(reference) = references.get(&label)
        {
            destination = reference.destination.clone();
            title = reference.title.clone();
            matched = true;
        }
    }

    if matched {
        log::debug!(
            "{} resolved: dest={:?}",
            if opener.image { "image" } else { "link" },
            destination,
        );
        let node = tree.alloc(if opener.image {
            NodeValue::Image { destination, title }
        } else {
            NodeValue::Link { destination, title }
        });

        // Everything produced since the opener becomes link/image content.
        let mut child = tree.next(opener.node);
        while let Some(sibling) = child {
            let continuation = tree.unlink(sibling);
            tree.append_child(node, sibling);
            child = continuation;
        }

        emphasis::process_emphasis(tree, cx, opener.delim_bottom);
        cx.brackets.pop();
        tree.unlink(opener.node);

        if !opener.image {
            // No links in links: earlier link openers can never close now.
            for bracket in cx.brackets.iter_mut() {
                if !bracket.image {
                    bracket.active = false;
                }
            }
        }

        cx.pos = end_pos;
        node
    } else {
        cx.brackets.pop();
        cx.pos = start_pos + 1;
        tree.alloc(NodeValue::Text("]".to_string()))
    }
}

/// Destination: `<...>` with no newline or unescaped `<`, or a bare run
/// with balanced parentheses. Backslash escapes are honored in both.
fn parse_link_destination(tokens: &[u8], start: usize) -> Option<(usize, String)> {
    let mut buf: Vec<u8> = Vec::new();
    if tokens.get(start) == Some(&token::LESS) {
        let mut p = start + 1;
        while p < tokens.len() {
            match tokens[p] {
                token::GREATER => {
                    return Some((p + 1 - start, String::from_utf8_lossy(&buf).into_owned()));
                }
                token::NEWLINE | token::LESS => return None,
                token::BACKSLASH
                    if tokens.get(p + 1).is_some_and(|&t| token::is_ascii_punct(t)) =>
                {
                    buf.push(tokens[p + 1]);
                    p += 2;
                }
                t => {
                    buf.push(t);
                    p += 1;
                }
            }
        }
        None
    } else {
        let mut p = start;
        let mut depth = 0usize;
        while p < tokens.len() {
            let t = tokens[p];
            if token::is_whitespace(t) || t < 0x20 || t == 0x7f {
                break;
            }
            match t {
                token::BACKSLASH
                    if tokens.get(p + 1).is_some_and(|&n| token::is_ascii_punct(n)) =>
                {
                    buf.push(tokens[p + 1]);
                    p += 2;
                }
                token::OPEN_PAREN => {
                    depth += 1;
                    buf.push(t);
                    p += 1;
                }
                token::CLOSE_PAREN => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    buf.push(t);
                    p += 1;
                }
                _ => {
                    buf.push(t);
                    p += 1;
                }
            }
        }
        if depth != 0 {
            return None;
        }
        Some((p - start, String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Title: `"..."`, `'...'`, or `(...)`; the parenthesized form allows no
/// nested unescaped `(`.
fn parse_link_title(tokens: &[u8], start: usize) -> Option<(usize, String)> {
    let opener = *tokens.get(start)?;
    let closer = match opener {
        b'"' => b'"',
        b'\'' => b'\'',
        token::OPEN_PAREN => token::CLOSE_PAREN,
        _ => return None,
    };
    let mut buf: Vec<u8> = Vec::new();
    let mut p = start + 1;
    while p < tokens.len() {
        let t = tokens[p];
        if t == closer {
            return Some((p + 1 - start, String::from_utf8_lossy(&buf).into_owned()));
        }
        if opener == token::OPEN_PAREN && t == token::OPEN_PAREN {
            return None;
        }
        if t == token::BACKSLASH && tokens.get(p + 1).is_some_and(|&n| token::is_ascii_punct(n)) {
            buf.push(tokens[p + 1]);
            p += 2;
            continue;
        }
        buf.push(t);
        p += 1;
    }
    None
}

/// Label: `[...]` up to 999 tokens, no unescaped inner brackets, at least
/// one non-whitespace token. Backslash pairs are kept verbatim; label
/// equivalence is the registry's concern.
fn parse_link_label(tokens: &[u8], start: usize) -> Option<(usize, String)> {
    if tokens.get(start) != Some(&token::OPEN_BRACKET) {
        return None;
    }
    let mut buf: Vec<u8> = Vec::new();
    let mut p = start + 1;
    while p < tokens.len() && buf.len() <= MAX_LINK_LABEL {
        match tokens[p] {
            token::CLOSE_BRACKET => {
                if buf.iter().all(|&t| token::is_whitespace(t)) {
                    return None;
                }
                return Some((p + 1 - start, String::from_utf8_lossy(&buf).into_owned()));
            }
            token::OPEN_BRACKET => return None,
            token::BACKSLASH if p + 1 < tokens.len() => {
                buf.push(tokens[p]);
                buf.push(tokens[p + 1]);
                p += 2;
            }
            t => {
                buf.push(t);
                p += 1;
            }
        }
    }
    None
}
