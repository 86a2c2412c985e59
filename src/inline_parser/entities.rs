//! HTML/XML entity resolution.
//!
//! The scan runs from `&` to the first whitespace (exclusive) or `;`
//! (inclusive). The static table is tried first on the bare name and does
//! not require the semicolon; everything else must end in `;` and survive
//! the numeric length gates before the general decoder sees it. A decode
//! that changes nothing means the candidate was not an entity, and the
//! `&` stays literal.

use super::ResolutionContext;
use crate::ast::{NodeId, NodeValue, Tree};
use crate::entity;
use crate::token;

pub(super) fn parse_entity(tree: &mut Tree, cx: &mut ResolutionContext) -> NodeId {
    let tokens = cx.tokens;
    let length = tokens.len();
    let start = cx.pos;

    if start + 1 >= length {
        cx.pos += 1;
        return literal_amp(tree);
    }

    let numeric = tokens.get(start + 1) == Some(&token::CROSSHATCH);
    let mut i = start;
    let mut end_with_semicolon = false;
    while i < length {
        let t = tokens[i];
        if token::is_whitespace(t) || t == token::END {
            break;
        }
        if t == token::SEMICOLON {
            i += 1;
            end_with_semicolon = true;
            break;
        }
        i += 1;
    }

    // The scanned form keeps `&` and, when present, the `;`.
    let scanned = &tokens[start..i];

    // Fast path: the static table, semicolon optional.
    let bare = scanned.strip_prefix(b"&").unwrap_or(scanned);
    let bare = bare.strip_suffix(b";").unwrap_or(bare);
    if let Ok(name) = std::str::from_utf8(bare)
        && let Some(value) = entity::lookup(name)
    {
        cx.pos += i - start;
        return tree.alloc(NodeValue::Text(value.to_string()));
    }

    if !end_with_semicolon {
        cx.pos += 1;
        return literal_amp(tree);
    }

    if numeric {
        let scanned_len = scanned.len();
        if !(4..=10).contains(&scanned_len) {
            cx.pos += 1;
            return literal_amp(tree);
        }
        let hex = matches!(scanned.get(2), Some(b'x') | Some(b'X'));
        if hex && scanned_len < 5 {
            cx.pos += 1;
            return literal_amp(tree);
        }
    }

    let candidate = String::from_utf8_lossy(scanned);
    let decoded = html_escape::decode_html_entities(candidate.as_ref());
    if decoded == candidate {
        cx.pos += 1;
        return literal_amp(tree);
    }
    log::trace!("entity {:?} decoded to {:?}", candidate, decoded);
    cx.pos += i - start;
    tree.alloc(NodeValue::Text(decoded.into_owned()))
}

fn literal_amp(tree: &mut Tree) -> NodeId {
    tree.alloc(NodeValue::Text("&".to_string()))
}
