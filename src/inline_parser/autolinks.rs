//! Autolink detection.
//!
//! Three surfaces share this module: the `<...>` cascade (strict URI
//! autolink, then strict email autolink, then inline HTML tag, then a
//! literal `<`), the GFM bare-URL detectors tried by the dispatch loop's
//! default branch, and the GFM auto-email post-pass that splits addresses
//! out of finished text children. The detectors are an ordered list tried
//! in sequence; the first success consumes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ResolutionContext;
use crate::ast::{NodeId, NodeValue, Tree};
use crate::token;

const URL_PREFIXES: [&str; 4] = ["www.", "https://", "http://", "ftp://"];

/// Trailing punctuation trimmed off a bare-URL candidate.
const TRAILING_PUNCT: &[u8] = b"?!.,:*_~;'\"";

static EMAIL_AUTOLINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email autolink pattern")
});

static GFM_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._+-]+@[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)+")
        .expect("gfm email pattern")
});

/// Resolve a `<`: URI autolink, email autolink, inline HTML, or literal.
pub(super) fn parse_angle(tree: &mut Tree, cx: &mut ResolutionContext) -> NodeId {
    if let Some((consumed, destination)) = scan_uri_autolink(&cx.tokens[cx.pos..]) {
        log::debug!("uri autolink: {}", destination);
        let node = tree.alloc(NodeValue::Autolink {
            destination: destination.clone(),
            email: false,
        });
        let text = tree.alloc(NodeValue::Text(destination));
        tree.append_child(node, text);
        cx.pos += consumed;
        return node;
    }
    if let Some((consumed, address)) = scan_email_autolink(&cx.tokens[cx.pos..]) {
        log::debug!("email autolink: {}", address);
        let node = tree.alloc(NodeValue::Autolink {
            destination: format!("mailto:{}", address),
            email: true,
        });
        let text = tree.alloc(NodeValue::Text(address));
        tree.append_child(node, text);
        cx.pos += consumed;
        return node;
    }
    if let Some(consumed) = scan_html_tag(&cx.tokens[cx.pos..]) {
        let raw = String::from_utf8_lossy(&cx.tokens[cx.pos..cx.pos + consumed]).into_owned();
        log::debug!("inline html: {:?}", raw);
        cx.pos += consumed;
        return tree.alloc(NodeValue::InlineHtml(raw));
    }
    cx.pos += 1;
    tree.alloc(NodeValue::Text("<".to_string()))
}

/// `<scheme:...>` with a 2-32 character scheme and no whitespace or angle
/// brackets in the body.
fn scan_uri_autolink(rest: &[u8]) -> Option<(usize, String)> {
    let mut p = 1;
    if !rest.get(p)?.is_ascii_alphabetic() {
        return None;
    }
    let scheme_start = p;
    p += 1;
    while p < rest.len()
        && (rest[p].is_ascii_alphanumeric() || matches!(rest[p], b'+' | b'.' | b'-'))
    {
        p += 1;
    }
    if !(2..=32).contains(&(p - scheme_start)) || rest.get(p) != Some(&b':') {
        return None;
    }
    p += 1;
    while p < rest.len() {
        let t = rest[p];
        if t == token::GREATER {
            return Some((p + 1, String::from_utf8_lossy(&rest[1..p]).into_owned()));
        }
        if token::is_whitespace(t) || t == token::LESS || t == token::END {
            return None;
        }
        p += 1;
    }
    None
}

/// `<addr>` where the body matches the strict email production.
fn scan_email_autolink(rest: &[u8]) -> Option<(usize, String)> {
    let mut p = 1;
    while p < rest.len() {
        let t = rest[p];
        if t == token::GREATER {
            break;
        }
        if token::is_whitespace(t) || t == token::LESS || t == token::END {
            return None;
        }
        p += 1;
    }
    if rest.get(p) != Some(&token::GREATER) {
        return None;
    }
    let inner = std::str::from_utf8(&rest[1..p]).ok()?;
    if inner.is_empty() || !EMAIL_AUTOLINK.is_match(inner) {
        return None;
    }
    Some((p + 1, inner.to_string()))
}

/// Verbatim inline HTML: open/close tag, comment, processing instruction,
/// declaration, or CDATA section. Returns the consumed length.
fn scan_html_tag(rest: &[u8]) -> Option<usize> {
    match *rest.get(1)? {
        b'!' => scan_markup_declaration(rest),
        b'?' => find_seq(rest, 2, b"?>").map(|end| end + 2),
        b'/' => scan_close_tag(rest),
        c if c.is_ascii_alphabetic() => scan_open_tag(rest),
        _ => None,
    }
}

fn scan_markup_declaration(rest: &[u8]) -> Option<usize> {
    if rest.get(2..4) == Some(b"--".as_slice()) {
        return find_seq(rest, 4, b"-->").map(|end| end + 3);
    }
    if rest.get(2..9) == Some(b"[CDATA[".as_slice()) {
        return find_seq(rest, 9, b"]]>").map(|end| end + 3);
    }
    if rest.get(2).is_some_and(|c| c.is_ascii_alphabetic()) {
        return rest
            .iter()
            .position(|&t| t == token::GREATER)
            .map(|end| end + 1);
    }
    None
}

fn find_seq(rest: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    rest.get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| from + i)
}

fn scan_close_tag(rest: &[u8]) -> Option<usize> {
    let mut p = 2;
    if !rest.get(p)?.is_ascii_alphabetic() {
        return None;
    }
    p += 1;
    while p < rest.len() && (rest[p].is_ascii_alphanumeric() || rest[p] == b'-') {
        p += 1;
    }
    p = skip_ws(rest, p);
    (rest.get(p) == Some(&token::GREATER)).then_some(p + 1)
}

fn scan_open_tag(rest: &[u8]) -> Option<usize> {
    let mut p = 2; // `<` and the first name letter, checked by the caller
    while p < rest.len() && (rest[p].is_ascii_alphanumeric() || rest[p] == b'-') {
        p += 1;
    }
    loop {
        let ws_start = p;
        p = skip_ws(rest, p);
        match rest.get(p) {
            Some(&token::GREATER) => return Some(p + 1),
            Some(&b'/') if rest.get(p + 1) == Some(&token::GREATER) => return Some(p + 2),
            Some(&c) if p > ws_start && (c.is_ascii_alphabetic() || c == b'_' || c == b':') => {
                p += 1;
                while p < rest.len()
                    && (rest[p].is_ascii_alphanumeric()
                        || matches!(rest[p], b'_' | b'.' | b':' | b'-'))
                {
                    p += 1;
                }
                let eq_probe = skip_ws(rest, p);
                if rest.get(eq_probe) == Some(&b'=') {
                    let value_start = skip_ws(rest, eq_probe + 1);
                    p = scan_attribute_value(rest, value_start)?;
                }
            }
            _ => return None,
        }
    }
}

fn scan_attribute_value(rest: &[u8], p: usize) -> Option<usize> {
    match *rest.get(p)? {
        quote @ (b'"' | b'\'') => {
            let close = rest.get(p + 1..)?.iter().position(|&t| t == quote)?;
            Some(p + 1 + close + 1)
        }
        _ => {
            let mut end = p;
            while end < rest.len()
                && !token::is_whitespace(rest[end])
                && !matches!(rest[end], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
            {
                end += 1;
            }
            (end > p).then_some(end)
        }
    }
}

fn skip_ws(rest: &[u8], mut p: usize) -> usize {
    while p < rest.len() && token::is_whitespace(rest[p]) {
        p += 1;
    }
    p
}

/// Does `rest` begin with one of the recognized bare-URL prefixes?
pub(super) fn at_url_prefix(rest: &[u8]) -> bool {
    URL_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(rest, prefix.as_bytes()))
}

fn starts_with_ignore_case(rest: &[u8], prefix: &[u8]) -> bool {
    rest.len() >= prefix.len() && rest[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// The bare-URL detector cascade. Prefixes are disjoint, so order only
/// decides who reports the match.
pub(super) fn parse_gfm_auto_link(tree: &mut Tree, cx: &mut ResolutionContext) -> Option<NodeId> {
    let matched = URL_PREFIXES
        .iter()
        .find_map(|prefix| match_bare_url(&cx.tokens[cx.pos..], prefix));
    let (consumed, text, destination) = matched?;
    log::debug!("gfm autolink: {}", text);

    let node = tree.alloc(NodeValue::Link {
        destination,
        title: String::new(),
    });
    let child = tree.alloc(NodeValue::Text(text));
    tree.append_child(node, child);
    cx.pos += consumed;
    Some(node)
}

fn match_bare_url(rest: &[u8], prefix: &str) -> Option<(usize, String, String)> {
    if !starts_with_ignore_case(rest, prefix.as_bytes()) {
        return None;
    }
    let mut end = 0;
    while end < rest.len() {
        let t = rest[end];
        if token::is_whitespace(t) || t == token::LESS || t == token::END {
            break;
        }
        end += 1;
    }

    // Trim trailing punctuation; `)` only while unbalanced.
    while end > prefix.len() {
        let last = rest[end - 1];
        if TRAILING_PUNCT.contains(&last) {
            end -= 1;
            continue;
        }
        if last == token::CLOSE_PAREN {
            let opens = rest[..end].iter().filter(|&&t| t == token::OPEN_PAREN).count();
            let closes = rest[..end]
                .iter()
                .filter(|&&t| t == token::CLOSE_PAREN)
                .count();
            if closes > opens {
                end -= 1;
                continue;
            }
        }
        break;
    }
    if end <= prefix.len() {
        return None;
    }

    let candidate = std::str::from_utf8(&rest[..end]).ok()?;
    let domain_start = if prefix == "www." { 0 } else { prefix.len() };
    let domain_end = candidate[domain_start..]
        .find(['/', '?', '#'])
        .map(|i| domain_start + i)
        .unwrap_or(candidate.len());
    if !valid_domain(&candidate[domain_start..domain_end]) {
        return None;
    }

    let destination = if prefix == "www." {
        format!("http://{}", candidate)
    } else {
        candidate.to_string()
    };
    Some((end, candidate.to_string(), destination))
}

/// At least two labels, none empty, alphanumeric/`-`/`_` only, and no
/// underscore in the last two labels.
fn valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return false;
    }
    if labels.iter().any(|l| {
        !l.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }) {
        return false;
    }
    labels.iter().rev().take(2).all(|l| !l.contains('_'))
}

enum EmailPiece {
    Text(String),
    Address(String),
}

/// Split bare email addresses out of the block's direct text children.
/// Runs after coalescing, so each child holds a maximal text run.
pub(super) fn gfm_auto_email_pass(tree: &mut Tree, block: NodeId) {
    let mut child = tree.first_child(block);
    while let Some(node) = child {
        let next = tree.next(node);
        if let NodeValue::Text(text) = tree.value(node) {
            let text = text.clone();
            if let Some(pieces) = split_emails(&text) {
                log::debug!("auto-email split into {} pieces", pieces.len());
                let mut anchor = node;
                for piece in pieces {
                    let new = match piece {
                        EmailPiece::Text(content) => tree.alloc(NodeValue::Text(content)),
                        EmailPiece::Address(address) => {
                            let link = tree.alloc(NodeValue::Link {
                                destination: format!("mailto:{}", address),
                                title: String::new(),
                            });
                            let text_child = tree.alloc(NodeValue::Text(address));
                            tree.append_child(link, text_child);
                            link
                        }
                    };
                    tree.insert_after(anchor, new);
                    anchor = new;
                }
                tree.unlink(node);
            }
        }
        child = next;
    }
}

/// `None` when the text contains no acceptable address.
fn split_emails(text: &str) -> Option<Vec<EmailPiece>> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for candidate in GFM_EMAIL.find_iter(text) {
        let address = candidate.as_str();
        // A trailing `-` or `_` invalidates the candidate outright.
        if address.ends_with('-') || address.ends_with('_') {
            continue;
        }
        // The address may not continue a preceding atom.
        if let Some(prev) = text[..candidate.start()].chars().last()
            && (prev.is_ascii_alphanumeric() || matches!(prev, '.' | '_' | '-' | '+' | '@'))
        {
            continue;
        }
        // No underscore in the last two domain labels, as for bare URLs.
        let domain = &address[address.rfind('@').unwrap_or(0) + 1..];
        if !domain
            .rsplit('.')
            .take(2)
            .all(|label| !label.contains('_'))
        {
            continue;
        }
        if candidate.start() > last {
            pieces.push(EmailPiece::Text(text[last..candidate.start()].to_string()));
        }
        pieces.push(EmailPiece::Address(address.to_string()));
        last = candidate.end();
    }
    if last == 0 {
        return None;
    }
    if last < text.len() {
        pieces.push(EmailPiece::Text(text[last..].to_string()));
    }
    Some(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_uri_autolink() {
        assert_eq!(
            scan_uri_autolink(b"<https://example.com>"),
            Some((21, "https://example.com".to_string()))
        );
        assert_eq!(scan_uri_autolink(b"<https://a b>"), None);
        assert_eq!(scan_uri_autolink(b"<no-colon>"), None);
        assert_eq!(scan_uri_autolink(b"<h:rest>"), None);
    }

    #[test]
    fn test_scan_email_autolink() {
        assert_eq!(
            scan_email_autolink(b"<user@example.com>"),
            Some((18, "user@example.com".to_string()))
        );
        assert_eq!(scan_email_autolink(b"<not an email>"), None);
        assert_eq!(scan_email_autolink(b"<user@>"), None);
    }

    #[test]
    fn test_scan_html_tag() {
        assert_eq!(scan_html_tag(b"<span>"), Some(6));
        assert_eq!(scan_html_tag(b"</span>"), Some(7));
        assert_eq!(scan_html_tag(br#"<a href="x">"#), Some(12));
        assert_eq!(scan_html_tag(b"<a disabled>"), Some(12));
        assert_eq!(scan_html_tag(b"<br/>"), Some(5));
        assert_eq!(scan_html_tag(b"<!-- note -->"), Some(13));
        assert_eq!(scan_html_tag(b"<?php ?>"), Some(8));
        assert_eq!(scan_html_tag(b"<!DOCTYPE html>"), Some(15));
        assert_eq!(scan_html_tag(b"<![CDATA[x]]>"), Some(13));
        assert_eq!(scan_html_tag(b"< span>"), None);
        assert_eq!(scan_html_tag(b"<3>"), None);
    }

    #[test]
    fn test_match_bare_url_trims_punctuation() {
        let (consumed, text, dest) = match_bare_url(b"www.example.com.", "www.").unwrap();
        assert_eq!(consumed, 15);
        assert_eq!(text, "www.example.com");
        assert_eq!(dest, "http://www.example.com");
    }

    #[test]
    fn test_match_bare_url_paren_balance() {
        let (consumed, ..) = match_bare_url(b"www.a.com/x(y)", "www.").unwrap();
        assert_eq!(consumed, 14);
        let (consumed, ..) = match_bare_url(b"www.a.com/x)", "www.").unwrap();
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_match_bare_url_rejects_bad_domain() {
        assert_eq!(match_bare_url(b"https://nodot", "https://"), None);
        assert_eq!(match_bare_url(b"www.foo_bar.com", "www."), None);
        assert_eq!(match_bare_url(b"https://", "https://"), None);
    }

    #[test]
    fn test_split_emails() {
        let pieces = split_emails("mail a@b.com now").unwrap();
        assert_eq!(pieces.len(), 3);
        assert!(matches!(&pieces[1], EmailPiece::Address(a) if a == "a@b.com"));

        assert!(split_emails("nothing here").is_none());
        // A second `@` cannot start an address mid-atom.
        assert!(split_emails("a@b@c.com").is_none());
    }

    #[test]
    fn test_split_emails_rejects_underscore_domain() {
        assert!(split_emails("x@a_b.com").is_none());
    }
}
