//! Inline-content resolution for leaf blocks.
//!
//! The block parser leaves paragraphs, headings, and table cells carrying
//! raw token content; this pass rewrites each of those leaves into its
//! final inline children. A single left-to-right dispatch loop walks the
//! raw tokens, but two construct families cannot be decided on the way
//! through: emphasis markers and link brackets are ambiguous until later
//! tokens arrive, so they are recorded on two auxiliary stacks and
//! resolved retroactively with in-place tree surgery.
//!
//! Resolution order per block: dispatch loop to exhaustion, emphasis
//! resolution over the whole block, coalescing of adjacent text children,
//! and (under `gfm_auto_link`) the bare-email post-pass.
//!
//! Malformed input never fails here. Unmatched brackets, broken autolink
//! grammar, and invalid entities all degrade to literal text.

mod autolinks;
mod code_spans;
mod emphasis;
mod entities;
mod escapes;
mod links;

use crate::ast::{NodeId, NodeValue, Tree};
use crate::config::Config;
use crate::reference::ReferenceRegistry;
use crate::token;

use emphasis::Delimiter;
use links::Bracket;

/// Per-block scratch state threaded through the resolvers: the raw token
/// sequence, the cursor, and the two resolution stacks. A fresh context is
/// created for every leaf block, so nothing leaks across blocks and the
/// pass is reentrant across documents.
struct ResolutionContext<'t> {
    tokens: &'t [u8],
    pos: usize,
    delimiters: Vec<Delimiter>,
    brackets: Vec<Bracket>,
}

impl<'t> ResolutionContext<'t> {
    fn new(tokens: &'t [u8]) -> Self {
        ResolutionContext {
            tokens,
            pos: 0,
            delimiters: Vec::new(),
            brackets: Vec::new(),
        }
    }
}

/// The inline resolution pass over a block tree.
///
/// ```
/// use inlay::{Config, InlineParser, NodeValue, ReferenceRegistry, Tree};
///
/// let mut tree = Tree::new();
/// let para = tree.alloc(NodeValue::Paragraph);
/// tree.append_child(tree.root(), para);
/// tree.set_tokens(para, b"plain *emphasized*".to_vec());
///
/// let config = Config::default();
/// let references = ReferenceRegistry::new();
/// InlineParser::new(&mut tree, &config, &references).parse();
///
/// assert!(tree.tokens(para).is_empty());
/// ```
pub struct InlineParser<'a> {
    tree: &'a mut Tree,
    config: &'a Config,
    references: &'a ReferenceRegistry,
}

impl<'a> InlineParser<'a> {
    pub fn new(
        tree: &'a mut Tree,
        config: &'a Config,
        references: &'a ReferenceRegistry,
    ) -> Self {
        Self {
            tree,
            config,
            references,
        }
    }

    /// Resolve inline content for every leaf block in the tree.
    ///
    /// Blocks are visited post-order. The visit list is collected before
    /// any mutation, so unlinking an empty paragraph cannot derail the
    /// walk over its former siblings.
    pub fn parse(mut self) {
        let leaf_blocks: Vec<NodeId> = self
            .tree
            .post_order(self.tree.root())
            .into_iter()
            .filter(|&id| self.tree.value(id).is_leaf_block())
            .collect();
        log::trace!("inline pass over {} leaf blocks", leaf_blocks.len());

        for block in leaf_blocks {
            if matches!(self.tree.value(block), NodeValue::Paragraph)
                && self.tree.tokens(block).is_empty()
            {
                // A table transformation upstream may have drained the
                // paragraph's content; drop the husk.
                self.tree.unlink(block);
                continue;
            }
            self.parse_block(block);
        }
    }

    fn parse_block(&mut self, block: NodeId) {
        let tokens = self.tree.take_tokens(block);
        log::trace!("resolving block with {} raw tokens", tokens.len());

        let mut cx = ResolutionContext::new(&tokens);
        self.run_dispatch(&mut cx, block);
        emphasis::process_emphasis(self.tree, &mut cx, 0);
        debug_assert!(cx.delimiters.is_empty());

        coalesce_text(self.tree, block);
        if self.config.gfm_auto_link {
            autolinks::gfm_auto_email_pass(self.tree, block);
        }
    }

    /// The per-block dispatch loop: inspect the token under the cursor,
    /// hand it to the matching resolver, append the produced node. Every
    /// handler advances the cursor at least once.
    fn run_dispatch(&mut self, cx: &mut ResolutionContext, block: NodeId) {
        loop {
            if cx.pos >= cx.tokens.len() || cx.tokens[cx.pos] == token::END {
                return;
            }
            let node = match cx.tokens[cx.pos] {
                token::BACKSLASH => Some(escapes::parse_backslash(self.tree, cx)),
                token::BACKTICK => Some(code_spans::parse_code_span(self.tree, cx)),
                token::ASTERISK | token::UNDERSCORE => {
                    emphasis::handle_delim(self.tree, cx, block);
                    None
                }
                token::TILDE if self.config.gfm_strikethrough => {
                    emphasis::handle_delim(self.tree, cx, block);
                    None
                }
                token::TILDE => Some(self.parse_literal_run(cx)),
                token::NEWLINE => Some(self.parse_newline(cx, block)),
                token::LESS => Some(autolinks::parse_angle(self.tree, cx)),
                token::OPEN_BRACKET => Some(links::parse_open_bracket(self.tree, cx)),
                token::CLOSE_BRACKET => {
                    Some(links::parse_close_bracket(self.tree, cx, self.references))
                }
                token::AMPERSAND => Some(entities::parse_entity(self.tree, cx)),
                token::BANG => Some(links::parse_bang(self.tree, cx)),
                _ => {
                    let bare_link = if self.config.gfm_auto_link {
                        autolinks::parse_gfm_auto_link(self.tree, cx)
                    } else {
                        None
                    };
                    Some(bare_link.unwrap_or_else(|| self.parse_text(cx)))
                }
            };
            if let Some(node) = node {
                self.tree.append_child(block, node);
            }
        }
    }

    /// Default action: consume ordinary tokens up to the next marker.
    ///
    /// Under `gfm_auto_link` the run also breaks before a
    /// whitespace-preceded bare-URL prefix, so the next dispatch lands on
    /// the candidate and the detectors get their shot.
    fn parse_text(&mut self, cx: &mut ResolutionContext) -> NodeId {
        let start = cx.pos;
        cx.pos += 1;
        while cx.pos < cx.tokens.len() {
            let t = cx.tokens[cx.pos];
            if token::is_marker(t) || t == token::END {
                break;
            }
            if self.config.gfm_auto_link
                && token::is_whitespace(cx.tokens[cx.pos - 1])
                && autolinks::at_url_prefix(&cx.tokens[cx.pos..])
            {
                break;
            }
            cx.pos += 1;
        }
        let text = String::from_utf8_lossy(&cx.tokens[start..cx.pos]).into_owned();
        self.tree.alloc(NodeValue::Text(text))
    }

    /// A run of one marker kind emitted verbatim (used when an extension
    /// that would interpret the marker is disabled).
    fn parse_literal_run(&mut self, cx: &mut ResolutionContext) -> NodeId {
        let start = cx.pos;
        let ch = cx.tokens[start];
        while cx.pos < cx.tokens.len() && cx.tokens[cx.pos] == ch {
            cx.pos += 1;
        }
        let run = String::from_utf8_lossy(&cx.tokens[start..cx.pos]).into_owned();
        self.tree.alloc(NodeValue::Text(run))
    }

    /// A newline is a soft break, or a hard break when the preceding text
    /// child ends in two or more spaces. Trailing spaces are trimmed off
    /// the text either way.
    fn parse_newline(&mut self, cx: &mut ResolutionContext, block: NodeId) -> NodeId {
        cx.pos += 1;
        let mut hard = false;
        if let Some(last) = self.tree.last_child(block)
            && let NodeValue::Text(text) = self.tree.value_mut(last)
            && text.ends_with(' ')
        {
            let trimmed_len = text.trim_end_matches(' ').len();
            hard = text.len() - trimmed_len >= 2;
            text.truncate(trimmed_len);
        }
        self.tree.alloc(if hard {
            NodeValue::HardBreak
        } else {
            NodeValue::SoftBreak
        })
    }
}

/// Merge every maximal run of adjacent text children of `block` into one
/// node and drop text children that ended up empty. Idempotent.
pub(crate) fn coalesce_text(tree: &mut Tree, block: NodeId) {
    let mut child = tree.first_child(block);
    while let Some(current) = child {
        if tree.value(current).is_text() {
            while let Some(next) = tree.next(current) {
                let NodeValue::Text(tail) = tree.value(next) else {
                    break;
                };
                let tail = tail.clone();
                tree.unlink(next);
                match tree.value_mut(current) {
                    NodeValue::Text(head) => head.push_str(&tail),
                    _ => unreachable!("coalescing cursor must sit on a text node"),
                }
            }
            if let NodeValue::Text(text) = tree.value(current)
                && text.is_empty()
            {
                child = tree.unlink(current);
                continue;
            }
        }
        child = tree.next(current);
    }
}
