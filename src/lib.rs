//! Inline-content resolution for structured Markdown block trees.
//!
//! A block parser upstream produces a [`Tree`] whose paragraphs, headings,
//! and table cells still carry raw token content, plus a
//! [`ReferenceRegistry`] of link-reference definitions collected along the
//! way. This crate is the second pass: it walks the block tree and
//! rewrites every leaf block's raw content into finished inline nodes —
//! text, code spans, emphasis, strong, strikethrough, links, images,
//! autolinks, hard and soft breaks, inline HTML, escapes, and entities.
//!
//! Emphasis markers and link brackets cannot be classified left to right;
//! they are recorded on auxiliary stacks during the scan and resolved
//! retroactively with in-place tree surgery (the CommonMark
//! delimiter-stack algorithm). Malformed constructs never fail — they
//! degrade to literal text, as the grammar family defines recovery rather
//! than rejection.

pub mod ast;
pub mod config;
pub mod entity;
pub mod inline_parser;
pub mod reference;
pub mod token;

pub use ast::{NodeId, NodeValue, Tree};
pub use config::{Config, ConfigBuilder};
pub use inline_parser::InlineParser;
pub use reference::{Reference, ReferenceRegistry};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Resolve inline content for every leaf block of `tree`.
///
/// Convenience wrapper over [`InlineParser`].
///
/// ```
/// use inlay::{Config, NodeValue, ReferenceRegistry, Tree, resolve_inlines};
///
/// let mut tree = Tree::new();
/// let para = tree.alloc(NodeValue::Paragraph);
/// tree.append_child(tree.root(), para);
/// tree.set_tokens(para, b"hello *world*".to_vec());
///
/// resolve_inlines(&mut tree, &Config::default(), &ReferenceRegistry::new());
///
/// assert_eq!(
///     tree.dump(para),
///     "paragraph\n  text \"hello \"\n  emphasis\n    text \"world\"\n",
/// );
/// ```
pub fn resolve_inlines(tree: &mut Tree, config: &Config, references: &ReferenceRegistry) {
    #[cfg(debug_assertions)]
    init_logger();

    InlineParser::new(tree, config, references).parse();
}
