//! Arena-indexed node tree shared between the block parser and the inline
//! resolution pass.
//!
//! Nodes live in a flat arena owned by [`Tree`]; parent/child/sibling
//! relations are `NodeId` indices, never references, so the two resolution
//! stacks can hold handles to live nodes while the tree is being spliced
//! underneath them. Unlinking returns the unlinked node's former next
//! sibling, which is the cursor a traversal needs to keep going after an
//! in-place removal.
//!
//! The mutation primitives assert their structural preconditions; a
//! violated assertion means the tree handed over by the block parser (or a
//! resolver bug here) broke the sibling/parent invariants, which is a
//! programming error and is reported loudly rather than swallowed.

use std::fmt::Write as _;

/// Handle to a node in a [`Tree`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The node variants of the inline-resolved tree.
///
/// `Document`, `Paragraph`, `Heading`, and `TableCell` are produced by the
/// block parser; the rest are produced here. Entity-decoded content is
/// ordinary `Text`.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeValue {
    Document,
    Paragraph,
    Heading { level: u8 },
    TableCell,
    Text(String),
    CodeSpan(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link { destination: String, title: String },
    Image { destination: String, title: String },
    Autolink { destination: String, email: bool },
    HardBreak,
    SoftBreak,
    InlineHtml(String),
}

impl NodeValue {
    /// A leaf block carries raw inline content instead of block children.
    pub fn is_leaf_block(&self) -> bool {
        matches!(
            self,
            NodeValue::Paragraph | NodeValue::Heading { .. } | NodeValue::TableCell
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeValue::Text(_))
    }

    fn name(&self) -> &'static str {
        match self {
            NodeValue::Document => "document",
            NodeValue::Paragraph => "paragraph",
            NodeValue::Heading { .. } => "heading",
            NodeValue::TableCell => "table-cell",
            NodeValue::Text(_) => "text",
            NodeValue::CodeSpan(_) => "code-span",
            NodeValue::Emphasis => "emphasis",
            NodeValue::Strong => "strong",
            NodeValue::Strikethrough => "strikethrough",
            NodeValue::Link { .. } => "link",
            NodeValue::Image { .. } => "image",
            NodeValue::Autolink { .. } => "autolink",
            NodeValue::HardBreak => "hard-break",
            NodeValue::SoftBreak => "soft-break",
            NodeValue::InlineHtml(_) => "inline-html",
        }
    }
}

#[derive(Debug)]
struct Node {
    value: NodeValue,
    /// Raw token content of a leaf block; drained when the block is
    /// inline-processed.
    tokens: Vec<u8>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// An ordered tree of [`NodeValue`] nodes backed by an arena.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.alloc(NodeValue::Document);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, value: NodeValue) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.nodes.push(Node {
            value,
            tokens: Vec::new(),
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
        });
        id
    }

    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.nodes[id.index()].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.nodes[id.index()].value
    }

    pub fn tokens(&self, id: NodeId) -> &[u8] {
        &self.nodes[id.index()].tokens
    }

    pub fn set_tokens(&mut self, id: NodeId, tokens: Vec<u8>) {
        self.nodes[id.index()].tokens = tokens;
    }

    pub fn take_tokens(&mut self, id: NodeId) -> Vec<u8> {
        std::mem::take(&mut self.nodes[id.index()].tokens)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].last_child
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].next
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].prev
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        assert_ne!(parent, child, "a node cannot be its own parent");
        self.unlink(child);
        let old_last = self.nodes[parent.index()].last_child;
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[child.index()].prev = old_last;
        match old_last {
            Some(last) => self.nodes[last.index()].next = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);
    }

    /// Insert a detached node as the next sibling of `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, new: NodeId) {
        assert_ne!(anchor, new, "a node cannot be its own sibling");
        let parent = self.nodes[anchor.index()]
            .parent
            .expect("insert_after anchor must be attached");
        self.unlink(new);
        let old_next = self.nodes[anchor.index()].next;
        self.nodes[new.index()].parent = Some(parent);
        self.nodes[new.index()].prev = Some(anchor);
        self.nodes[new.index()].next = old_next;
        self.nodes[anchor.index()].next = Some(new);
        match old_next {
            Some(next) => self.nodes[next.index()].prev = Some(new),
            None => self.nodes[parent.index()].last_child = Some(new),
        }
    }

    /// Detach `id` from its parent and siblings. Returns the node's former
    /// next sibling so a traversal can continue past the removal. The
    /// node's own children stay with it.
    pub fn unlink(&mut self, id: NodeId) -> Option<NodeId> {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p.index()].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.index()].first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.nodes[n.index()].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.index()].last_child = prev;
                }
            }
        }
        let node = &mut self.nodes[id.index()];
        node.parent = None;
        node.prev = None;
        node.next = None;
        next
    }

    /// Node ids of the subtree under `id` (excluding `id`), document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut child = self.first_child(id);
        while let Some(c) = child {
            out.push(c);
            out.extend(self.descendants(c));
            child = self.next(c);
        }
        out
    }

    /// Post-order visit list of the subtree rooted at `id`, `id` last.
    /// Collected up front so callers can mutate while iterating the result.
    pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.post_order_into(id, &mut out);
        out
    }

    fn post_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let mut child = self.first_child(id);
        while let Some(c) = child {
            self.post_order_into(c, out);
            child = self.next(c);
        }
        out.push(id);
    }

    /// Concatenated text content of the subtree (for assertions and the
    /// renderer's plain-text fallback).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.text_content_into(id, &mut out);
        out
    }

    fn text_content_into(&self, id: NodeId, out: &mut String) {
        match self.value(id) {
            NodeValue::Text(s) | NodeValue::CodeSpan(s) | NodeValue::InlineHtml(s) => {
                out.push_str(s)
            }
            _ => {}
        }
        let mut child = self.first_child(id);
        while let Some(c) = child {
            self.text_content_into(c, out);
            child = self.next(c);
        }
    }

    /// Indented debug rendering of the subtree, one node per line.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        let value = self.value(id);
        out.push_str(value.name());
        match value {
            NodeValue::Text(s) | NodeValue::CodeSpan(s) | NodeValue::InlineHtml(s) => {
                let _ = write!(out, " {:?}", s);
            }
            NodeValue::Heading { level } => {
                let _ = write!(out, " {}", level);
            }
            NodeValue::Link { destination, title }
            | NodeValue::Image { destination, title } => {
                let _ = write!(out, " dest={:?} title={:?}", destination, title);
            }
            NodeValue::Autolink { destination, .. } => {
                let _ = write!(out, " dest={:?}", destination);
            }
            _ => {}
        }
        out.push('\n');
        let mut child = self.first_child(id);
        while let Some(c) = child {
            self.dump_into(c, depth + 1, out);
            child = self.next(c);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tree: &mut Tree, s: &str) -> NodeId {
        tree.alloc(NodeValue::Text(s.to_string()))
    }

    #[test]
    fn test_append_and_navigate() {
        let mut tree = Tree::new();
        let p = tree.alloc(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append_child(p, a);
        tree.append_child(p, b);

        assert_eq!(tree.first_child(p), Some(a));
        assert_eq!(tree.last_child(p), Some(b));
        assert_eq!(tree.next(a), Some(b));
        assert_eq!(tree.prev(b), Some(a));
        assert_eq!(tree.parent(a), Some(p));
    }

    #[test]
    fn test_unlink_returns_former_next() {
        let mut tree = Tree::new();
        let p = tree.alloc(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        for n in [a, b, c] {
            tree.append_child(p, n);
        }

        let cont = tree.unlink(b);
        assert_eq!(cont, Some(c));
        assert_eq!(tree.next(a), Some(c));
        assert_eq!(tree.prev(c), Some(a));
        assert_eq!(tree.parent(b), None);
    }

    #[test]
    fn test_insert_after_updates_last_child() {
        let mut tree = Tree::new();
        let p = tree.alloc(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let a = text(&mut tree, "a");
        tree.append_child(p, a);
        let b = text(&mut tree, "b");
        tree.insert_after(a, b);

        assert_eq!(tree.last_child(p), Some(b));
        assert_eq!(tree.next(a), Some(b));
    }

    #[test]
    fn test_post_order_children_before_parent() {
        let mut tree = Tree::new();
        let p = tree.alloc(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let a = text(&mut tree, "a");
        tree.append_child(p, a);

        let order = tree.post_order(tree.root());
        assert_eq!(order, vec![a, p, tree.root()]);
    }

    #[test]
    fn test_dump_shape() {
        let mut tree = Tree::new();
        let p = tree.alloc(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let a = text(&mut tree, "hi");
        tree.append_child(p, a);

        assert_eq!(tree.dump(p), "paragraph\n  text \"hi\"\n");
    }

    #[test]
    fn test_reparent_keeps_children() {
        let mut tree = Tree::new();
        let p = tree.alloc(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let em = tree.alloc(NodeValue::Emphasis);
        tree.append_child(p, em);
        let a = text(&mut tree, "a");
        tree.append_child(em, a);

        let strong = tree.alloc(NodeValue::Strong);
        tree.append_child(tree.root(), strong);
        tree.append_child(strong, em);

        assert_eq!(tree.parent(em), Some(strong));
        assert_eq!(tree.first_child(em), Some(a));
        assert_eq!(tree.first_child(p), None);
    }
}
