//! # CommentThread
//!
//! Materialises one thread from a single batched fetch. Comments live in an
//! arena (`Vec`) and a parent -> children adjacency map indexes into it, so
//! walking the tree never goes back to the store.

use std::collections::HashMap;

use domains::{Comment, CommentNode, FlatComment, ItemId};

#[derive(Debug, Clone)]
pub struct CommentThread {
    root: ItemId,
    arena: Vec<Comment>,
    /// parent id -> arena indices, sibling order already applied.
    children: HashMap<ItemId, Vec<usize>>,
}

impl CommentThread {
    /// `comments` must be in insertion order. Siblings are ordered by
    /// creation time; equal timestamps keep insertion order.
    pub fn new(root: ItemId, comments: Vec<Comment>) -> Self {
        let mut children: HashMap<ItemId, Vec<usize>> = HashMap::new();
        for (idx, comment) in comments.iter().enumerate() {
            children.entry(comment.parent).or_default().push(idx);
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|&idx| comments[idx].created_at);
        }
        Self {
            root,
            arena: comments,
            children,
        }
    }

    pub fn root(&self) -> ItemId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Every descendant of `parent` in pre-order: each child, then that
    /// child's own subtree, before the next sibling.
    pub fn descendants(&self, parent: ItemId) -> Vec<&Comment> {
        self.pre_order(parent)
            .into_iter()
            .map(|idx| &self.arena[idx])
            .collect()
    }

    /// Nested form, starting from the post's direct replies. Built bottom-up
    /// from the reversed pre-order, so thread depth never grows the call
    /// stack.
    pub fn nested(&self) -> Vec<CommentNode> {
        let order = self.pre_order(self.root);
        let mut built: HashMap<usize, CommentNode> = HashMap::with_capacity(order.len());
        for &idx in order.iter().rev() {
            let comment = self.arena[idx].clone();
            let children = self.take_children(comment.id, &mut built);
            built.insert(idx, CommentNode { comment, children });
        }
        self.take_children(self.root, &mut built)
    }

    /// Depth-annotated pre-order listing of the whole thread.
    pub fn flatten(&self) -> Vec<FlatComment> {
        self.descendants(self.root)
            .into_iter()
            .map(|c| FlatComment {
                depth: c.depth,
                comment: c.clone(),
            })
            .collect()
    }

    /// Arena indices below `parent`, pre-order, walked with an explicit stack.
    fn pre_order(&self, parent: ItemId) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.child_indices(parent).iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            out.push(idx);
            stack.extend(self.child_indices(self.arena[idx].id).iter().rev().copied());
        }
        out
    }

    /// Children are later than their parent in pre-order, so they are
    /// already built when the parent is.
    fn take_children(
        &self,
        parent: ItemId,
        built: &mut HashMap<usize, CommentNode>,
    ) -> Vec<CommentNode> {
        self.child_indices(parent)
            .iter()
            .filter_map(|idx| built.remove(idx))
            .collect()
    }

    fn child_indices(&self, parent: ItemId) -> &[usize] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }
}
