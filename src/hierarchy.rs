use std::iter::FusedIterator;

use smallvec::SmallVec;
use tracing::debug;

use crate::model::TreeModel;
use crate::node::{Node, NodeData, NodeId};

/// Immutable widget tree produced by parsing a dump.
///
/// Nodes live in one arena in pre-order, so a node's subtree is the
/// contiguous run `[id, subtree_end)`. Dropping the hierarchy frees every
/// node at once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hierarchy {
    nodes: Vec<Node>,
    // Exclusive end of each node's subtree in `nodes`.
    subtree_end: Vec<u32>,
}

impl Hierarchy {
    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Returns the total number of nodes (the root included).
    #[inline]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a hierarchy has at least its root.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this hierarchy.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns the node for `id`, or `None` if it is out of range.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Iterates over all nodes in pre-order.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Returns the parent node, or `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.node(id).parent.map(|parent| self.node(parent))
    }

    /// Iterates over the direct children of `id` in sibling order.
    pub fn children(&self, id: NodeId) -> impl ExactSizeIterator<Item = &Node> + '_ {
        self.node(id).children.iter().map(|&child| self.node(child))
    }

    /// Iterates over the ancestors of `id`, nearest first. The node itself is excluded.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            hierarchy: self,
            next: self.node(id).parent,
        }
    }

    /// Returns the ids from `id` up to and including the root.
    pub fn path_to_root(&self, id: NodeId) -> SmallVec<[NodeId; 16]> {
        let mut path = SmallVec::new();
        path.push(id);
        path.extend(self.ancestors(id).map(Node::id));
        path
    }

    /// Returns the sibling indices leading from the root down to `id`.
    ///
    /// The root's path is empty. Two parses of the same dump agree on paths.
    pub fn structural_path(&self, id: NodeId) -> SmallVec<[u32; 16]> {
        let mut path: SmallVec<[u32; 16]> = self
            .path_to_root(id)
            .iter()
            .filter(|&&node| node != NodeId::ROOT)
            .map(|&node| self.node(node).sibling_index)
            .collect();
        path.reverse();
        path
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let start = ancestor.index();
        let end = self.subtree_end[start] as usize;
        let idx = node.index();
        idx > start && idx < end
    }

    /// Returns the number of nodes in the subtree rooted at `id`, itself included.
    pub fn subtree_len(&self, id: NodeId) -> usize {
        self.subtree_end[id.index()] as usize - id.index()
    }

    /// Iterates over the strict descendants of `id` in pre-order.
    pub fn descendants(&self, id: NodeId) -> std::slice::Iter<'_, Node> {
        let start = id.index() + 1;
        let end = self.subtree_end[id.index()] as usize;
        self.nodes[start..end].iter()
    }

    /// Returns the nodes whose bounds contain the point, deepest first.
    ///
    /// Among nodes of equal depth the one later in document order (drawn on
    /// top) comes first.
    pub fn nodes_at_point(&self, x: u32, y: u32) -> Vec<&Node> {
        let mut hits: Vec<&Node> = self
            .nodes
            .iter()
            .rev()
            .filter(|node| node.bounds().contains_point(x, y))
            .collect();
        hits.sort_by(|a, b| b.depth.cmp(&a.depth));
        hits
    }
}

impl<'a> IntoIterator for &'a Hierarchy {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TreeModel for Hierarchy {
    type Id = NodeId;

    fn root(&self) -> Option<Self::Id> {
        Some(NodeId::ROOT)
    }

    fn children(&self, id: Self::Id) -> &[Self::Id] {
        &self.node(id).children
    }

    fn contains(&self, id: Self::Id) -> bool {
        id.index() < self.nodes.len()
    }

    fn size_hint(&self) -> usize {
        self.nodes.len()
    }
}

/// Iterator returned by [`Hierarchy::ancestors`].
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    hierarchy: &'a Hierarchy,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.hierarchy.node(self.next?);
        self.next = node.parent;
        Some(node)
    }
}

impl FusedIterator for Ancestors<'_> {}

/// Handle to a node under construction in a [`HierarchyBuilder`].
///
/// Slot ids are only meaningful for the builder that issued them and are
/// replaced by pre-order [`NodeId`]s when the tree is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

struct Slot {
    data: NodeData,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Batch constructor for a [`Hierarchy`].
///
/// Structure can only change here: once [`HierarchyBuilder::build`] runs the
/// tree is frozen.
pub struct HierarchyBuilder {
    slots: Vec<Slot>,
}

impl HierarchyBuilder {
    /// Starts a tree whose root carries `root`.
    pub fn new(root: NodeData) -> Self {
        Self::with_capacity(root, 0)
    }

    /// Starts a tree with room for `capacity` nodes.
    pub fn with_capacity(root: NodeData, capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity.max(1));
        slots.push(Slot {
            data: root,
            parent: None,
            children: Vec::new(),
        });
        Self { slots }
    }

    /// Returns the root slot.
    pub const fn root(&self) -> SlotId {
        SlotId(0)
    }

    /// Returns the number of slots created so far, detached ones included.
    pub const fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Appends a new node as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not issued by this builder.
    pub fn attach(&mut self, parent: SlotId, data: NodeData) -> SlotId {
        assert!(parent.0 < self.slots.len(), "unknown parent slot {}", parent.0);
        let id = self.slots.len();
        self.slots.push(Slot {
            data,
            parent: Some(parent.0),
            children: Vec::new(),
        });
        self.slots[parent.0].children.push(id);
        SlotId(id)
    }

    /// Unlinks `slot` from its parent. The whole subtree is dropped on build.
    ///
    /// Returns `false` for the root or a slot that is already detached.
    pub fn detach(&mut self, slot: SlotId) -> bool {
        let Some(parent) = self.slots.get(slot.0).and_then(|s| s.parent) else {
            return false;
        };
        self.slots[parent].children.retain(|&child| child != slot.0);
        self.slots[slot.0].parent = None;
        true
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `slot`.
    pub fn is_ancestor_of(&self, ancestor: SlotId, slot: SlotId) -> bool {
        let mut current = self.slots.get(slot.0).and_then(|s| s.parent);
        while let Some(idx) = current {
            if idx == ancestor.0 {
                return true;
            }
            current = self.slots[idx].parent;
        }
        false
    }

    /// Freezes the tree.
    ///
    /// Reachable nodes are renumbered in pre-order; depth and sibling index
    /// are derived from the final structure.
    pub fn build(mut self) -> Hierarchy {
        let mut nodes: Vec<Node> = Vec::with_capacity(self.slots.len());
        let mut subtree_end: Vec<u32> = Vec::with_capacity(self.slots.len());
        // (slot, parent id, depth, sibling index); a `None` slot closes a subtree.
        let mut stack: Vec<Option<(usize, Option<NodeId>, u32, u32)>> = vec![Some((0, None, 0, 0))];
        let mut open: Vec<usize> = Vec::new();

        while let Some(entry) = stack.pop() {
            let Some((slot_idx, parent, depth, sibling_index)) = entry else {
                if let Some(node_idx) = open.pop() {
                    subtree_end[node_idx] = to_u32(nodes.len());
                }
                continue;
            };
            let id = NodeId::from_index(nodes.len());
            let slot = &mut self.slots[slot_idx];
            let data = std::mem::take(&mut slot.data);
            let child_slots = std::mem::take(&mut slot.children);

            if let Some(parent) = parent {
                nodes[parent.index()].children.push(id);
            }
            nodes.push(Node {
                id,
                parent,
                children: Vec::with_capacity(child_slots.len()),
                depth,
                sibling_index,
                data,
            });
            subtree_end.push(0);
            open.push(id.index());

            stack.push(None);
            for (idx, child) in child_slots.iter().copied().enumerate().rev() {
                stack.push(Some((child, Some(id), depth + 1, to_u32(idx))));
            }
        }

        debug!(
            nodes = nodes.len(),
            dropped = self.slots.len() - nodes.len(),
            "hierarchy built"
        );
        Hierarchy { nodes, subtree_end }
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic!("value {value} overflows u32"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Bounds, NodeAttrs};

    fn data(class: &str) -> NodeData {
        NodeData {
            attrs: NodeAttrs {
                class_name: class.to_string(),
                ..NodeAttrs::default()
            },
            ..NodeData::default()
        }
    }

    // root
    // ├── a
    // │   ├── a1
    // │   └── a2
    // └── b
    fn sample() -> Hierarchy {
        let mut builder = HierarchyBuilder::new(data("root"));
        let root = builder.root();
        let a = builder.attach(root, data("a"));
        builder.attach(a, data("a1"));
        builder.attach(a, data("a2"));
        builder.attach(root, data("b"));
        builder.build()
    }

    fn classes<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<&'a str> {
        nodes.map(Node::class_name).collect()
    }

    #[test]
    fn build_assigns_preorder_ids_and_depths() {
        let tree = sample();
        assert_eq!(tree.len(), 5);
        assert_eq!(classes(tree.iter()), vec!["root", "a", "a1", "a2", "b"]);
        let depths: Vec<_> = tree.iter().map(Node::depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1]);
        let siblings: Vec<_> = tree.iter().map(Node::sibling_index).collect();
        assert_eq!(siblings, vec![0, 0, 0, 1, 1]);
        for node in &tree {
            if let Some(parent) = tree.parent(node.id()) {
                assert_eq!(node.depth(), parent.depth() + 1);
                assert!(parent.children().contains(&node.id()));
            } else {
                assert_eq!(node.id(), NodeId::ROOT);
            }
        }
    }

    #[test]
    fn ancestry_queries() {
        let tree = sample();
        let a2 = NodeId(3);
        let path: Vec<_> = tree.path_to_root(a2).into_iter().collect();
        assert_eq!(path, vec![NodeId(3), NodeId(1), NodeId(0)]);
        assert_eq!(classes(tree.ancestors(a2)), vec!["a", "root"]);
        assert!(tree.is_ancestor_of(NodeId(1), a2));
        assert!(tree.is_ancestor_of(NodeId::ROOT, NodeId(4)));
        assert!(!tree.is_ancestor_of(NodeId(4), a2));
        assert!(!tree.is_ancestor_of(a2, a2));
        assert_eq!(tree.structural_path(a2).as_slice(), &[0, 1]);
        assert!(tree.structural_path(NodeId::ROOT).is_empty());
        assert_eq!(tree.subtree_len(NodeId(1)), 3);
        assert_eq!(classes(tree.descendants(NodeId(1))), vec!["a1", "a2"]);
        assert_eq!(classes(tree.children(NodeId::ROOT)), vec!["a", "b"]);
    }

    #[test]
    fn detached_subtree_is_dropped() {
        let mut builder = HierarchyBuilder::new(data("root"));
        let root = builder.root();
        let a = builder.attach(root, data("a"));
        let a1 = builder.attach(a, data("a1"));
        builder.attach(root, data("b"));

        assert!(builder.is_ancestor_of(root, a1));
        assert!(builder.detach(a));
        assert!(!builder.detach(a));
        assert!(!builder.detach(root));
        assert!(!builder.is_ancestor_of(root, a1));

        let tree = builder.build();
        assert_eq!(classes(tree.iter()), vec!["root", "b"]);
        assert_eq!(tree.node(NodeId(1)).sibling_index(), 0);
    }

    #[test]
    fn nodes_at_point_prefers_deepest() {
        let mut builder = HierarchyBuilder::new(data("root"));
        let root = builder.root();
        let mut outer = data("outer");
        outer.bounds = Bounds::new(0, 0, 100, 100).unwrap();
        let outer = builder.attach(root, outer);
        let mut inner = data("inner");
        inner.bounds = Bounds::new(10, 10, 20, 20).unwrap();
        builder.attach(outer, inner);
        let tree = builder.build();

        assert_eq!(classes(tree.nodes_at_point(15, 15).into_iter()), vec!["inner", "outer"]);
        assert_eq!(classes(tree.nodes_at_point(50, 50).into_iter()), vec!["outer"]);
    }
}
