use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::hierarchy::Hierarchy;
use crate::model::{TreeFilter, TreeModel};
use crate::node::{Node, NodeId};

/// Which nodes may show their children in a flattened view.
#[derive(Clone, Copy, Debug)]
pub enum Expansion<'a> {
    /// Every node is expanded.
    All,
    /// Only the listed nodes are expanded; the rest still appear, without children.
    Only(&'a FxHashSet<NodeId>),
}

impl Expansion<'_> {
    #[inline]
    fn is_expanded(&self, id: NodeId) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(&id),
        }
    }
}

/// One row of a flattened view with the metadata a tree renderer needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatRow {
    pub(crate) id: NodeId,
    pub(crate) level: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) has_children: bool,
    // One entry per ancestor level: whether that ancestor was the last visible sibling.
    pub(crate) is_tail_stack: SmallVec<[bool; 8]>,
}

impl FlatRow {
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Indentation level of the row (0 for top-level rows).
    pub const fn level(&self) -> u32 {
        self.level
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the node has children in the source tree, shown or not.
    pub const fn has_children(&self) -> bool {
        self.has_children
    }

    pub fn is_tail_stack(&self) -> &[bool] {
        &self.is_tail_stack
    }
}

/// Read-only ordered projection of a hierarchy.
///
/// Views are rebuilt, never edited, whenever the tree, the expansion set or
/// the active filter changes.
#[derive(Clone, Debug, Default)]
pub struct FlattenedView {
    rows: Vec<FlatRow>,
    index: FxHashMap<NodeId, usize>,
}

impl PartialEq for FlattenedView {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl Eq for FlattenedView {}

impl FlattenedView {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    /// Builds a flat list (no indentation) from nodes already in display order.
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut view = Self::default();
        for node in nodes {
            view.push(FlatRow {
                id: node.id(),
                level: 0,
                parent: node.parent(),
                has_children: false,
                is_tail_stack: SmallVec::new(),
            });
        }
        view
    }

    fn push(&mut self, row: FlatRow) {
        self.index.insert(row.id, self.rows.len());
        self.rows.push(row);
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn get(&self, position: usize) -> Option<&FlatRow> {
        self.rows.get(position)
    }

    /// Row position of `id`, if it is part of the view.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn ids(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        self.rows.iter().map(|row| row.id)
    }

    /// Resolves the rows against the tree they were built from.
    pub fn nodes<'a>(&'a self, tree: &'a Hierarchy) -> impl ExactSizeIterator<Item = &'a Node> + 'a {
        self.rows.iter().map(move |row| tree.node(row.id))
    }
}

/// Flattens a tree in pre-order: a node, then its children left to right.
///
/// Without restriction the view holds every node. Calling this twice with the
/// same inputs yields identical views.
pub fn flatten<T>(model: &T, expansion: Expansion<'_>) -> FlattenedView
where
    T: TreeModel<Id = NodeId>,
{
    let mut view = FlattenedView::with_capacity(model.size_hint());
    let Some(root) = model.root() else {
        return view;
    };

    let mut stack: Vec<(NodeId, u32, Option<NodeId>, SmallVec<[bool; 8]>)> =
        vec![(root, 0, None, SmallVec::new())];
    while let Some((id, level, parent, is_tail_stack)) = stack.pop() {
        let children = model.children(id);
        let has_children = !children.is_empty();
        let expanded = has_children && expansion.is_expanded(id);
        if expanded {
            let last = children.len() - 1;
            for (idx, child) in children.iter().copied().enumerate().rev() {
                let mut child_stack = is_tail_stack.clone();
                child_stack.push(idx == last);
                stack.push((child, level + 1, Some(id), child_stack));
            }
        }
        view.push(FlatRow {
            id,
            level,
            parent,
            has_children,
            is_tail_stack,
        });
    }

    debug!(rows = view.len(), "hierarchy flattened");
    view
}

/// Flattens only the nodes that match `filter` plus the ancestors leading to them.
///
/// A kept node shows its kept children when `auto_expand` is set or the node
/// is expanded in `expansion`.
pub fn flatten_filtered<F>(
    tree: &Hierarchy,
    filter: &F,
    expansion: Expansion<'_>,
    auto_expand: bool,
) -> FlattenedView
where
    F: TreeFilter<Hierarchy>,
{
    // Children always follow their parent in pre-order, so a reverse sweep
    // sees every child before the parent.
    let mut keep = vec![false; tree.len()];
    for idx in (0..tree.len()).rev() {
        let id = NodeId::from_index(idx);
        keep[idx] = filter.is_match(tree, id)
            || tree.node(id).children().iter().any(|child| keep[child.index()]);
    }

    let mut view = FlattenedView::default();
    if !keep[NodeId::ROOT.index()] {
        debug!(rows = 0, "filtered hierarchy flattened");
        return view;
    }

    let mut stack: Vec<(NodeId, u32, Option<NodeId>, SmallVec<[bool; 8]>)> =
        vec![(NodeId::ROOT, 0, None, SmallVec::new())];
    while let Some((id, level, parent, is_tail_stack)) = stack.pop() {
        let node = tree.node(id);
        if auto_expand || expansion.is_expanded(id) {
            let kept: SmallVec<[NodeId; 8]> = node
                .children()
                .iter()
                .copied()
                .filter(|child| keep[child.index()])
                .collect();
            let last = kept.len().saturating_sub(1);
            for (idx, child) in kept.iter().copied().enumerate().rev() {
                let mut child_stack = is_tail_stack.clone();
                child_stack.push(idx == last);
                stack.push((child, level + 1, Some(id), child_stack));
            }
        }
        view.push(FlatRow {
            id,
            level,
            parent,
            has_children: !node.is_leaf(),
            is_tail_stack,
        });
    }

    debug!(rows = view.len(), "filtered hierarchy flattened");
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    // root(0) -> a(1) -> {a1(2), a2(3)}, b(4)
    const DUMP: &str = r#"<hierarchy>
        <node class="a"><node class="a1" text="x"/><node class="a2"/></node>
        <node class="b"/>
    </hierarchy>"#;

    fn ids(view: &FlattenedView) -> Vec<usize> {
        view.ids().map(NodeId::index).collect()
    }

    #[test]
    fn full_flatten_is_preorder_over_every_node() {
        let tree = parse(DUMP).unwrap();
        let view = flatten(&tree, Expansion::All);
        assert_eq!(view.len(), tree.len());
        assert_eq!(ids(&view), vec![0, 1, 2, 3, 4]);
        let levels: Vec<_> = view.rows().iter().map(FlatRow::level).collect();
        assert_eq!(levels, vec![0, 1, 2, 2, 1]);
        assert_eq!(view.get(3).unwrap().is_tail_stack(), &[false, true]);
        assert_eq!(view.get(4).unwrap().is_tail_stack(), &[true]);
        assert_eq!(view.position_of(NodeId(3)), Some(3));
    }

    #[test]
    fn flatten_is_idempotent() {
        let tree = parse(DUMP).unwrap();
        assert_eq!(flatten(&tree, Expansion::All), flatten(&tree, Expansion::All));
    }

    #[test]
    fn collapsed_nodes_hide_children_only() {
        let tree = parse(DUMP).unwrap();
        let mut expanded = FxHashSet::default();
        let view = flatten(&tree, Expansion::Only(&expanded));
        assert_eq!(ids(&view), vec![0]);
        assert!(view.get(0).unwrap().has_children());

        expanded.insert(NodeId::ROOT);
        let view = flatten(&tree, Expansion::Only(&expanded));
        assert_eq!(ids(&view), vec![0, 1, 4]);
        assert!(!view.contains(NodeId(2)));
    }

    #[test]
    fn filtered_view_keeps_matching_path() {
        let tree = parse(DUMP).unwrap();
        let filter = |tree: &Hierarchy, id: NodeId| tree.node(id).class_name() == "a2";
        let view = flatten_filtered(&tree, &filter, Expansion::All, true);
        assert_eq!(ids(&view), vec![0, 1, 3]);
        assert_eq!(view.get(2).unwrap().is_tail_stack(), &[true, true]);

        let none = |_: &Hierarchy, _: NodeId| false;
        assert!(flatten_filtered(&tree, &none, Expansion::All, true).is_empty());
    }

    #[test]
    fn filtered_view_respects_expansion_without_auto_expand() {
        let tree = parse(DUMP).unwrap();
        let filter = |tree: &Hierarchy, id: NodeId| tree.node(id).text() == "x";
        let expanded: FxHashSet<NodeId> = [NodeId::ROOT].into_iter().collect();
        let view = flatten_filtered(&tree, &filter, Expansion::Only(&expanded), false);
        assert_eq!(ids(&view), vec![0, 1]);
    }

    #[test]
    fn flat_view_from_nodes() {
        let tree = parse(DUMP).unwrap();
        let view = FlattenedView::from_nodes(tree.iter().filter(|n| n.is_leaf()));
        assert_eq!(ids(&view), vec![2, 3, 4]);
        assert!(view.rows().iter().all(|row| row.level() == 0));
        let classes: Vec<_> = view.nodes(&tree).map(Node::class_name).collect();
        assert_eq!(classes, vec!["a1", "a2", "b"]);
    }
}
