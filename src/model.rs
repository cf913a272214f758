use std::hash::Hash;

/// Minimal tree contract used by flattening and the list view.
///
/// A proper tree is expected (not a DAG):
/// - no cycles (DFS traversal is used directly);
/// - each node has exactly one parent;
/// - identifiers are stable for the lifetime of the model.
///
/// [`crate::Hierarchy`] is the implementation produced by the dump parser.
pub trait TreeModel {
    /// Node identifier type.
    type Id: Copy + Eq + Hash;

    /// Returns the root node (or `None` if the tree is empty).
    fn root(&self) -> Option<Self::Id>;
    /// Returns the node's children in document order.
    fn children(&self, id: Self::Id) -> &[Self::Id];
    /// Returns `true` if the node exists in the model.
    fn contains(&self, id: Self::Id) -> bool;
    /// Returns an approximate size hint (not required to be exact).
    fn size_hint(&self) -> usize {
        0
    }
}

/// Per-node predicate used to build a reduced tree view.
pub trait TreeFilter<T: TreeModel> {
    /// Returns `true` if the node matches the filter criteria.
    fn is_match(&self, model: &T, id: T::Id) -> bool;
}

impl<T, F> TreeFilter<T> for F
where
    T: TreeModel,
    F: Fn(&T, T::Id) -> bool,
{
    #[inline]
    fn is_match(&self, model: &T, id: T::Id) -> bool {
        self(model, id)
    }
}

/// Shape of the rows produced while a filter is active.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterLayout {
    /// Only matching nodes, as a flat pre-order list.
    #[default]
    Flat,
    /// Matching nodes plus the ancestors leading to them, indented as a tree.
    /// With `auto_expand` every path to a match is shown regardless of the
    /// expansion set.
    Tree { auto_expand: bool },
}

/// Whether and how a filter reduces the visible rows.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeFilterConfig {
    /// Enables or disables filtering.
    pub enabled: bool,
    pub layout: FilterLayout,
}

impl TreeFilterConfig {
    /// Filtering disabled: rows follow the expansion set.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            layout: FilterLayout::Flat,
        }
    }

    /// Matches only, in document order.
    pub const fn flat() -> Self {
        Self {
            enabled: true,
            layout: FilterLayout::Flat,
        }
    }

    /// Matches with their ancestor paths, auto-expanded.
    pub const fn tree() -> Self {
        Self {
            enabled: true,
            layout: FilterLayout::Tree { auto_expand: true },
        }
    }
}

/// Filter that matches every node.
#[derive(Clone, Copy, Debug)]
pub struct NoFilter;

impl<T: TreeModel> TreeFilter<T> for NoFilter {
    #[inline]
    fn is_match(&self, _model: &T, _id: T::Id) -> bool {
        true
    }
}
