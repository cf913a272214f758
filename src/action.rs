/// Navigation and expansion requests a host can issue against the inspector.
///
/// The tree itself is read-only, so every action changes view state only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeAction<Custom = ()> {
    /// Move selection to the previous visible row.
    SelectPrev,
    /// Move selection to the next visible row.
    SelectNext,
    /// Move selection to the parent node.
    SelectParent,
    /// Expand the selection; if possible, move to an expandable descendant.
    SelectChild,
    /// Select the first visible row.
    SelectFirst,
    /// Select the last visible row.
    SelectLast,
    /// Move selection up by one viewport.
    PageUp,
    /// Move selection down by one viewport.
    PageDown,
    /// Toggle expansion for the selected node only.
    ToggleNode,
    /// Toggle expansion recursively for the selected subtree.
    ToggleRecursive,
    /// Expand every node in the tree.
    ExpandAll,
    /// Collapse every node in the tree.
    CollapseAll,
    /// Toggle drawing of guide lines.
    ToggleGuides,
    /// Custom action forwarded to the caller without internal handling.
    Custom(Custom),
}

/// Result of handling an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent<Custom = ()> {
    /// The action was handled internally and state was updated.
    Handled,
    /// The action was ignored (e.g., nothing selected / nothing to do).
    Unhandled,
    /// The action is forwarded to the caller for handling.
    Action(TreeAction<Custom>),
}
