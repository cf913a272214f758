use ratatui::text::Line;
use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::debug;

use crate::action::{TreeAction, TreeEvent};
use crate::cache::{RenderCache, RowKey};
use crate::config::InspectorConfig;
use crate::context::RowContext;
use crate::flatten::{Expansion, FlattenedView, flatten, flatten_filtered};
use crate::glyphs::{TreeGlyphs, row_line};
use crate::hierarchy::Hierarchy;
use crate::model::{FilterLayout, NoFilter, TreeFilter, TreeFilterConfig, TreeModel};
use crate::node::{Node, NodeId};
use crate::style::{InspectorStyle, TreeScrollPolicy};
use crate::window::{VirtualWindow, VisibleRange};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// View state over one [`Hierarchy`]: expanded nodes, selection, the cached
/// flattened rows, the scroll window and memoized row renders.
///
/// The state does not own the tree. After switching to another tree call
/// [`InspectorState::reset`]; ids from the old tree mean nothing in the new one.
#[derive(Debug)]
pub struct InspectorState {
    selected: Option<usize>,
    expanded: FxHashSet<NodeId>,
    // Cached rows; rebuilt only when dirty.
    rows: FlattenedView,
    dirty: bool,
    window: VirtualWindow,
    render_cache: RenderCache<Line<'static>>,
    draw_lines: bool,
}

/// Snapshot of state (selection, expansion, scroll position).
///
/// With the `serde` feature enabled, this type derives `Serialize`/`Deserialize`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct InspectorSnapshot {
    pub expanded: Vec<NodeId>,
    pub selected: Option<NodeId>,
    pub scroll_offset: f64,
    pub draw_lines: bool,
}

impl Default for InspectorState {
    fn default() -> Self {
        Self::new(&InspectorConfig::default())
    }
}

impl InspectorState {
    /// # Panics
    ///
    /// Panics if the configured item height is not positive and finite, or
    /// the render cache capacity is zero.
    pub fn new(config: &InspectorConfig) -> Self {
        Self {
            selected: None,
            expanded: FxHashSet::with_capacity_and_hasher(0, FxBuildHasher),
            rows: FlattenedView::default(),
            dirty: true,
            window: VirtualWindow::new(config.item_height, config.overscan),
            render_cache: RenderCache::new(config.render_cache_capacity),
            draw_lines: config.draw_lines,
        }
    }

    /// Forgets everything tied to the previous tree. The root stays expanded
    /// so its children are visible.
    pub fn reset(&mut self) {
        self.expanded.clear();
        self.expanded.insert(NodeId::ROOT);
        self.selected = None;
        self.window.set_scroll_offset(0.0);
        self.invalidate();
    }

    /// Captures a snapshot of the current state for persistence or restore.
    pub fn snapshot(&self) -> InspectorSnapshot {
        let mut expanded: Vec<NodeId> = self.expanded.iter().copied().collect();
        expanded.sort_unstable();
        InspectorSnapshot {
            expanded,
            selected: self.selected_id(),
            scroll_offset: self.window.scroll_offset(),
            draw_lines: self.draw_lines,
        }
    }

    /// Restores state from a previously captured snapshot of the same tree.
    pub fn restore(&mut self, tree: &Hierarchy, snapshot: InspectorSnapshot) {
        self.expanded = snapshot
            .expanded
            .into_iter()
            .filter(|id| tree.contains(*id))
            .collect();
        self.draw_lines = snapshot.draw_lines;
        self.window.set_scroll_offset(snapshot.scroll_offset);
        self.invalidate();
        self.ensure_rows(tree);
        self.selected = snapshot.selected.and_then(|id| self.rows.position_of(id));
    }

    /// Returns whether guide lines are drawn.
    #[inline]
    pub const fn draw_lines(&self) -> bool {
        self.draw_lines
    }

    /// Enables or disables drawing of guide lines.
    pub fn set_draw_lines(&mut self, draw: bool) {
        if self.draw_lines != draw {
            self.draw_lines = draw;
            self.render_cache.clear();
        }
    }

    /// Marks the rows as stale and drops every memoized render.
    ///
    /// Call after changing the filter, the glyphs or the row styles.
    pub fn invalidate(&mut self) {
        self.dirty = true;
        self.render_cache.clear();
    }

    pub const fn rows(&self) -> &FlattenedView {
        &self.rows
    }

    pub const fn window(&self) -> &VirtualWindow {
        &self.window
    }

    pub const fn render_cache(&self) -> &RenderCache<Line<'static>> {
        &self.render_cache
    }

    /// Returns the number of rows in the current view.
    pub const fn visible_len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    /// Position of the selected row, if any.
    pub const fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Returns the id of the currently selected node, if any.
    pub fn selected_id(&self) -> Option<NodeId> {
        self.selected
            .and_then(|idx| self.rows.get(idx).map(|row| row.id()))
    }

    /// Selects a row by position; out-of-range positions clear the selection.
    pub fn select(&mut self, position: Option<usize>) {
        self.selected = position.filter(|&idx| idx < self.rows.len());
    }

    pub fn select_first(&mut self) {
        self.select((!self.rows.is_empty()).then_some(0));
    }

    pub fn select_last(&mut self) {
        self.select(self.rows.len().checked_sub(1));
    }

    /// Moves selection to the previous visible row.
    pub fn select_prev(&mut self) {
        if self.rows.is_empty() {
            self.selected = None;
            return;
        }
        let selected = self.selected.unwrap_or(0);
        self.selected = Some(selected.saturating_sub(1));
    }

    /// Moves selection to the next visible row.
    pub fn select_next(&mut self) {
        if self.rows.is_empty() {
            self.selected = None;
            return;
        }
        let new_selected = self
            .selected
            .map_or(0, |selected| (selected + 1).min(self.rows.len() - 1));
        self.selected = Some(new_selected);
    }

    /// Number of whole rows the viewport shows.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "non-negative and far below usize::MAX"
    )]
    fn page_rows(&self) -> usize {
        ((self.window.viewport_height() / self.window.item_height()).floor() as usize).max(1)
    }

    fn page_up(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let selected = self.selected.unwrap_or(0);
        self.selected = Some(selected.saturating_sub(self.page_rows()));
    }

    fn page_down(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let last = self.rows.len() - 1;
        let selected = self.selected.unwrap_or(0);
        self.selected = Some(selected.saturating_add(self.page_rows()).min(last));
    }

    /// Scrolls the view down by the given number of rows.
    pub fn scroll_down_by(&mut self, amount: u16) {
        let offset = f64::from(amount).mul_add(self.window.item_height(), self.window.scroll_offset());
        self.window
            .set_scroll_offset(offset.min(self.window.max_scroll_offset()));
    }

    /// Scrolls the view up by the given number of rows.
    pub fn scroll_up_by(&mut self, amount: u16) {
        let offset = f64::from(amount).mul_add(-self.window.item_height(), self.window.scroll_offset());
        self.window.set_scroll_offset(offset);
    }

    /// Adjusts the scroll offset so the selection is within the viewport.
    pub fn ensure_selection_visible(&mut self, viewport_height: f64) {
        self.window.set_total_count(self.rows.len());
        self.window.set_viewport_height(viewport_height);
        self.clamp_selection();
        let Some(selected) = self.selected else {
            return;
        };
        let offset = self.window.scroll_into_view(selected);
        self.window.set_scroll_offset(offset);
    }

    /// Adjusts selection visibility according to the provided scroll policy.
    pub fn ensure_selection_visible_with_policy(
        &mut self,
        viewport_height: f64,
        policy: TreeScrollPolicy,
    ) {
        match policy {
            TreeScrollPolicy::KeepInView => self.ensure_selection_visible(viewport_height),
            TreeScrollPolicy::CenterOnSelect => {
                self.ensure_selection_visible_centered(viewport_height);
            }
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "row counts stay far below 2^52")]
    fn ensure_selection_visible_centered(&mut self, viewport_height: f64) {
        self.window.set_total_count(self.rows.len());
        self.window.set_viewport_height(viewport_height);
        self.clamp_selection();
        let Some(selected) = self.selected else {
            return;
        };
        let item_height = self.window.item_height();
        let center = (selected as f64 + 0.5) * item_height;
        let offset = (center - viewport_height / 2.0).clamp(0.0, self.window.max_scroll_offset());
        self.window.set_scroll_offset(offset);
    }

    /// Returns the rows to render for a viewport of the given height, with
    /// overscan. `None` when there are no rows.
    pub fn visible_window(&mut self, viewport_height: f64) -> Option<VisibleRange> {
        self.window.set_total_count(self.rows.len());
        self.window.set_viewport_height(viewport_height);
        let max = self.window.max_scroll_offset();
        if self.window.scroll_offset() > max {
            self.window.set_scroll_offset(max);
        }
        self.window.range()
    }

    /// Expands every ancestor of `id` so it becomes visible.
    pub fn expand_to(&mut self, tree: &Hierarchy, id: NodeId) -> bool {
        if !tree.contains(id) {
            return false;
        }
        self.expanded.extend(tree.ancestors(id).map(Node::id));
        self.invalidate();
        true
    }

    /// Expands the tree to the node and selects it if present.
    pub fn select_by_id(&mut self, tree: &Hierarchy, id: NodeId) -> bool {
        if !self.expand_to(tree, id) {
            return false;
        }
        self.ensure_rows(tree);
        self.selected = self.rows.position_of(id);
        self.selected.is_some()
    }

    /// Expands all nodes in the model.
    pub fn expand_all<T: TreeModel<Id = NodeId>>(&mut self, model: &T) {
        self.expanded.clear();
        self.expanded.reserve(model.size_hint());
        if let Some(root) = model.root() {
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                let children = model.children(node);
                if !children.is_empty() {
                    self.expanded.insert(node);
                    stack.extend(children.iter().copied());
                }
            }
        }
        self.invalidate();
    }

    /// Collapses all nodes.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
        self.invalidate();
    }

    /// Toggles expansion state for the given node.
    pub fn toggle(&mut self, id: NodeId) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
        self.invalidate();
    }

    /// Sets expansion state for the given node.
    pub fn set_expanded(&mut self, id: NodeId, expand: bool) {
        let changed = if expand {
            self.expanded.insert(id)
        } else {
            self.expanded.remove(&id)
        };
        if changed {
            self.invalidate();
        }
    }

    fn set_expanded_recursive(&mut self, tree: &Hierarchy, id: NodeId, expand: bool) {
        let subtree = std::iter::once(tree.node(id)).chain(tree.descendants(id));
        for node in subtree {
            if expand && !node.is_leaf() {
                self.expanded.insert(node.id());
            } else if !expand {
                self.expanded.remove(&node.id());
            }
        }
        self.invalidate();
    }

    /// Ensures the rows are up to date (if marked dirty).
    pub fn ensure_rows(&mut self, tree: &Hierarchy) {
        self.ensure_rows_filtered(tree, &NoFilter, TreeFilterConfig::disabled());
    }

    /// Ensures the rows are up to date with an active filter.
    ///
    /// The state does not notice filter changes by itself: call
    /// [`InspectorState::invalidate`] when `filter` or `config` change.
    pub fn ensure_rows_filtered<F>(&mut self, tree: &Hierarchy, filter: &F, config: TreeFilterConfig)
    where
        F: TreeFilter<Hierarchy>,
    {
        if !self.dirty {
            return;
        }
        let previous = self.selected_id();
        self.rows = if config.enabled {
            match config.layout {
                FilterLayout::Flat => FlattenedView::from_nodes(
                    tree.iter().filter(|node| filter.is_match(tree, node.id())),
                ),
                FilterLayout::Tree { auto_expand } => {
                    flatten_filtered(tree, filter, Expansion::Only(&self.expanded), auto_expand)
                }
            }
        } else {
            flatten(tree, Expansion::Only(&self.expanded))
        };
        self.dirty = false;
        self.render_cache.clear();
        self.window.set_total_count(self.rows.len());

        // Follow the selected node to its new position when it is still shown.
        if let Some(position) = previous.and_then(|id| self.rows.position_of(id)) {
            self.selected = Some(position);
        }
        self.clamp_selection();
        debug!(rows = self.rows.len(), filtered = config.enabled, "rows rebuilt");
    }

    /// Returns the rendered line for the row at `position`, memoized by node,
    /// selection and expansion.
    pub fn row_line(
        &mut self,
        tree: &Hierarchy,
        position: usize,
        glyphs: &TreeGlyphs<'_>,
        style: &InspectorStyle<'_>,
    ) -> Option<&Line<'static>> {
        let row = self.rows.get(position)?;
        let id = row.id();
        // A row is drawn expanded when its children follow it.
        let is_expanded = row.has_children()
            && self
                .rows
                .get(position + 1)
                .is_some_and(|next| next.parent() == Some(id));
        let is_selected = self.selected == Some(position);
        let ctx = RowContext {
            level: row.level(),
            is_tail_stack: row.is_tail_stack(),
            is_expanded,
            has_children: row.has_children(),
            is_selected,
            draw_lines: self.draw_lines,
            line_style: style.line_style,
        };
        let key = RowKey::new(id, is_selected, is_expanded);
        Some(
            self.render_cache
                .get_or_insert_with(key, || row_line(&ctx, tree.node(id), glyphs, style)),
        )
    }

    /// Handles a tree action and returns the resulting event.
    pub fn handle_action<C>(&mut self, tree: &Hierarchy, action: TreeAction<C>) -> TreeEvent<C> {
        self.handle_action_filtered(tree, &NoFilter, TreeFilterConfig::disabled(), action)
    }

    /// Handles a tree action with filtering enabled and returns the resulting event.
    pub fn handle_action_filtered<F, C>(
        &mut self,
        tree: &Hierarchy,
        filter: &F,
        config: TreeFilterConfig,
        action: TreeAction<C>,
    ) -> TreeEvent<C>
    where
        F: TreeFilter<Hierarchy>,
    {
        self.ensure_rows_filtered(tree, filter, config);

        if matches!(&action, TreeAction::Custom(_)) {
            return TreeEvent::Action(action);
        }

        if self.rows.is_empty() {
            return TreeEvent::Unhandled;
        }

        match action {
            TreeAction::SelectPrev => self.select_prev(),
            TreeAction::SelectNext => self.select_next(),
            TreeAction::SelectParent => self.select_parent(),
            TreeAction::SelectChild => self.select_child_with_descendants(tree, filter, config),
            TreeAction::SelectFirst => self.select_first(),
            TreeAction::SelectLast => self.select_last(),
            TreeAction::PageUp => self.page_up(),
            TreeAction::PageDown => self.page_down(),
            TreeAction::ToggleNode => {
                let Some(row) = self.selected.and_then(|idx| self.rows.get(idx)) else {
                    return TreeEvent::Unhandled;
                };
                if !row.has_children() {
                    return TreeEvent::Unhandled;
                }
                let id = row.id();
                self.toggle(id);
            }
            TreeAction::ToggleRecursive => {
                let Some(row) = self.selected.and_then(|idx| self.rows.get(idx)) else {
                    return TreeEvent::Unhandled;
                };
                if !row.has_children() {
                    return TreeEvent::Unhandled;
                }
                let id = row.id();
                let should_expand = !self.expanded.contains(&id);
                self.set_expanded_recursive(tree, id, should_expand);
            }
            TreeAction::ExpandAll => self.expand_all(tree),
            TreeAction::CollapseAll => self.collapse_all(),
            TreeAction::ToggleGuides => self.set_draw_lines(!self.draw_lines),
            TreeAction::Custom(_) => return TreeEvent::Action(action),
        }
        TreeEvent::Handled
    }

    fn clamp_selection(&mut self) {
        if self.rows.is_empty() {
            self.selected = None;
            return;
        }
        if let Some(selected) = self.selected
            && selected >= self.rows.len()
        {
            self.selected = Some(self.rows.len() - 1);
        }
    }

    fn select_parent(&mut self) {
        let Some(parent_id) = self
            .selected
            .and_then(|idx| self.rows.get(idx))
            .and_then(|row| row.parent())
        else {
            return;
        };
        if let Some(parent_idx) = self.rows.position_of(parent_id) {
            self.selected = Some(parent_idx);
        }
    }

    fn select_child_with_descendants<F>(
        &mut self,
        tree: &Hierarchy,
        filter: &F,
        config: TreeFilterConfig,
    ) where
        F: TreeFilter<Hierarchy>,
    {
        let Some(mut selected_idx) = self.selected else {
            return;
        };
        let Some(row) = self.rows.get(selected_idx) else {
            return;
        };
        let id = row.id();
        let mut level = row.level();

        if row.has_children() {
            if self.expanded.insert(id) {
                self.invalidate();
                self.ensure_rows_filtered(tree, filter, config);
                let Some(current_idx) = self.rows.position_of(id) else {
                    return;
                };
                selected_idx = current_idx;
                level = self.rows.rows()[current_idx].level();
                self.selected = Some(current_idx);
            }

            // Prefer children that themselves have descendants.
            for (idx, candidate) in self.rows.rows().iter().enumerate().skip(selected_idx + 1) {
                if candidate.level() <= level {
                    break;
                }
                if candidate.level() == level + 1 && candidate.has_children() {
                    self.selected = Some(idx);
                    return;
                }
            }
        }

        // Fallback: pick the next node in the subtree that has children.
        for (idx, candidate) in self.rows.rows().iter().enumerate().skip(selected_idx + 1) {
            if candidate.level() < level {
                break;
            }
            if candidate.has_children() {
                self.selected = Some(idx);
                return;
            }
        }
    }
}
