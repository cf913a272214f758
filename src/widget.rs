use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::{
    Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget,
};

use crate::glyphs::TreeGlyphs;
use crate::hierarchy::Hierarchy;
use crate::model::{NoFilter, TreeFilter, TreeFilterConfig};
use crate::state::InspectorState;
use crate::style::InspectorStyle;

/// Scrollable tree view of a parsed hierarchy.
///
/// Only the rows of the virtual window are rendered; their lines come from
/// the state's render cache. One terminal row shows one list item.
pub struct HierarchyView<'a, F = NoFilter>
where
    F: TreeFilter<Hierarchy>,
{
    tree: &'a Hierarchy,
    style: InspectorStyle<'a>,
    glyphs: TreeGlyphs<'a>,
    filter: F,
    filter_config: TreeFilterConfig,
}

impl<'a> HierarchyView<'a, NoFilter> {
    pub const fn new(tree: &'a Hierarchy, style: InspectorStyle<'a>) -> Self {
        Self {
            tree,
            style,
            glyphs: TreeGlyphs::unicode(),
            filter: NoFilter,
            filter_config: TreeFilterConfig::disabled(),
        }
    }

    pub fn with_filter<F>(self, filter: F, filter_config: TreeFilterConfig) -> HierarchyView<'a, F>
    where
        F: TreeFilter<Hierarchy>,
    {
        HierarchyView {
            tree: self.tree,
            style: self.style,
            glyphs: self.glyphs,
            filter,
            filter_config,
        }
    }
}

impl<'a, F> HierarchyView<'a, F>
where
    F: TreeFilter<Hierarchy>,
{
    #[must_use]
    pub const fn glyphs(mut self, glyphs: TreeGlyphs<'a>) -> Self {
        self.glyphs = glyphs;
        self
    }

    fn block(&self) -> Block<'a> {
        let mut block = Block::default()
            .borders(self.style.borders)
            .style(self.style.block_style)
            .border_style(self.style.border_style);
        if let Some(title) = self.style.title.clone() {
            block = block.title(title);
        }
        block
    }

    fn render_scrollbar(area: Rect, buf: &mut Buffer, total: usize, first: usize, height: usize) {
        let scroll_len = total.saturating_sub(height).saturating_add(1);
        let mut scrollbar_state = ScrollbarState::new(scroll_len)
            .position(first.min(scroll_len - 1))
            .viewport_content_length(height);
        Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .render(area, buf, &mut scrollbar_state);
    }
}

impl<F> StatefulWidget for HierarchyView<'_, F>
where
    F: TreeFilter<Hierarchy>,
{
    type State = InspectorState;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "offsets are clamped to the row count"
    )]
    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        state.ensure_rows_filtered(self.tree, &self.filter, self.filter_config);

        let mut block = self.block();
        let height = block.inner(area).height;
        let item_height = state.window().item_height();
        let viewport = f64::from(height) * item_height;
        state.ensure_selection_visible_with_policy(viewport, self.style.scroll_policy);

        let total = state.visible_len();
        let scrollable = total > usize::from(height) && area.width > 1;
        let (list_area, scrollbar_area) = if scrollable {
            let mut borders = self.style.borders;
            borders.remove(Borders::RIGHT);
            block = block.borders(borders);
            let list_area = Rect {
                width: area.width - 1,
                ..area
            };
            let scrollbar_area = Rect {
                x: area.right() - 1,
                width: 1,
                ..area
            };
            (list_area, Some(scrollbar_area))
        } else {
            (area, None)
        };

        let inner = block.inner(list_area);
        block.render(list_area, buf);

        // The window clamps the offset when the rows shrank, so `first` is
        // read after it.
        let range = state.visible_window(viewport);
        let first = (state.window().scroll_offset() / item_height).floor() as usize;
        if let Some(range) = range {
            // Overscan rows outside the viewport are rendered into the cache
            // but not drawn.
            for position in range.indices() {
                let Some(line) = state.row_line(self.tree, position, &self.glyphs, &self.style)
                else {
                    continue;
                };
                let Some(row) = position.checked_sub(first) else {
                    continue;
                };
                let Ok(row) = u16::try_from(row) else {
                    continue;
                };
                if row >= inner.height {
                    continue;
                }
                let y = inner.y + row;
                buf.set_line(inner.x, y, line, inner.width);
                if state.selected() == Some(position) {
                    buf.set_style(Rect::new(inner.x, y, inner.width, 1), self.style.highlight_style);
                }
            }
        }

        if let Some(scrollbar_area) = scrollbar_area {
            Self::render_scrollbar(scrollbar_area, buf, total, first, usize::from(height));
        }
    }
}
