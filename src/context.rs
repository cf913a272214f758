use ratatui::style::Style;

/// Per-row facts a label renderer needs, borrowed from the flattened view.
#[derive(Clone, Copy, Debug)]
pub struct RowContext<'a> {
    pub level: u32,
    pub is_tail_stack: &'a [bool],
    pub is_expanded: bool,
    pub has_children: bool,
    pub is_selected: bool,
    pub draw_lines: bool,
    pub line_style: Style,
}
