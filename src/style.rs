use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Borders;

/// How the scroll offset follows the selected row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeScrollPolicy {
    KeepInView,
    CenterOnSelect,
}

/// Visual settings for [`crate::HierarchyView`] and the rows it caches.
///
/// Row styles end up inside cached lines: call
/// [`crate::InspectorState::invalidate`] after changing them.
#[derive(Clone, Debug)]
pub struct InspectorStyle<'a> {
    pub title: Option<Line<'a>>,
    pub block_style: Style,
    pub border_style: Style,
    pub highlight_style: Style,
    pub line_style: Style,
    /// Style of the widget class name.
    pub class_style: Style,
    /// Style of quoted text and content description.
    pub text_style: Style,
    /// Style of resource ids and markers.
    pub meta_style: Style,
    pub highlight_symbol: &'a str,
    pub borders: Borders,
    pub scroll_policy: TreeScrollPolicy,
}

impl Default for InspectorStyle<'_> {
    fn default() -> Self {
        Self {
            title: None,
            block_style: Style::default(),
            border_style: Style::default(),
            highlight_style: Style::default().add_modifier(Modifier::REVERSED),
            line_style: Style::default(),
            class_style: Style::default().add_modifier(Modifier::BOLD),
            text_style: Style::default(),
            meta_style: Style::default().add_modifier(Modifier::DIM),
            highlight_symbol: ">> ",
            borders: Borders::ALL,
            scroll_policy: TreeScrollPolicy::KeepInView,
        }
    }
}
