use ratatui::text::{Line, Span};

use crate::context::RowContext;
use crate::node::Node;
use crate::style::InspectorStyle;

#[derive(Clone, Copy, Debug)]
pub struct TreeGlyphs<'a> {
    pub indent: &'a str,
    pub branch_last: &'a str,
    pub branch: &'a str,
    pub vert: &'a str,
    pub empty: &'a str,
    pub leaf: &'a str,
    pub expanded: &'a str,
    pub collapsed: &'a str,
}

impl TreeGlyphs<'static> {
    pub const fn unicode() -> Self {
        Self {
            indent: "   ",
            branch_last: "└──",
            branch: "├──",
            vert: "│  ",
            empty: "   ",
            leaf: "•",
            expanded: "▼",
            collapsed: "▶",
        }
    }

    pub const fn ascii() -> Self {
        Self {
            indent: "   ",
            branch_last: "`--",
            branch: "|--",
            vert: "|  ",
            empty: "   ",
            leaf: "*",
            expanded: "v",
            collapsed: ">",
        }
    }
}

impl Default for TreeGlyphs<'static> {
    fn default() -> Self {
        Self::unicode()
    }
}

const ROOT_LABEL: &str = "hierarchy";

/// Renders one row: selection marker, tree guides, expander and a summary of
/// the node (short class, text, content description, resource id, NAF flag).
///
/// The result owns its text so it can outlive the tree borrow in a cache.
pub fn row_line(
    ctx: &RowContext<'_>,
    node: &Node,
    glyphs: &TreeGlyphs<'_>,
    style: &InspectorStyle<'_>,
) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::with_capacity(ctx.is_tail_stack.len() + 10);

    let marker = if ctx.is_selected {
        style.highlight_symbol.to_owned()
    } else {
        " ".repeat(style.highlight_symbol.chars().count())
    };
    if !marker.is_empty() {
        spans.push(Span::raw(marker));
    }

    let expander = if ctx.has_children {
        if ctx.is_expanded {
            glyphs.expanded
        } else {
            glyphs.collapsed
        }
    } else if ctx.level == 0 {
        ""
    } else {
        glyphs.leaf
    };

    if ctx.level == 0 || !ctx.draw_lines {
        for _ in 0..ctx.level {
            spans.push(Span::raw(glyphs.empty.to_owned()));
        }
    } else {
        let last_level = ctx.is_tail_stack.len().saturating_sub(1);
        for (l, &is_last) in ctx.is_tail_stack.iter().enumerate() {
            let part = if l == last_level {
                if is_last {
                    glyphs.branch_last
                } else {
                    glyphs.branch
                }
            } else if is_last {
                glyphs.indent
            } else {
                glyphs.vert
            };
            spans.push(Span::styled(part.to_owned(), ctx.line_style));
        }
    }

    if !expander.is_empty() {
        spans.push(Span::raw(expander.to_owned()));
        spans.push(Span::raw(" "));
    }

    let class = if node.is_root() {
        ROOT_LABEL
    } else {
        node.short_class()
    };
    spans.push(Span::styled(class.to_owned(), style.class_style));

    if !node.text().is_empty() {
        spans.push(Span::styled(format!(" {:?}", node.text()), style.text_style));
    }
    if !node.content_desc().is_empty() {
        spans.push(Span::styled(
            format!(" ({})", node.content_desc()),
            style.text_style,
        ));
    }
    if !node.resource_id().is_empty() {
        let id = node
            .resource_id()
            .rsplit_once(":id/")
            .map_or(node.resource_id(), |(_, short)| short);
        spans.push(Span::styled(format!(" #{id}"), style.meta_style));
    }
    if node.is_naf() {
        spans.push(Span::styled(" NAF", style.meta_style));
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::parser::parse;
    use ratatui::style::Style;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn ctx(level: u32, is_tail_stack: &[bool], has_children: bool) -> RowContext<'_> {
        RowContext {
            level,
            is_tail_stack,
            is_expanded: false,
            has_children,
            is_selected: false,
            draw_lines: true,
            line_style: Style::default(),
        }
    }

    #[test]
    fn summarizes_node_attributes() {
        let tree = parse(
            r#"<hierarchy><node class="android.widget.Button" text="OK" content-desc="confirm"
                resource-id="com.app:id/ok" NAF="true"/></hierarchy>"#,
        )
        .unwrap();
        let node = tree.node(NodeId(1));
        let line = row_line(
            &ctx(1, &[true], false),
            node,
            &TreeGlyphs::ascii(),
            &InspectorStyle::default(),
        );
        assert_eq!(plain(&line), "   `--* Button \"OK\" (confirm) #ok NAF");
    }

    #[test]
    fn root_row_has_no_guides() {
        let tree = parse(r#"<hierarchy><node class="a"/></hierarchy>"#).unwrap();
        let mut context = ctx(0, &[], true);
        context.is_expanded = true;
        context.is_selected = true;
        let line = row_line(
            &context,
            tree.root(),
            &TreeGlyphs::ascii(),
            &InspectorStyle::default(),
        );
        assert_eq!(plain(&line), ">> v hierarchy");
    }

    #[test]
    fn guides_follow_tail_stack() {
        let tree = parse(r#"<hierarchy><node class="a"><node class="b"/></node><node class="c"/></hierarchy>"#)
            .unwrap();
        let style = InspectorStyle {
            highlight_symbol: "",
            ..InspectorStyle::default()
        };
        let line = row_line(
            &ctx(2, &[false, true], false),
            tree.node(NodeId(2)),
            &TreeGlyphs::ascii(),
            &style,
        );
        assert_eq!(plain(&line), "|  `--* b");

        let mut flat = ctx(2, &[false, true], false);
        flat.draw_lines = false;
        let line = row_line(&flat, tree.node(NodeId(2)), &TreeGlyphs::ascii(), &style);
        assert_eq!(plain(&line), "      * b");
    }
}
