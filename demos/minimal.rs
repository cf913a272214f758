// Minimal example: parse a small dump, filter it and render the tree into a buffer.
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::StatefulWidget;

use tui_uidump::prelude::*;

const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <node class="android.widget.FrameLayout" package="com.example" bounds="[0,0][1080,1920]">
    <node class="android.widget.TextView" text="Welcome" bounds="[40,100][1040,180]"/>
    <node class="android.widget.EditText" resource-id="com.example:id/user" bounds="[40,220][1040,300]"/>
    <node class="android.widget.Button" text="Login" clickable="true" bounds="[40,340][1040,420]"/>
  </node>
</hierarchy>"#;

fn main() -> Result<(), ParseError> {
    let tree = parse(DUMP)?;

    // State holds selection/expansion and must live across frames.
    let config = InspectorConfig::default();
    let mut state = InspectorState::new(&config);
    state.reset();
    state.expand_all(&tree);

    // Nodes mentioning "login", shown with the path leading to them.
    let criteria = FilterCriteria::new().search(SearchQuery::new("login"));
    let filter_config = TreeFilterConfig::tree();

    let area = Rect::new(0, 0, 60, 10);
    let mut buffer = Buffer::empty(area);
    HierarchyView::new(&tree, InspectorStyle::default())
        .with_filter(criteria, filter_config)
        .render(area, &mut buffer, &mut state);

    for y in area.top()..area.bottom() {
        let line: String = (area.left()..area.right())
            .map(|x| buffer[(x, y)].symbol())
            .collect();
        println!("{}", line.trim_end());
    }

    state.select_last();
    if let Some(id) = state.selected_id() {
        print!("{}", tree.node(id).details());
    }
    Ok(())
}
