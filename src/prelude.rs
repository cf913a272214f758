pub use crate::{
    FilterCriteria, FilterLayout, Hierarchy, HierarchyView, InspectorConfig, InspectorState,
    InspectorStyle, Node, NodeId, ParseError, SearchQuery, TreeAction, TreeEvent, TreeFilter,
    TreeFilterConfig, TreeGlyphs, TreeModel, TreeScrollPolicy, parse,
};
