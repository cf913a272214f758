use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FilterValidationError;
use crate::hierarchy::Hierarchy;
use crate::model::TreeFilter;
use crate::node::{Node, NodeId};
use crate::search::{SearchQuery, search};

/// Inclusive depth window. Bounds are signed so that bad user input can be
/// represented and rejected by [`FilterCriteria::validate`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthRange {
    pub min: i64,
    pub max: i64,
}

impl DepthRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub const fn contains(&self, depth: u32) -> bool {
        let depth = depth as i64;
        depth >= self.min && depth <= self.max
    }
}

/// Independent predicates over nodes.
///
/// Every enabled dimension must hold (AND). Inside a substring set a node
/// passes if it contains any member (OR). The default value has no active
/// predicate and matches every node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools, reason = "one toggle per filter dimension")]
pub struct FilterCriteria {
    pub search: SearchQuery,
    pub clickable_only: bool,
    /// Text inputs only (class contains `EditText` or `Input`).
    pub input_only: bool,
    /// Nodes with a non-empty text or content description only.
    pub has_text_only: bool,
    pub enabled_only: bool,
    /// Labelled, clickable or input nodes only.
    pub interesting_only: bool,
    pub class_names: BTreeSet<String>,
    pub resource_ids: BTreeSet<String>,
    pub package_names: BTreeSet<String>,
    pub depth: Option<DepthRange>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(mut self, query: SearchQuery) -> Self {
        self.search = query;
        self
    }

    #[must_use]
    pub fn clickable_only(mut self, on: bool) -> Self {
        self.clickable_only = on;
        self
    }

    #[must_use]
    pub fn input_only(mut self, on: bool) -> Self {
        self.input_only = on;
        self
    }

    #[must_use]
    pub fn has_text_only(mut self, on: bool) -> Self {
        self.has_text_only = on;
        self
    }

    #[must_use]
    pub fn enabled_only(mut self, on: bool) -> Self {
        self.enabled_only = on;
        self
    }

    #[must_use]
    pub fn interesting_only(mut self, on: bool) -> Self {
        self.interesting_only = on;
        self
    }

    #[must_use]
    pub fn class_contains(mut self, needle: impl Into<String>) -> Self {
        self.class_names.insert(needle.into());
        self
    }

    #[must_use]
    pub fn resource_contains(mut self, needle: impl Into<String>) -> Self {
        self.resource_ids.insert(needle.into());
        self
    }

    #[must_use]
    pub fn package_contains(mut self, needle: impl Into<String>) -> Self {
        self.package_names.insert(needle.into());
        self
    }

    #[must_use]
    pub fn depth_range(mut self, min: i64, max: i64) -> Self {
        self.depth = Some(DepthRange::new(min, max));
        self
    }

    /// Returns `true` if no predicate is enabled.
    pub fn is_unconstrained(&self) -> bool {
        !self.search.is_active()
            && !self.clickable_only
            && !self.input_only
            && !self.has_text_only
            && !self.enabled_only
            && !self.interesting_only
            && self.class_names.is_empty()
            && self.resource_ids.is_empty()
            && self.package_names.is_empty()
            && self.depth.is_none()
    }

    /// Checks the configuration before it is evaluated.
    pub const fn validate(&self) -> Result<(), FilterValidationError> {
        let Some(range) = self.depth else {
            return Ok(());
        };
        if range.min < 0 {
            return Err(FilterValidationError::NegativeDepth(range.min));
        }
        if range.max < 0 {
            return Err(FilterValidationError::NegativeDepth(range.max));
        }
        if range.min > range.max {
            return Err(FilterValidationError::InvertedDepthRange {
                min: range.min,
                max: range.max,
            });
        }
        Ok(())
    }

    /// Returns `true` if the node satisfies every enabled predicate.
    pub fn matches(&self, node: &Node) -> bool {
        if self.clickable_only && !node.clickable() {
            return false;
        }
        if self.enabled_only && !node.enabled() {
            return false;
        }
        if self.input_only && !node.is_input() {
            return false;
        }
        if self.has_text_only && !node.has_text() {
            return false;
        }
        if self.interesting_only && !node.is_interesting() {
            return false;
        }
        if self.depth.is_some_and(|range| !range.contains(node.depth())) {
            return false;
        }
        if !contains_any(&self.class_names, node.class_name())
            || !contains_any(&self.resource_ids, node.resource_id())
            || !contains_any(&self.package_names, node.package_name())
        {
            return false;
        }
        !self.search.is_active() || self.search.matches(node)
    }
}

// An empty set does not constrain the dimension.
fn contains_any(needles: &BTreeSet<String>, haystack: &str) -> bool {
    needles.is_empty() || needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

impl TreeFilter<Hierarchy> for FilterCriteria {
    fn is_match(&self, model: &Hierarchy, id: NodeId) -> bool {
        self.matches(model.node(id))
    }
}

/// Shorthand for [`FilterCriteria::matches`].
pub fn matches(node: &Node, criteria: &FilterCriteria) -> bool {
    criteria.matches(node)
}

/// Keeps the nodes for which `criteria` holds, in input order.
///
/// Invalid criteria are not rejected here; call
/// [`FilterCriteria::validate`] first.
pub fn filter<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    criteria: &FilterCriteria,
) -> Vec<&'a Node> {
    let kept: Vec<&Node> = nodes
        .into_iter()
        .filter(|node| criteria.matches(node))
        .collect();
    debug!(kept = kept.len(), "filter applied");
    kept
}

/// Filters first, then searches within the filtered subset.
pub fn filter_then_search<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    criteria: &FilterCriteria,
    query: &SearchQuery,
) -> Vec<&'a Node> {
    search(filter(nodes, criteria), query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{Expansion, flatten, flatten_filtered};
    use crate::parser::parse;

    const LOGIN: &str = r#"<hierarchy><node class="A" text="Login" clickable="true" bounds="[0,0][100,50]"><node class="B" text="" clickable="false" bounds="[10,10][90,40]"/></node></hierarchy>"#;

    const FORM: &str = r#"<hierarchy>
        <node class="android.widget.LinearLayout" package="com.app" enabled="true">
            <node class="android.widget.EditText" resource-id="com.app:id/user" package="com.app" clickable="true" enabled="true"/>
            <node class="android.widget.Button" resource-id="com.app:id/ok" package="com.app" text="OK" clickable="true" enabled="false"/>
            <node class="android.widget.TextView" resource-id="com.app:id/title" package="com.app" text="Welcome" enabled="true"/>
            <node class="android.view.View" package="com.other" content-desc="Ad"/>
        </node>
    </hierarchy>"#;

    fn classes(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.short_class().to_string()).collect()
    }

    fn ids(nodes: &[&Node]) -> Vec<NodeId> {
        nodes.iter().map(|n| n.id()).collect()
    }

    #[test]
    fn clickable_filter_on_login_dump() {
        let tree = parse(LOGIN).unwrap();
        let view = flatten(&tree, Expansion::All);
        let kept = filter(view.nodes(&tree), &FilterCriteria::new().clickable_only(true));
        assert_eq!(ids(&kept), vec![NodeId(1)]);

        let found = search(view.nodes(&tree), &SearchQuery::new("login"));
        assert_eq!(ids(&found), vec![NodeId(1)]);
    }

    #[test]
    fn unconstrained_criteria_match_everything() {
        let tree = parse(FORM).unwrap();
        let criteria = FilterCriteria::default();
        assert!(criteria.is_unconstrained());
        assert_eq!(filter(&tree, &criteria).len(), tree.len());
    }

    #[test]
    fn single_dimensions() {
        let tree = parse(FORM).unwrap();
        let input = FilterCriteria::new().input_only(true);
        assert_eq!(classes(&filter(&tree, &input)), vec!["EditText"]);

        let text = FilterCriteria::new().has_text_only(true);
        assert_eq!(classes(&filter(&tree, &text)), vec!["Button", "TextView", "View"]);

        let enabled = FilterCriteria::new().enabled_only(true);
        assert_eq!(
            classes(&filter(&tree, &enabled)),
            vec!["LinearLayout", "EditText", "TextView"]
        );

        let interesting = FilterCriteria::new().interesting_only(true);
        assert_eq!(
            classes(&filter(&tree, &interesting)),
            vec!["EditText", "Button", "TextView", "View"]
        );

        let depth = FilterCriteria::new().depth_range(1, 1);
        assert_eq!(classes(&filter(&tree, &depth)), vec!["LinearLayout"]);
    }

    #[test]
    fn substring_sets_are_or_within_and_across() {
        let tree = parse(FORM).unwrap();
        let classes_or = FilterCriteria::new()
            .class_contains("Button")
            .class_contains("TextView");
        assert_eq!(classes(&filter(&tree, &classes_or)), vec!["Button", "TextView"]);

        let with_resource = classes_or.clone().resource_contains("title");
        assert_eq!(classes(&filter(&tree, &with_resource)), vec!["TextView"]);

        let package = FilterCriteria::new().package_contains("other");
        assert_eq!(classes(&filter(&tree, &package)), vec!["View"]);
    }

    #[test]
    fn combined_dimensions_equal_intersection() {
        let tree = parse(FORM).unwrap();
        let clickable = FilterCriteria::new().clickable_only(true);
        let enabled = FilterCriteria::new().enabled_only(true);
        let both = FilterCriteria::new().clickable_only(true).enabled_only(true);

        let left = ids(&filter(&tree, &clickable));
        let right = ids(&filter(&tree, &enabled));
        let intersection: Vec<_> = left.into_iter().filter(|id| right.contains(id)).collect();
        assert_eq!(ids(&filter(&tree, &both)), intersection);
    }

    #[test]
    fn filter_is_idempotent() {
        let tree = parse(FORM).unwrap();
        let criteria = FilterCriteria::new().has_text_only(true).package_contains("com.app");
        let once = filter(&tree, &criteria);
        let twice = filter(once.iter().copied(), &criteria);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn search_dimension_and_composition() {
        let tree = parse(FORM).unwrap();
        let criteria = FilterCriteria::new().search(SearchQuery::new("o"));
        assert_eq!(classes(&filter(&tree, &criteria)), vec!["Button", "TextView"]);

        let clickable = FilterCriteria::new().clickable_only(true);
        let found = filter_then_search(&tree, &clickable, &SearchQuery::new("ok"));
        assert_eq!(classes(&found), vec!["Button"]);
        assert!(matches(found[0], &clickable));
    }

    #[test]
    fn validation_rejects_bad_depth_ranges() {
        assert_eq!(FilterCriteria::new().validate(), Ok(()));
        assert_eq!(FilterCriteria::new().depth_range(0, 3).validate(), Ok(()));
        assert_eq!(
            FilterCriteria::new().depth_range(4, 2).validate(),
            Err(FilterValidationError::InvertedDepthRange { min: 4, max: 2 })
        );
        assert_eq!(
            FilterCriteria::new().depth_range(-1, 2).validate(),
            Err(FilterValidationError::NegativeDepth(-1))
        );
        assert_eq!(
            FilterCriteria::new().depth_range(0, -2).validate(),
            Err(FilterValidationError::NegativeDepth(-2))
        );
    }

    #[test]
    fn criteria_compare_structurally() {
        let a = FilterCriteria::new().class_contains("A").class_contains("B");
        let b = FilterCriteria::new().class_contains("B").class_contains("A");
        assert_eq!(a, b);
        assert_ne!(a, b.clickable_only(true));
    }

    #[test]
    fn criteria_drive_filtered_tree_view() {
        let tree = parse(FORM).unwrap();
        let criteria = FilterCriteria::new().input_only(true);
        let view = flatten_filtered(&tree, &criteria, Expansion::All, true);
        let ids: Vec<_> = view.ids().map(NodeId::index).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
