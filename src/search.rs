use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::node::Node;

/// Text query matched against a node's text and content description.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub text: String,
    /// Require the whole field to equal the query instead of containing it.
    pub exact: bool,
    pub case_sensitive: bool,
}

impl SearchQuery {
    /// Case-insensitive substring query.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exact: false,
            case_sensitive: false,
        }
    }

    #[must_use]
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    #[must_use]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// An empty query means "no active search", not "match everything".
    pub fn is_active(&self) -> bool {
        !self.text.is_empty()
    }

    /// Prepares the query for repeated matching.
    pub fn matcher(&self) -> Matcher<'_> {
        let needle = if self.case_sensitive {
            Cow::Borrowed(self.text.as_str())
        } else {
            Cow::Owned(self.text.to_lowercase())
        };
        Matcher {
            needle,
            exact: self.exact,
            case_sensitive: self.case_sensitive,
        }
    }

    /// Returns `true` if the node's text or content description matches.
    ///
    /// Inactive queries match nothing.
    pub fn matches(&self, node: &Node) -> bool {
        self.is_active() && self.matcher().matches(node)
    }
}

/// A [`SearchQuery`] with its needle normalised once.
#[derive(Clone, Debug)]
pub struct Matcher<'a> {
    needle: Cow<'a, str>,
    exact: bool,
    case_sensitive: bool,
}

impl Matcher<'_> {
    pub fn matches(&self, node: &Node) -> bool {
        self.matches_field(node.text()) || self.matches_field(node.content_desc())
    }

    fn matches_field(&self, field: &str) -> bool {
        if field.is_empty() {
            return false;
        }
        let field = if self.case_sensitive {
            Cow::Borrowed(field)
        } else {
            Cow::Owned(field.to_lowercase())
        };
        if self.exact {
            field == self.needle
        } else {
            field.contains(self.needle.as_ref())
        }
    }
}

/// Returns the nodes matching `query`, in input order.
///
/// An inactive (empty) query yields no results. The input is only read.
pub fn search<'a>(nodes: impl IntoIterator<Item = &'a Node>, query: &SearchQuery) -> Vec<&'a Node> {
    if !query.is_active() {
        return Vec::new();
    }
    let matcher = query.matcher();
    let found: Vec<&Node> = nodes.into_iter().filter(|node| matcher.matches(node)).collect();
    debug!(query = %query.text, matches = found.len(), "search finished");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const DUMP: &str = r#"<hierarchy>
        <node class="A" text="Login" clickable="true" bounds="[0,0][100,50]">
            <node class="B" text="" content-desc="login help" bounds="[10,10][90,40]"/>
        </node>
        <node class="C" text="Sign up"/>
    </hierarchy>"#;

    fn classes<'a>(nodes: &[&'a Node]) -> Vec<&'a str> {
        nodes.iter().map(|n| n.class_name()).collect()
    }

    #[test]
    fn substring_search_is_case_insensitive_by_default() {
        let tree = parse(DUMP).unwrap();
        let found = search(&tree, &SearchQuery::new("login"));
        assert_eq!(classes(&found), vec!["A", "B"]);
    }

    #[test]
    fn exact_and_case_sensitive_modes() {
        let tree = parse(DUMP).unwrap();
        let exact = SearchQuery::new("login").exact(true);
        assert_eq!(classes(&search(&tree, &exact)), vec!["A"]);

        let cased = SearchQuery::new("Login").case_sensitive(true);
        assert_eq!(classes(&search(&tree, &cased)), vec!["A"]);

        let both = SearchQuery::new("login help").exact(true).case_sensitive(true);
        assert_eq!(classes(&search(&tree, &both)), vec!["B"]);

        let miss = SearchQuery::new("LOGIN").case_sensitive(true);
        assert!(search(&tree, &miss).is_empty());
    }

    #[test]
    fn empty_query_matches_nothing() {
        let tree = parse(DUMP).unwrap();
        let query = SearchQuery::default();
        assert!(!query.is_active());
        assert!(search(&tree, &query).is_empty());
        assert!(!query.matches(tree.root()));
    }

    #[test]
    fn search_is_idempotent_and_ordered() {
        let tree = parse(DUMP).unwrap();
        let query = SearchQuery::new("i");
        let first = search(&tree, &query);
        let second = search(&tree, &query);
        assert_eq!(classes(&first), classes(&second));
        assert_eq!(classes(&first), vec!["A", "B", "C"]);

        let refined = search(first.iter().copied(), &SearchQuery::new("sign"));
        assert_eq!(classes(&refined), vec!["C"]);
    }
}
