use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::InvertedBounds;

/// Identifier of a node within one parsed hierarchy.
///
/// Ids are pre-order positions: the root is `NodeId(0)` and parsing the same
/// dump twice yields the same ids. Ids are not comparable across dumps.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The id of the root node of every hierarchy.
    pub const ROOT: Self = Self(0);

    /// Returns the pre-order index of this node.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index).unwrap_or_else(|_| panic!("node index {index} overflows u32"));
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Screen-space rectangle `[left,top][right,bottom]` in pixels.
///
/// Constructed values always satisfy `left <= right` and `top <= bottom`.
/// With `serde` the rectangle is stored as `[left, top, right, bottom]` and
/// checked again when read back.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "[u32; 4]", into = "[u32; 4]"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl Bounds {
    /// Creates a rectangle, or `None` if the corners are inverted.
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Option<Self> {
        if left > right || top > bottom {
            return None;
        }
        Some(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub const fn left(&self) -> u32 {
        self.left
    }

    pub const fn top(&self) -> u32 {
        self.top
    }

    pub const fn right(&self) -> u32 {
        self.right
    }

    pub const fn bottom(&self) -> u32 {
        self.bottom
    }

    pub const fn width(&self) -> u32 {
        self.right - self.left
    }

    pub const fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Returns the area in square pixels.
    pub const fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Returns `true` if the rectangle has no area.
    pub const fn is_empty(&self) -> bool {
        self.left == self.right || self.top == self.bottom
    }

    /// Returns the center point, rounded toward the top-left.
    pub const fn center(&self) -> (u32, u32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    /// Half-open point test: the right and bottom edges are outside.
    pub const fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Returns `true` if `other` lies entirely within this rectangle.
    pub const fn contains(&self, other: &Self) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }
}

impl TryFrom<[u32; 4]> for Bounds {
    type Error = InvertedBounds;

    fn try_from([left, top, right, bottom]: [u32; 4]) -> Result<Self, Self::Error> {
        Self::new(left, top, right, bottom).ok_or(InvertedBounds {
            left,
            top,
            right,
            bottom,
        })
    }
}

impl From<Bounds> for [u32; 4] {
    fn from(bounds: Bounds) -> Self {
        [bounds.left, bounds.top, bounds.right, bounds.bottom]
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Capability flags carried by a dump node. Missing attributes are `false`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools, reason = "mirrors the closed dump attribute set")]
pub struct NodeFlags {
    pub checkable: bool,
    pub checked: bool,
    pub clickable: bool,
    pub enabled: bool,
    pub focusable: bool,
    pub focused: bool,
    pub scrollable: bool,
    pub long_clickable: bool,
    pub password: bool,
    pub selected: bool,
}

/// String attributes of a dump node. Missing attributes are empty.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeAttrs {
    pub text: String,
    pub content_desc: String,
    pub class_name: String,
    pub package_name: String,
    pub resource_id: String,
}

/// Everything a node carries apart from its position in the tree.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeData {
    pub attrs: NodeAttrs,
    pub flags: NodeFlags,
    pub bounds: Bounds,
    /// Set when the dump marks the node as not accessibility-friendly.
    pub naf: bool,
}

/// One widget of a parsed hierarchy.
///
/// Nodes are only produced by [`crate::HierarchyBuilder::build`] and never
/// change afterwards. `parent` is a plain id, not an owning link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: u32,
    pub(crate) sibling_index: u32,
    pub(crate) data: NodeData,
}

impl Node {
    #[inline]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// 0-based position among the parent's children.
    #[inline]
    pub const fn sibling_index(&self) -> u32 {
        self.sibling_index
    }

    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub const fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub const fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn text(&self) -> &str {
        &self.data.attrs.text
    }

    pub fn content_desc(&self) -> &str {
        &self.data.attrs.content_desc
    }

    pub fn class_name(&self) -> &str {
        &self.data.attrs.class_name
    }

    pub fn package_name(&self) -> &str {
        &self.data.attrs.package_name
    }

    pub fn resource_id(&self) -> &str {
        &self.data.attrs.resource_id
    }

    pub const fn flags(&self) -> NodeFlags {
        self.data.flags
    }

    pub const fn clickable(&self) -> bool {
        self.data.flags.clickable
    }

    pub const fn enabled(&self) -> bool {
        self.data.flags.enabled
    }

    pub const fn bounds(&self) -> Bounds {
        self.data.bounds
    }

    pub const fn is_naf(&self) -> bool {
        self.data.naf
    }

    /// Returns `true` if the class name looks like a text input widget.
    pub fn is_input(&self) -> bool {
        let class = self.class_name();
        class.contains("EditText") || class.contains("Input")
    }

    /// Returns `true` if the node has a non-empty text or content description.
    pub fn has_text(&self) -> bool {
        !self.text().is_empty() || !self.content_desc().is_empty()
    }

    /// Returns `true` for nodes worth showing in a condensed element list:
    /// labelled, clickable, or text inputs.
    pub fn is_interesting(&self) -> bool {
        self.has_text() || self.clickable() || self.is_input()
    }

    /// Short class name without the package prefix (`android.widget.Button` -> `Button`).
    pub fn short_class(&self) -> &str {
        let class = self.class_name();
        class.rsplit('.').next().unwrap_or(class)
    }

    /// Multi-line human readable description of the node.
    pub const fn details(&self) -> NodeDetails<'_> {
        NodeDetails(self)
    }
}

/// [`fmt::Display`] adapter returned by [`Node::details`].
#[derive(Clone, Copy, Debug)]
pub struct NodeDetails<'a>(&'a Node);

impl fmt::Display for NodeDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0;
        // Two spaces per tree level.
        let pad = node.depth as usize * 2;
        writeln!(f, "{:pad$}[{}] {}", "", node.sibling_index, node.class_name())?;
        if !node.text().is_empty() {
            writeln!(f, "{:pad$}  text: {:?}", "", node.text())?;
        }
        if !node.content_desc().is_empty() {
            writeln!(f, "{:pad$}  desc: {:?}", "", node.content_desc())?;
        }
        if !node.resource_id().is_empty() {
            writeln!(f, "{:pad$}  id: {}", "", node.resource_id())?;
        }
        writeln!(f, "{:pad$}  clickable: {}", "", node.clickable())?;
        write!(f, "{:pad$}  bounds: {}", "", node.bounds())
    }
}
