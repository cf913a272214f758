//! Parse, search, filter and browse UI accessibility hierarchy dumps
//! (uiautomator-style XML) with a virtualized Ratatui tree view.
//!
//! The pipeline: [`parse`] a dump into a [`Hierarchy`], narrow it with
//! [`search`] or [`FilterCriteria`], [`flatten`] it into display rows and
//! render only the rows of the [`VirtualWindow`], memoized in a
//! [`RenderCache`]. [`QueryWorker`] runs parsing and queries off the UI thread.
//!
//! Feature flags:
//! - `serde`: serde support for [`InspectorConfig`], [`InspectorSnapshot`]
//!   and the node value types.

mod action;
mod cache;
mod config;
mod context;
mod error;
mod filter;
mod flatten;
mod glyphs;
mod hierarchy;
mod model;
mod node;
mod parser;
pub mod prelude;
mod search;
mod state;
mod style;
mod widget;
mod window;
mod worker;

pub use action::{TreeAction, TreeEvent};
pub use cache::{RenderCache, RowKey};
pub use config::InspectorConfig;
pub use context::RowContext;
pub use error::{FilterValidationError, InvertedBounds, ParseError};
pub use filter::{DepthRange, FilterCriteria, filter, filter_then_search, matches};
pub use flatten::{Expansion, FlatRow, FlattenedView, flatten, flatten_filtered};
pub use glyphs::{TreeGlyphs, row_line};
pub use hierarchy::{Ancestors, Hierarchy, HierarchyBuilder, SlotId};
pub use model::{FilterLayout, NoFilter, TreeFilter, TreeFilterConfig, TreeModel};
pub use node::{Bounds, Node, NodeAttrs, NodeData, NodeDetails, NodeFlags, NodeId};
pub use parser::parse;
pub use search::{Matcher, SearchQuery, search};
pub use state::{InspectorSnapshot, InspectorState};
pub use style::{InspectorStyle, TreeScrollPolicy};
pub use widget::HierarchyView;
pub use window::{VirtualWindow, VisibleRange, visible_range};
pub use worker::{Completed, Debouncer, Job, JobOutput, QueryWorker};
