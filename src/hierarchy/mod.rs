//! Hierarchy model for harvested land-record data
//!
//! This module provides the types that describe where a discovered entry sits in
//! the administrative tree.
//!
//! # Components
//!
//! - `Level`: The five tree levels (region, sub-region, locality, parcel, record)
//! - `Node`: One discovered entry (code and label)
//! - `NodePath`: The selection path from the root to a node; a node's full identity
//! - `Row`: The output row for the leaf of a path

mod level;
mod path;

// Re-export main types
pub use level::Level;
pub use path::{Node, NodePath, Row};
