//! Nodes, selection paths and output rows

use crate::hierarchy::Level;
use std::fmt;

/// A single discovered entry: its code among siblings and its display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub code: String,
    pub label: String,
}

impl Node {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }

    /// Coerces the code to a numeric identifier
    ///
    /// Returns a node whose code is the normalized number (`"013"` becomes `"13"`),
    /// or `None` if the code is not a non-negative integer.
    pub fn coerce_numeric(&self) -> Option<Node> {
        let id: u64 = self.code.trim().parse().ok()?;
        Some(Node::new(id.to_string(), self.label.clone()))
    }
}

/// The selection path from the root of the tree to a node
///
/// Codes are only unique among siblings, so the path is the full identity of a
/// node. The empty path is the root, above the regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    nodes: Vec<Node>,
}

impl NodePath {
    /// The empty path above all regions
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from nodes ordered from the region down
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Level of the last node, or `None` for the root
    pub fn level(&self) -> Option<Level> {
        self.nodes.len().checked_sub(1).and_then(Level::from_depth)
    }

    /// Level of the children of this path's leaf
    pub fn child_level(&self) -> Option<Level> {
        match self.level() {
            Some(level) => level.child(),
            None => Some(Level::Region),
        }
    }

    /// Extends the path by one child
    pub fn child(&self, node: Node) -> NodePath {
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        Self { nodes }
    }

    /// The last node on the path
    pub fn leaf(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// Node selected at the given level, if the path reaches that deep
    pub fn node_at(&self, level: Level) -> Option<&Node> {
        self.nodes.get(level.depth())
    }

    /// Code selected at the given level
    pub fn code_at(&self, level: Level) -> Option<&str> {
        self.node_at(level).map(|node| node.code.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return write!(f, "<root>");
        }
        for (depth, node) in self.nodes.iter().enumerate() {
            if depth > 0 {
                write!(f, " / ")?;
            }
            let level = Level::from_depth(depth).map(|l| l.as_str()).unwrap_or("?");
            write!(f, "{}={}", level, node.code)?;
        }
        Ok(())
    }
}

/// One output row, shaped by the level's fixed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub level: Level,
    pub fields: Vec<String>,
}

impl Row {
    /// Builds the row describing the leaf of `path`
    ///
    /// Returns `None` for the root path.
    pub fn from_path(path: &NodePath) -> Option<Row> {
        let level = path.level()?;
        let leaf = path.leaf()?;
        let code_at = |level: Level| path.code_at(level).unwrap_or_default().to_string();

        let fields = match level {
            Level::Region => vec![leaf.code.clone(), leaf.label.clone()],
            Level::SubRegion => vec![code_at(Level::Region), leaf.code.clone(), leaf.label.clone()],
            Level::Locality => vec![
                code_at(Level::SubRegion),
                leaf.code.clone(),
                leaf.label.clone(),
            ],
            Level::Parcel => vec![
                code_at(Level::Locality),
                leaf.code.clone(),
                leaf.label.clone(),
            ],
            Level::Record => vec![
                code_at(Level::Locality),
                code_at(Level::Parcel),
                leaf.code.clone(),
                leaf.label.clone(),
            ],
        };

        Some(Row { level, fields })
    }
}
