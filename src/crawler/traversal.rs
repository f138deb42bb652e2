//! Recursive hierarchy descent
//!
//! The descent is written once and is generic over a [`Traversal`] strategy. A
//! strategy answers two questions: what are the roots, and what are the children
//! of a given path. It also decides whether siblings may be explored concurrently
//! by handing out independent contexts from [`Traversal::branch`].

use crate::hierarchy::{Level, Node, NodePath};
use crate::output::Aggregator;
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};

/// Result of asking a portal for the children of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// The request succeeded. `nodes` may be empty: either the parent truly has no
    /// children or the payload could not be parsed.
    Children { nodes: Vec<Node>, skipped: usize },

    /// The request failed on every attempt
    Unavailable,
}

impl Discovery {
    pub fn children(nodes: Vec<Node>) -> Self {
        Self::Children { nodes, skipped: 0 }
    }

    pub fn empty() -> Self {
        Self::children(Vec::new())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// A strategy for walking one portal's hierarchy
#[async_trait]
pub trait Traversal: Send + Sync {
    /// Per-branch mutable state threaded through the descent
    type Context: Send;

    /// Portal name, used in log lines
    fn name(&self) -> &str;

    /// Deepest level this strategy can reach
    fn deepest_level(&self) -> Level;

    /// Fetches the regions and the initial context
    async fn discover_roots(&self) -> (Discovery, Self::Context);

    /// Fetches the children of `parent`
    async fn discover_children(&self, ctx: &mut Self::Context, parent: &NodePath) -> Discovery;

    /// Returns an independent context for a concurrent sibling branch, or `None`
    /// if siblings must be visited one at a time through the same context
    fn branch(&self, ctx: &Self::Context) -> Option<Self::Context>;
}

/// Emits `children` under `parent` and descends into each of them
///
/// Siblings are explored concurrently when the strategy can branch its context
/// for every one of them, sequentially otherwise.
pub fn fan_out<'a, T>(
    traversal: &'a T,
    sink: &'a Aggregator,
    ctx: &'a mut T::Context,
    parent: &'a NodePath,
    children: Vec<Node>,
) -> BoxFuture<'a, ()>
where
    T: Traversal,
{
    Box::pin(async move {
        let paths: Vec<NodePath> = children.into_iter().map(|node| parent.child(node)).collect();
        for path in &paths {
            sink.emit(path);
        }

        let shared: &T::Context = ctx;
        let contexts: Option<Vec<T::Context>> =
            paths.iter().map(|_| traversal.branch(shared)).collect();

        match contexts {
            Some(contexts) => {
                join_all(paths.iter().zip(contexts).map(|(path, mut branch)| async move {
                    descend(traversal, sink, &mut branch, path).await
                }))
                .await;
            }
            None => {
                for path in &paths {
                    descend(traversal, sink, ctx, path).await;
                }
            }
        }
    })
}

/// Discovers the children of `path` and fans out into them
///
/// Stops at the strategy's deepest level. An empty or unavailable child list ends
/// only this branch.
pub fn descend<'a, T>(
    traversal: &'a T,
    sink: &'a Aggregator,
    ctx: &'a mut T::Context,
    path: &'a NodePath,
) -> BoxFuture<'a, ()>
where
    T: Traversal,
{
    Box::pin(async move {
        if path.level().is_some_and(|level| level >= traversal.deepest_level()) {
            return;
        }
        let Some(child_level) = path.child_level() else {
            return;
        };

        match traversal.discover_children(ctx, path).await {
            Discovery::Unavailable => {
                tracing::error!(
                    "{}: {} list unavailable for {}",
                    traversal.name(),
                    child_level,
                    path
                );
                sink.statistics().record_unavailable(child_level);
            }
            Discovery::Children { nodes, skipped } => {
                if skipped > 0 {
                    tracing::warn!(
                        "{}: skipped {} invalid {} id(s) under {}",
                        traversal.name(),
                        skipped,
                        child_level,
                        path
                    );
                    sink.statistics().record_skipped(skipped);
                }

                if nodes.is_empty() {
                    tracing::info!("{}: no {} entries under {}", traversal.name(), child_level, path);
                    sink.statistics().record_empty(child_level);
                    return;
                }

                tracing::debug!(
                    "{}: {} {} entries under {}",
                    traversal.name(),
                    nodes.len(),
                    child_level,
                    path
                );
                fan_out(traversal, sink, ctx, path, nodes).await;
            }
        }
    })
}
