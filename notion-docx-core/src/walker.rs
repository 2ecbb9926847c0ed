//! Depth-first traversal of a page's block tree.
//!
//! Children are fetched per container through the paginated listing call and
//! always land directly after their parent, before the parent's next
//! sibling, at depth+1. List items rely on this interleaving for indent
//! nesting; all other container types get the same treatment.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;

use crate::contract::{ContentSource, SourceError};
use crate::notion::Block;

/// Nesting depth past which the walker stops descending. The service does
/// not bound tree depth contractually.
pub const MAX_DEPTH: usize = 64;

/// A block annotated with its nesting depth.
#[derive(Debug, Clone)]
pub struct PlacedBlock {
    pub block: Block,
    pub depth: usize,
}

/// Walk the container's subtree and return all descendant blocks in
/// document order. A fetch failure propagates and aborts the walk of this
/// container only; the caller decides what that scope means.
pub async fn collect_blocks<S: ContentSource + ?Sized>(
    source: &S,
    container_id: &str,
) -> Result<Vec<PlacedBlock>, SourceError> {
    let mut out = Vec::new();
    walk(source, container_id.to_string(), 0, &mut out).await?;
    Ok(out)
}

fn walk<'a, S: ContentSource + ?Sized>(
    source: &'a S,
    container_id: String,
    depth: usize,
    out: &'a mut Vec<PlacedBlock>,
) -> BoxFuture<'a, Result<(), SourceError>> {
    async move {
        let children = source.list_block_children(&container_id).await?;
        for block in children {
            let descend = block.has_children;
            let child_container = block.id.clone();
            out.push(PlacedBlock { block, depth });
            if descend {
                if depth + 1 > MAX_DEPTH {
                    warn!(
                        block_id = %child_container,
                        depth,
                        "Block tree exceeds maximum depth, not descending further"
                    );
                    continue;
                }
                walk(source, child_container, depth + 1, out).await?;
            }
        }
        Ok(())
    }
    .boxed()
}
