//! Materializes a page's full block tree.
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tracing::debug;

use crate::model::Block;
use crate::notion::model::RawBlock;
use crate::notion::NotionService;

/// Every direct child of `block_id`, following cursors until the API reports
/// no more pages.
pub async fn fetch_children(notion: &dyn NotionService, block_id: &str) -> Result<Vec<RawBlock>> {
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = notion.list_children(block_id, cursor.as_deref()).await?;
        debug!(
            block_id,
            count = page.results.len(),
            has_more = page.has_more,
            "fetched children page"
        );
        out.extend(page.results);
        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => break,
        }
    }
    Ok(out)
}

/// Fetch the block tree under `block_id`, depth-first. A block's children are
/// attached before its next sibling is visited.
pub fn fetch_tree<'a>(
    notion: &'a dyn NotionService,
    block_id: &'a str,
) -> BoxFuture<'a, Result<Vec<Block>>> {
    Box::pin(async move {
        let raw = fetch_children(notion, block_id).await?;
        let mut blocks = Vec::with_capacity(raw.len());
        for r in raw {
            let children = if r.has_children {
                fetch_tree(notion, &r.id).await.with_context(|| {
                    format!("failed to fetch children of {} block {}", r.typ, r.id)
                })?
            } else {
                Vec::new()
            };
            blocks.push(Block::from_raw(&r, children));
        }
        Ok(blocks)
    })
}
