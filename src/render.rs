//! Block tree → Markdown.
use futures::future::BoxFuture;
use reqwest::Url;
use tracing::{error, warn};

use crate::image::{AssetDir, ImageFetcher};
use crate::model::{Block, BlockKind, Media};

const DEFAULT_CALLOUT_ICON: &str = "💡";
const DEFAULT_TOGGLE_LABEL: &str = "Click to reveal";
const DEFAULT_IMAGE_CAPTION: &str = "Image";

pub struct Renderer<'a> {
    images: &'a dyn ImageFetcher,
    assets: &'a AssetDir,
}

impl<'a> Renderer<'a> {
    pub fn new(images: &'a dyn ImageFetcher, assets: &'a AssetDir) -> Self {
        Self { images, assets }
    }

    /// Render `blocks` in order, one fragment per block, separated by a blank line.
    pub fn render<'b>(&'b self, blocks: &'b [Block]) -> BoxFuture<'b, String> {
        Box::pin(async move {
            let mut fragments = Vec::with_capacity(blocks.len());
            for block in blocks {
                if let Some(fragment) = self.render_block(block).await {
                    fragments.push(fragment);
                }
            }
            fragments.join("\n\n")
        })
    }

    async fn render_block(&self, block: &Block) -> Option<String> {
        if !block.children.is_empty() && !block.kind.renders_children() {
            warn!(
                block_id = %block.id,
                block_type = block.kind.tag(),
                dropped = block.children.len(),
                "nested blocks under this block are not rendered"
            );
        }
        match &block.kind {
            BlockKind::Paragraph(text) => Some(text.clone()),
            BlockKind::Heading { level, text } => {
                Some(format!("{} {}", "#".repeat(usize::from(*level)), text))
            }
            BlockKind::BulletedListItem(text) => Some(format!("- {}", text)),
            BlockKind::NumberedListItem(text) => Some(format!("1. {}", text)),
            BlockKind::Quote(text) => Some(format!("> {}", text)),
            BlockKind::Divider => Some("---".to_string()),
            BlockKind::Callout { icon, text } => Some(format!(
                "> {} **{}**",
                icon.as_deref().unwrap_or(DEFAULT_CALLOUT_ICON),
                text
            )),
            BlockKind::Toggle(text) => {
                let label = if text.is_empty() {
                    DEFAULT_TOGGLE_LABEL
                } else {
                    text.as_str()
                };
                let inner = self.render(&block.children).await;
                Some(format!(
                    "<details>\n<summary>{}</summary>\n\n{}\n</details>",
                    label, inner
                ))
            }
            BlockKind::ColumnList => {
                let inner = self.render(&block.children).await;
                Some(format!("<div class=\"columns\">\n{}\n</div>", inner))
            }
            BlockKind::Column => {
                let inner = self.render(&block.children).await;
                Some(format!(
                    "<div class=\"column\" markdown=\"1\">\n\n{}\n\n</div>",
                    inner
                ))
            }
            BlockKind::Image(media) => self.render_image(&block.id, media).await,
            BlockKind::Video(media) => {
                let url = media.external_url.as_deref().or(media.file_url.as_deref())?;
                match youtube_id(url) {
                    Some(id) => Some(youtube_embed(&id)),
                    None => {
                        warn!(block_id = %block.id, url, "skipping video from unrecognized source");
                        None
                    }
                }
            }
            BlockKind::Unsupported(tag) => {
                warn!(block_id = %block.id, block_type = %tag, "skipping unsupported block");
                None
            }
        }
    }

    async fn render_image(&self, block_id: &str, media: &Media) -> Option<String> {
        let url = media.file_url.as_deref().or(media.external_url.as_deref())?;
        let caption = if media.caption.is_empty() {
            DEFAULT_IMAGE_CAPTION
        } else {
            media.caption.as_str()
        };
        match self.assets.materialize(self.images, url, block_id).await {
            Ok(public) => Some(format!("![{}]({})", caption, public)),
            Err(err) => {
                error!(block_id, %err, "failed to download image");
                None
            }
        }
    }
}

/// The `v` query parameter of a youtube.com URL.
pub fn youtube_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host != "youtube.com" && !host.ends_with(".youtube.com") {
        return None;
    }
    parsed
        .query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn youtube_embed(id: &str) -> String {
    format!(
        "<iframe width=\"100%\" height=\"400\" src=\"https://www.youtube.com/embed/{}\" frameborder=\"0\" allowfullscreen></iframe>",
        id
    )
}
