//! One sync pass: query eligible pages and write each one out.
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::frontmatter::{build_front_matter, PageMeta};
use crate::image::{AssetDir, ImageFetcher};
use crate::notion::model::Page;
use crate::notion::{build_query_filter, build_status_update, NotionService};
use crate::render::Renderer;
use crate::tree::fetch_tree;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Pages whose document was written (or rendered, in dry-run mode).
    pub processed: usize,
    /// Pages skipped because their content could not be fetched or written.
    pub failed: usize,
    /// Written pages whose remote status could not be updated.
    pub status_update_failed: usize,
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub slug: String,
    pub path: PathBuf,
    /// Front matter and body as written (or as it would be, in dry-run mode).
    pub document: String,
    pub status_updated: bool,
}

pub struct Syncer<'a> {
    cfg: &'a Config,
    notion: &'a dyn NotionService,
    images: &'a dyn ImageFetcher,
    dry_run: bool,
}

impl<'a> Syncer<'a> {
    pub fn new(
        cfg: &'a Config,
        notion: &'a dyn NotionService,
        images: &'a dyn ImageFetcher,
    ) -> Self {
        Self {
            cfg,
            notion,
            images,
            dry_run: false,
        }
    }

    /// Render without touching the filesystem or the remote status.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one pass. Only a failed query or an unusable content root fails the
    /// whole pass; per-page failures are logged and counted.
    #[instrument(skip_all)]
    pub async fn run(&self) -> Result<SyncSummary> {
        let filter = build_query_filter(&self.cfg.query);
        let pages = self
            .notion
            .query_database(&self.cfg.notion.database_id, filter.as_ref())
            .await
            .context("failed to query Notion database")?;

        let mut summary = SyncSummary::default();
        if pages.is_empty() {
            info!("No pages matched the sync filter");
            return Ok(summary);
        }
        info!(count = pages.len(), "Found pages to sync");

        if !self.dry_run {
            tokio::fs::create_dir_all(&self.cfg.output.content_dir)
                .await
                .with_context(|| {
                    format!("failed to create content dir {}", self.cfg.output.content_dir)
                })?;
        }

        for page in &pages {
            match self.sync_page(page).await {
                Ok(outcome) => {
                    summary.processed += 1;
                    let wants_update = self.cfg.after_sync.status.is_some() && !self.dry_run;
                    if wants_update && !outcome.status_updated {
                        summary.status_update_failed += 1;
                    }
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(page_id = %page.id, error = ?err, "Skipping page");
                }
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            status_update_failed = summary.status_update_failed,
            "Sync completed"
        );
        Ok(summary)
    }

    /// The per-page pipeline. Errors returned here mean no document was written.
    #[instrument(skip_all, fields(page_id = %page.id))]
    pub async fn sync_page(&self, page: &Page) -> Result<PageOutcome> {
        let meta = PageMeta::extract(page, &self.cfg.properties, &self.cfg.front_matter);
        info!(title = %meta.title, slug = %meta.slug, "Syncing page");

        let assets = AssetDir::for_slug(
            &self.cfg.output.image_dir,
            &self.cfg.output.public_image_base,
            &meta.slug,
        );
        let images: &dyn ImageFetcher = if self.dry_run {
            &OfflineImages
        } else {
            assets
                .ensure()
                .await
                .with_context(|| format!("failed to create {}", assets.local.display()))?;
            self.images
        };

        let cover = match &meta.cover_url {
            Some(url) => match assets.materialize(images, url, "cover").await {
                Ok(public) => Some(public),
                Err(err) => {
                    warn!(
                        title = %meta.title,
                        %err,
                        "Cover image download failed; continuing without it"
                    );
                    None
                }
            },
            None => None,
        };

        let blocks = fetch_tree(self.notion, &page.id)
            .await
            .with_context(|| format!("failed to fetch content of \"{}\"", meta.title))?;

        let body = Renderer::new(images, &assets).render(&blocks).await;
        let header = build_front_matter(
            &meta,
            self.cfg.front_matter.layout.as_deref(),
            cover.as_deref(),
        );
        let document = format!("{}\n\n{}", header, body);

        let path = Path::new(&self.cfg.output.content_dir).join(format!("{}.md", meta.slug));
        if self.dry_run {
            info!(path = %path.display(), bytes = document.len(), "Dry run; not writing");
            return Ok(PageOutcome {
                slug: meta.slug,
                path,
                document,
                status_updated: false,
            });
        }

        write_atomic(&path, document.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(title = %meta.title, path = %path.display(), "Synced page");

        let status_updated = self.mark_synced(page, &meta.title).await;
        Ok(PageOutcome {
            slug: meta.slug,
            path,
            document,
            status_updated,
        })
    }

    async fn mark_synced(&self, page: &Page, title: &str) -> bool {
        let Some(update) = &self.cfg.after_sync.status else {
            return false;
        };
        let properties = build_status_update(update);
        match self.notion.update_page(&page.id, &properties).await {
            Ok(()) => {
                info!(title, status = %update.value, "Updated page status");
                true
            }
            Err(err) => {
                warn!(title, page_id = %page.id, error = ?err, "Failed to update page status");
                false
            }
        }
    }
}

/// Write through a temp file in the target's directory so readers never see a
/// partial document. The temp file is removed on any failure.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let target = path.to_path_buf();
    let contents = contents.to_vec();
    tokio::task::spawn_blocking(move || {
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&contents)?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

/// Image fetcher used in dry-run mode: reports success without downloading.
struct OfflineImages;

#[async_trait::async_trait]
impl ImageFetcher for OfflineImages {
    async fn fetch(&self, _url: &str, _dest: &Path) -> Result<(), crate::image::FetchError> {
        Ok(())
    }
}
