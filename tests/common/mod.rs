#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use notion_md_sync::image::{FetchError, ImageFetcher};
use notion_md_sync::notion::model::{BlockChildren, Page, RawBlock};
use notion_md_sync::notion::NotionService;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory Notion: children are served in pages keyed by block id, the
/// cursor being the index of the next page.
#[derive(Clone, Default)]
pub struct RecordingNotion {
    pub pages: Vec<Page>,
    pub children: HashMap<String, Vec<Vec<Value>>>,
    pub failing_blocks: HashSet<String>,
    pub fail_query: bool,
    pub fail_update: bool,
    child_calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
    update_calls: Arc<Mutex<Vec<(String, Value)>>>,
    query_filters: Arc<Mutex<Vec<Option<Value>>>>,
}

impl RecordingNotion {
    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_children(mut self, block_id: &str, pages: Vec<Vec<Value>>) -> Self {
        self.children.insert(block_id.to_string(), pages);
        self
    }

    pub fn failing(mut self, block_id: &str) -> Self {
        self.failing_blocks.insert(block_id.to_string());
        self
    }

    pub async fn child_calls(&self) -> Vec<(String, Option<String>)> {
        self.child_calls.lock().await.clone()
    }

    pub async fn update_calls(&self) -> Vec<(String, Value)> {
        self.update_calls.lock().await.clone()
    }

    pub async fn query_filters(&self) -> Vec<Option<Value>> {
        self.query_filters.lock().await.clone()
    }
}

#[async_trait]
impl NotionService for RecordingNotion {
    async fn query_database(
        &self,
        _database_id: &str,
        filter: Option<&Value>,
    ) -> Result<Vec<Page>> {
        self.query_filters.lock().await.push(filter.cloned());
        if self.fail_query {
            return Err(anyhow!("notion error 401 Unauthorized"));
        }
        Ok(self.pages.clone())
    }

    async fn list_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockChildren> {
        self.child_calls
            .lock()
            .await
            .push((block_id.to_string(), cursor.map(str::to_string)));
        if self.failing_blocks.contains(block_id) {
            return Err(anyhow!("notion error 502 Bad Gateway"));
        }
        let pages = self.children.get(block_id).cloned().unwrap_or_default();
        let idx = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let results = pages
            .get(idx)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|v| serde_json::from_value::<RawBlock>(v).unwrap())
            .collect();
        let has_more = idx + 1 < pages.len();
        Ok(BlockChildren {
            results,
            next_cursor: has_more.then(|| (idx + 1).to_string()),
            has_more,
        })
    }

    async fn update_page(&self, page_id: &str, properties: &Value) -> Result<()> {
        self.update_calls
            .lock()
            .await
            .push((page_id.to_string(), properties.clone()));
        if self.fail_update {
            return Err(anyhow!("notion error 409 Conflict"));
        }
        Ok(())
    }
}

/// Writes a small body for every URL except the ones marked as failing.
#[derive(Clone, Default)]
pub struct FakeImages {
    pub failing_urls: HashSet<String>,
    calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl FakeImages {
    pub fn failing(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub async fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ImageFetcher for FakeImages {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        self.calls
            .lock()
            .await
            .push((url.to_string(), dest.to_path_buf()));
        if self.failing_urls.contains(url) {
            return Err(FetchError::HttpStatus { code: 404 });
        }
        tokio::fs::write(dest, format!("bytes of {}", url))
            .await
            .map_err(|source| FetchError::Write {
                path: dest.to_path_buf(),
                source,
            })
    }
}

pub fn page(id: &str, properties: Value) -> Page {
    serde_json::from_value(json!({
        "object": "page",
        "id": id,
        "created_time": "2024-02-03T04:05:06.000Z",
        "properties": properties
    }))
    .unwrap()
}

pub fn title_prop(title: &str) -> Value {
    json!({ "type": "title", "title": [ { "plain_text": title } ] })
}

pub fn text_block(id: &str, typ: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": typ,
        "has_children": false,
        typ: { "rich_text": [ { "type": "text", "plain_text": text } ] }
    })
}

pub fn paragraph(id: &str, text: &str) -> Value {
    text_block(id, "paragraph", text)
}

pub fn container(id: &str, typ: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": typ,
        "has_children": true,
        typ: { "rich_text": [ { "plain_text": text } ] }
    })
}
