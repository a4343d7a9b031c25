use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Config, OptionKind, Query, StatusUpdate};
use crate::notion::model::{BlockChildren, Page, QueryResp, RetrieveDatabaseResp};

pub mod model;

const NOTION_API_BASE: &str = "https://api.notion.com/";

/// Largest page size the Notion API accepts.
pub const PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    token: String,
    version: String,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// The slice of the Notion API the sync relies on.
#[async_trait]
pub trait NotionService: Send + Sync {
    /// All rows of `database_id` matching `filter`, in result order.
    async fn query_database(&self, database_id: &str, filter: Option<&Value>) -> Result<Vec<Page>>;

    /// One page of children of a block or page.
    async fn list_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockChildren>;

    /// Patch page properties; `properties` is the Notion `properties` object.
    async fn update_page(&self, page_id: &str, properties: &Value) -> Result<()>;
}

impl NotionClient {
    pub fn new(token: String, version: String) -> Result<Self> {
        let base_url = Url::parse(NOTION_API_BASE).context("invalid default Notion URL")?;
        Self::with_base_url(token, version, base_url)
    }

    pub fn with_base_url(token: String, version: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("notion-md-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_http(http, token, version, base_url))
    }

    pub fn with_http(http: Client, token: String, version: String, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            token,
            version,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut builder = Client::builder().user_agent(cfg.http.user_agent.clone());
        if let Some(secs) = cfg.http.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build HTTP client")?;
        let base_url = Url::parse(NOTION_API_BASE).context("invalid default Notion URL")?;
        Ok(Self::with_http(
            http,
            cfg.notion.token.clone(),
            cfg.notion.version.clone(),
            base_url,
        ))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid Notion endpoint: {path}"))
    }

    pub fn build_request(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<reqwest::Request> {
        let mut builder = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version);
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }
        builder.build().context("failed to build Notion request")
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        debug!(method=%request.method(), url=%request.url(), "sending notion request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Notion")?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("Rate limited by Notion: {}", body);
            return Err(anyhow!("received 429 from Notion: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("notion error {}: {}", status, body));
        }

        res.json::<T>().await.context("invalid Notion response")
    }

    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Option<&Value>,
    ) -> Result<Vec<Page>> {
        let url = self.endpoint(&format!("v1/databases/{}/query", database_id))?;
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = build_query_body(filter, cursor.as_deref());
            debug!(payload=%body, "querying database");
            let request = self.build_request(Method::POST, url.clone(), Some(&body))?;
            let resp: QueryResp = self
                .execute(request)
                .await
                .with_context(|| format!("failed to query database {}", database_id))?;
            pages.extend(resp.results);
            match resp.next_cursor {
                Some(next) if resp.has_more => cursor = Some(next),
                _ => break,
            }
        }
        Ok(pages)
    }

    pub async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<BlockChildren> {
        let mut url = self.endpoint(&format!("v1/blocks/{}/children", block_id))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page_size", &PAGE_SIZE.to_string());
            if let Some(cursor) = cursor {
                pairs.append_pair("start_cursor", cursor);
            }
        }
        let request = self.build_request(Method::GET, url, None)?;
        self.execute(request)
            .await
            .with_context(|| format!("failed to list children of {}", block_id))
    }

    pub async fn update_page(&self, page_id: &str, properties: &Value) -> Result<()> {
        let url = self.endpoint(&format!("v1/pages/{}", page_id))?;
        let body = json!({ "properties": properties });
        debug!(payload=%body, "updating page");
        let request = self.build_request(Method::PATCH, url, Some(&body))?;
        self.execute::<Value>(request)
            .await
            .with_context(|| format!("failed to update page {}", page_id))?;
        Ok(())
    }

    pub async fn retrieve_database(&self, database_id: &str) -> Result<RetrieveDatabaseResp> {
        let url = self.endpoint(&format!("v1/databases/{}", database_id))?;
        let request = self.build_request(Method::GET, url, None)?;
        self.execute(request)
            .await
            .with_context(|| format!("failed to retrieve database {}", database_id))
    }
}

#[async_trait]
impl NotionService for NotionClient {
    async fn query_database(&self, database_id: &str, filter: Option<&Value>) -> Result<Vec<Page>> {
        NotionClient::query_database(self, database_id, filter).await
    }

    async fn list_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockChildren> {
        NotionClient::list_children(self, block_id, cursor).await
    }

    async fn update_page(&self, page_id: &str, properties: &Value) -> Result<()> {
        NotionClient::update_page(self, page_id, properties).await
    }
}

fn option_condition(kind: OptionKind, equals: &str) -> Value {
    let mut cond = Map::new();
    cond.insert(kind.as_str().to_string(), json!({ "equals": equals }));
    Value::Object(cond)
}

/// Build the eligibility filter. Returns `None` when nothing is configured.
pub fn build_query_filter(query: &Query) -> Option<Value> {
    let mut clauses = Vec::new();
    if let Some(checkbox) = query.checkbox.as_deref().filter(|p| !p.is_empty()) {
        clauses.push(json!({ "property": checkbox, "checkbox": { "equals": true } }));
    }
    for m in [&query.status, &query.site].into_iter().flatten() {
        let mut clause = option_condition(m.kind, &m.equals);
        if let Value::Object(map) = &mut clause {
            map.insert("property".into(), Value::String(m.property.clone()));
        }
        clauses.push(clause);
    }

    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "and": clauses })),
    }
}

pub fn build_query_body(filter: Option<&Value>, cursor: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("page_size".into(), json!(PAGE_SIZE));
    if let Some(filter) = filter {
        body.insert("filter".into(), filter.clone());
    }
    if let Some(cursor) = cursor {
        body.insert("start_cursor".into(), json!(cursor));
    }
    Value::Object(body)
}

/// The `properties` object that moves a page to the configured status.
pub fn build_status_update(update: &StatusUpdate) -> Value {
    let mut properties = Map::new();
    let mut value = Map::new();
    value.insert(
        update.kind.as_str().to_string(),
        json!({ "name": update.value }),
    );
    properties.insert(update.property.clone(), Value::Object(value));
    Value::Object(properties)
}
