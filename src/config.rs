//! Configuration loader and validator for the Notion→Markdown sync.
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable carrying the Notion integration token.
pub const ENV_TOKEN: &str = "NOTION_TOKEN";
/// Environment variable carrying the source database id.
pub const ENV_DATABASE_ID: &str = "NOTION_DATABASE_ID";
/// Optional environment variable scoping the query to one target site.
pub const ENV_TARGET_SITE: &str = "NOTION_TARGET_SITE";

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "notion-sync.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub notion: Notion,
    pub output: Output,
    pub http: Http,
    pub query: Query,
    pub properties: Properties,
    pub front_matter: FrontMatter,
    pub after_sync: AfterSync,
}

/// Notion API credentials and the source database.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Notion {
    pub token: String,
    pub database_id: String,
    pub version: String,
}

impl Default for Notion {
    fn default() -> Self {
        Self {
            token: String::new(),
            database_id: String::new(),
            version: "2022-06-28".into(),
        }
    }
}

/// Where rendered documents and downloaded images land.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Output {
    pub content_dir: String,
    pub image_dir: String,
    /// URL prefix embedded in Markdown for files under `image_dir`.
    pub public_image_base: String,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            content_dir: "_content".into(),
            image_dir: "images/posts".into(),
            public_image_base: "/images/posts".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Http {
    pub user_agent: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            user_agent: concat!("notion-md-sync/", env!("CARGO_PKG_VERSION")).into(),
            timeout_secs: None,
        }
    }
}

/// Notion property kinds that can carry a single named option.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    #[default]
    Status,
    Select,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Status => "status",
            OptionKind::Select => "select",
        }
    }
}

/// `property == equals` on a status or select property.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OptionMatch {
    pub property: String,
    #[serde(default)]
    pub kind: OptionKind,
    pub equals: String,
}

/// Eligibility predicate for the database query. Unset parts are not filtered on.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Query {
    /// Checkbox property that must be ticked.
    pub checkbox: Option<String>,
    pub status: Option<OptionMatch>,
    /// Target-site discriminator; `equals` may come from `NOTION_TARGET_SITE`.
    pub site: Option<OptionMatch>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            checkbox: Some("Sync to GitHub".into()),
            status: Some(OptionMatch {
                property: "Status".into(),
                kind: OptionKind::Status,
                equals: "Published".into(),
            }),
            site: None,
        }
    }
}

/// Display names of the database properties read for front matter.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Properties {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub date: String,
    pub tags: String,
    pub category: String,
    pub author: String,
    pub excerpt: String,
    pub cover: String,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            title: "Page Title".into(),
            slug: "URL Slug".into(),
            description: "Meta Description".into(),
            date: "Publish Date".into(),
            tags: "Tags".into(),
            category: "Category".into(),
            author: "Author".into(),
            excerpt: "Excerpt".into(),
            cover: "Cover Image".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FrontMatter {
    pub layout: Option<String>,
    pub default_author: Option<String>,
    pub default_category: Option<String>,
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            layout: Some("post".into()),
            default_author: Some("Editorial Team".into()),
            default_category: None,
        }
    }
}

/// Status written back to each page once its file is on disk.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub property: String,
    #[serde(default)]
    pub kind: OptionKind,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AfterSync {
    pub status: Option<StatusUpdate>,
}

impl Config {
    /// Overlay values taken from the environment (or any lookup with the same shape).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.notion.token = token;
        }
        if let Some(id) = non_empty(ENV_DATABASE_ID) {
            self.notion.database_id = id;
        }
        if let Some(site) = non_empty(ENV_TARGET_SITE) {
            match self.query.site.as_mut() {
                Some(m) => m.equals = site,
                None => {
                    self.query.site = Some(OptionMatch {
                        property: "Website".into(),
                        kind: OptionKind::Select,
                        equals: site,
                    })
                }
            }
        }
    }
}

/// Load configuration and validate it.
/// - If `path` is given the file must exist.
/// - Otherwise `notion-sync.yaml` is read when present, defaults are used when not.
/// - Environment variables are applied last.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(p) => parse(&fs::read_to_string(p)?)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                parse(&fs::read_to_string(default)?)?
            } else {
                Config::default()
            }
        }
    };
    cfg.apply_env(|key| std::env::var(key).ok());
    validate(&cfg)?;
    Ok(cfg)
}

fn parse(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.notion.token.trim().is_empty() {
        return Err(ConfigError::Missing(ENV_TOKEN));
    }
    if cfg.notion.database_id.trim().is_empty() {
        return Err(ConfigError::Missing(ENV_DATABASE_ID));
    }
    if cfg.notion.version.trim().is_empty() {
        return Err(ConfigError::Invalid("notion.version must be non-empty"));
    }

    if cfg.output.content_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("output.content_dir must be non-empty"));
    }
    if cfg.output.image_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("output.image_dir must be non-empty"));
    }

    if cfg.properties.title.trim().is_empty() {
        return Err(ConfigError::Invalid("properties.title must be non-empty"));
    }
    if let Some(site) = &cfg.query.site {
        if site.equals.trim().is_empty() {
            return Err(ConfigError::Invalid("query.site.equals must be non-empty"));
        }
    }
    if let Some(status) = &cfg.after_sync.status {
        if status.property.trim().is_empty() || status.value.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "after_sync.status needs both property and value",
            ));
        }
    }

    Ok(())
}

/// Example YAML with every section spelled out.
pub fn example() -> &'static str {
    r#"notion:
  token: "YOUR_NOTION_INTEGRATION_TOKEN"
  database_id: "NOTION_DATABASE_ID"
  version: "2022-06-28"

output:
  content_dir: "_content"
  image_dir: "images/posts"
  public_image_base: "/images/posts"

http:
  user_agent: "notion-md-sync"
  timeout_secs: 60

query:
  checkbox: "Sync to GitHub"
  status:
    property: "Status"
    kind: status
    equals: "Published"
  site:
    property: "Website"
    kind: select
    equals: "example.com"

properties:
  title: "Page Title"
  slug: "URL Slug"
  description: "Meta Description"
  date: "Publish Date"
  tags: "Tags"
  category: "Category"
  author: "Author"
  excerpt: "Excerpt"
  cover: "Cover Image"

front_matter:
  layout: "post"
  default_author: "Editorial Team"

after_sync:
  status:
    property: "Status"
    kind: status
    value: "Live"
"#
}
