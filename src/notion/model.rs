//! Wire shapes returned by the Notion REST API.
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize, Debug)]
pub struct DatabaseProperty {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
}

#[derive(Deserialize, Debug)]
pub struct RetrieveDatabaseResp {
    pub id: String,
    pub properties: std::collections::HashMap<String, DatabaseProperty>,
}

/// One database row. Properties stay untyped; the front-matter layer reads
/// them through the configured name mapping.
#[derive(Deserialize, Debug, Clone)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Response of `POST v1/databases/{id}/query`.
#[derive(Deserialize, Debug)]
pub struct QueryResp {
    pub results: Vec<Page>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A block as it comes over the wire: the type tag plus a payload object
/// keyed by that same tag.
#[derive(Deserialize, Debug, Clone)]
pub struct RawBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RawBlock {
    /// The type-specific payload, e.g. `block["paragraph"]` for a paragraph.
    pub fn payload(&self) -> Option<&Value> {
        self.rest.get(&self.typ)
    }
}

/// One page of `GET v1/blocks/{id}/children`.
#[derive(Deserialize, Debug, Default)]
pub struct BlockChildren {
    pub results: Vec<RawBlock>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// Concatenate the `plain_text` of every run in a rich-text array.
pub fn plain_text(runs: Option<&Value>) -> String {
    runs.and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|r| r.get("plain_text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_block_keeps_typed_payload() {
        let raw: RawBlock = serde_json::from_value(json!({
            "object": "block",
            "id": "b1",
            "type": "paragraph",
            "has_children": false,
            "paragraph": { "rich_text": [ { "plain_text": "hi" } ] }
        }))
        .unwrap();
        assert_eq!(raw.typ, "paragraph");
        assert_eq!(plain_text(raw.payload().and_then(|p| p.get("rich_text"))), "hi");
    }

    #[test]
    fn plain_text_joins_runs_in_order() {
        let runs = json!([
            { "plain_text": "Hello, " },
            { "plain_text": "world", "annotations": { "bold": true } },
            { "type": "mention" }
        ]);
        assert_eq!(plain_text(Some(&runs)), "Hello, world");
        assert_eq!(plain_text(None), "");
        assert_eq!(plain_text(Some(&json!("not an array"))), "");
    }

    #[test]
    fn page_parses_created_time() {
        let page: Page = serde_json::from_value(json!({
            "object": "page",
            "id": "p1",
            "created_time": "2024-03-05T10:20:00.000Z",
            "properties": {}
        }))
        .unwrap();
        assert_eq!(
            page.created_time.unwrap().date_naive().to_string(),
            "2024-03-05"
        );
    }
}
