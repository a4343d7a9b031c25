//! Content tree of a synced page.
use serde_json::Value;

use crate::notion::model::{plain_text, RawBlock};

/// One node of a page's content tree. `children` holds the nested blocks in
/// remote order and is empty for leaf blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph(String),
    /// `level` is 1..=3.
    Heading { level: u8, text: String },
    BulletedListItem(String),
    NumberedListItem(String),
    Quote(String),
    Divider,
    Callout { icon: Option<String>, text: String },
    Toggle(String),
    ColumnList,
    Column,
    Image(Media),
    Video(Media),
    /// Any type tag without a dedicated variant.
    Unsupported(String),
}

/// A hosted or external media reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Media {
    pub file_url: Option<String>,
    pub external_url: Option<String>,
    pub caption: String,
}

impl Media {
    fn from_payload(payload: Option<&Value>) -> Self {
        let url_at = |key: &str| {
            payload
                .and_then(|p| p.get(key))
                .and_then(|o| o.get("url"))
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
        };
        Self {
            file_url: url_at("file"),
            external_url: url_at("external"),
            caption: plain_text(payload.and_then(|p| p.get("caption"))),
        }
    }
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    /// Build a node from its wire form and already-fetched children.
    pub fn from_raw(raw: &RawBlock, children: Vec<Block>) -> Self {
        Self {
            id: raw.id.clone(),
            kind: BlockKind::from_raw(raw),
            children,
        }
    }
}

impl BlockKind {
    pub fn from_raw(raw: &RawBlock) -> Self {
        let payload = raw.payload();
        let text = || plain_text(payload.and_then(|p| p.get("rich_text")));
        match raw.typ.as_str() {
            "paragraph" => BlockKind::Paragraph(text()),
            "heading_1" => BlockKind::Heading { level: 1, text: text() },
            "heading_2" => BlockKind::Heading { level: 2, text: text() },
            "heading_3" => BlockKind::Heading { level: 3, text: text() },
            "bulleted_list_item" => BlockKind::BulletedListItem(text()),
            "numbered_list_item" => BlockKind::NumberedListItem(text()),
            "quote" => BlockKind::Quote(text()),
            "divider" => BlockKind::Divider,
            "callout" => BlockKind::Callout {
                icon: payload
                    .and_then(|p| p.get("icon"))
                    .and_then(|i| i.get("emoji"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                text: text(),
            },
            "toggle" => BlockKind::Toggle(text()),
            "column_list" => BlockKind::ColumnList,
            "column" => BlockKind::Column,
            "image" => BlockKind::Image(Media::from_payload(payload)),
            "video" => BlockKind::Video(Media::from_payload(payload)),
            other => BlockKind::Unsupported(other.to_string()),
        }
    }

    /// Whether nested blocks of this kind appear in the rendered output.
    pub fn renders_children(&self) -> bool {
        matches!(
            self,
            BlockKind::Toggle(_) | BlockKind::ColumnList | BlockKind::Column
        )
    }

    /// The wire type tag this kind was parsed from.
    pub fn tag(&self) -> &str {
        match self {
            BlockKind::Paragraph(_) => "paragraph",
            BlockKind::Heading { level: 1, .. } => "heading_1",
            BlockKind::Heading { level: 2, .. } => "heading_2",
            BlockKind::Heading { .. } => "heading_3",
            BlockKind::BulletedListItem(_) => "bulleted_list_item",
            BlockKind::NumberedListItem(_) => "numbered_list_item",
            BlockKind::Quote(_) => "quote",
            BlockKind::Divider => "divider",
            BlockKind::Callout { .. } => "callout",
            BlockKind::Toggle(_) => "toggle",
            BlockKind::ColumnList => "column_list",
            BlockKind::Column => "column",
            BlockKind::Image(_) => "image",
            BlockKind::Video(_) => "video",
            BlockKind::Unsupported(tag) => tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawBlock {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_text_blocks() {
        let b = raw(json!({
            "id": "h", "type": "heading_2", "has_children": false,
            "heading_2": { "rich_text": [ { "plain_text": "Intro" } ] }
        }));
        assert_eq!(
            BlockKind::from_raw(&b),
            BlockKind::Heading {
                level: 2,
                text: "Intro".into()
            }
        );
        assert_eq!(BlockKind::from_raw(&b).tag(), "heading_2");
    }

    #[test]
    fn parses_callout_icon() {
        let b = raw(json!({
            "id": "c", "type": "callout",
            "callout": {
                "rich_text": [ { "plain_text": "Note" } ],
                "icon": { "type": "emoji", "emoji": "⚠️" }
            }
        }));
        assert_eq!(
            BlockKind::from_raw(&b),
            BlockKind::Callout { icon: Some("⚠️".into()), text: "Note".into() }
        );
    }

    #[test]
    fn parses_image_sources_and_caption() {
        let b = raw(json!({
            "id": "img-1", "type": "image",
            "image": {
                "type": "file",
                "file": { "url": "https://s3/a.png?sig=1", "expiry_time": "x" },
                "caption": [ { "plain_text": "A " }, { "plain_text": "cat" } ]
            }
        }));
        let BlockKind::Image(media) = BlockKind::from_raw(&b) else {
            panic!("expected image");
        };
        assert_eq!(media.file_url.as_deref(), Some("https://s3/a.png?sig=1"));
        assert_eq!(media.external_url, None);
        assert_eq!(media.caption, "A cat");
    }

    #[test]
    fn unknown_type_is_kept_as_unsupported() {
        let b = raw(json!({ "id": "t", "type": "table", "has_children": true, "table": {} }));
        assert!(b.has_children);
        let kind = BlockKind::from_raw(&b);
        assert_eq!(kind, BlockKind::Unsupported("table".into()));
        assert_eq!(kind.tag(), "table");
    }

    #[test]
    fn only_containers_render_children() {
        assert!(BlockKind::Toggle(String::new()).renders_children());
        assert!(BlockKind::ColumnList.renders_children());
        assert!(BlockKind::Column.renders_children());
        assert!(!BlockKind::BulletedListItem("a".into()).renders_children());
        assert!(!BlockKind::Quote("q".into()).renders_children());
        let heading = BlockKind::Heading {
            level: 1,
            text: "h".into(),
        };
        assert!(!heading.renders_children());
    }

    #[test]
    fn from_raw_attaches_children() {
        let b = raw(json!({ "id": "tg", "type": "toggle", "has_children": true,
            "toggle": { "rich_text": [] } }));
        let child = Block::new("p", BlockKind::Paragraph("inside".into()));
        let block = Block::from_raw(&b, vec![child.clone()]);
        assert_eq!(block.kind, BlockKind::Toggle(String::new()));
        assert_eq!(block.children, vec![child]);
    }
}
