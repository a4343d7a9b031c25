//! Page properties → front-matter header.
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::config::{FrontMatter, Properties};
use crate::notion::model::{plain_text, Page};
use crate::slug::{is_url_safe, slugify};

pub const UNTITLED: &str = "Untitled";

/// Typed fields read from a page's property bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub date: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub excerpt: Option<String>,
    /// Remote URL of the cover image, if any.
    pub cover_url: Option<String>,
}

impl PageMeta {
    pub fn extract(page: &Page, names: &Properties, defaults: &FrontMatter) -> Self {
        Self::extract_at(page, names, defaults, Utc::now().date_naive())
    }

    /// Same as [`PageMeta::extract`] with an explicit "today" for the last date fallback.
    pub fn extract_at(
        page: &Page,
        names: &Properties,
        defaults: &FrontMatter,
        today: NaiveDate,
    ) -> Self {
        let prop = |name: &str| page.properties.get(name);

        let title = prop(&names.title)
            .map(text_value)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let slug = match prop(&names.slug).map(text_value) {
            Some(s) if is_url_safe(s.trim()) => s.trim().to_string(),
            Some(s) if !slugify(&s).is_empty() => slugify(&s),
            _ => {
                let generated = slugify(&title);
                if generated.is_empty() {
                    UNTITLED.to_lowercase()
                } else {
                    generated
                }
            }
        };

        let date = prop(&names.date)
            .and_then(|v| v.get("date"))
            .and_then(|d| d.get("start"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| page.created_time.map(|t| t.date_naive().to_string()))
            .unwrap_or_else(|| today.to_string());

        let tags = prop(&names.tags)
            .and_then(|v| v.get("multi_select"))
            .and_then(Value::as_array)
            .map(|opts| {
                opts.iter()
                    .filter_map(|o| o.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let category = prop(&names.category)
            .and_then(|v| v.get("select"))
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| defaults.default_category.clone());

        let author = prop(&names.author)
            .and_then(person_or_text)
            .or_else(|| defaults.default_author.clone());

        let cover_url = prop(&names.cover)
            .and_then(|v| v.get("files"))
            .and_then(Value::as_array)
            .and_then(|files| files.first())
            .and_then(|f| {
                f.get("file")
                    .or_else(|| f.get("external"))
                    .and_then(|o| o.get("url"))
                    .and_then(Value::as_str)
            })
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        Self {
            title,
            slug,
            description: prop(&names.description)
                .map(text_value)
                .filter(|s| !s.is_empty()),
            date,
            tags,
            category,
            author,
            excerpt: prop(&names.excerpt).map(text_value).filter(|s| !s.is_empty()),
            cover_url,
        }
    }
}

/// Plain text of a `title` or `rich_text` property.
fn text_value(prop: &Value) -> String {
    prop.get("title")
        .or_else(|| prop.get("rich_text"))
        .map(|runs| plain_text(Some(runs)))
        .unwrap_or_default()
}

/// First person's name of a `people` property, else its text.
fn person_or_text(prop: &Value) -> Option<String> {
    let person = prop
        .get("people")
        .and_then(Value::as_array)
        .and_then(|people| people.first())
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    person
        .or_else(|| Some(text_value(prop)))
        .filter(|s| !s.is_empty())
}

/// Serialize `meta` as a `---` delimited header. Empty fields are left out;
/// values are JSON encoded so quotes and colons cannot break a line.
pub fn build_front_matter(meta: &PageMeta, layout: Option<&str>, cover: Option<&str>) -> String {
    let text = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(Value::from);
    let fields: [(&str, Option<Value>); 10] = [
        ("layout", text(layout)),
        ("title", text(Some(meta.title.as_str()))),
        ("slug", text(Some(meta.slug.as_str()))),
        ("description", text(meta.description.as_deref())),
        ("date", text(Some(meta.date.as_str()))),
        (
            "tags",
            (!meta.tags.is_empty()).then(|| Value::from(meta.tags.clone())),
        ),
        ("category", text(meta.category.as_deref())),
        ("image", text(cover)),
        ("author", text(meta.author.as_deref())),
        ("excerpt", text(meta.excerpt.as_deref())),
    ];

    let mut out = String::from("---\n");
    for (key, value) in fields {
        if let Some(value) = value {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value.to_string());
            out.push('\n');
        }
    }
    out.push_str("---");
    out
}
