//! Pulls published pages from a Notion database and writes them out as
//! Markdown documents with front matter, downloading their images alongside.

pub mod config;
pub mod frontmatter;
pub mod image;
pub mod model;
pub mod notion;
pub mod render;
pub mod slug;
pub mod sync;
pub mod tree;
