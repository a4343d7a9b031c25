use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use notion_md_sync::config;
use notion_md_sync::notion::NotionClient;

/// Print a database's property names and types, to fill in the `properties`
/// section of the config.
#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database ID to inspect (defaults to the configured one)
    #[arg(long)]
    db_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = config::load(args.config.as_deref())?;
    let client = NotionClient::from_config(&cfg)?;
    let db_id = args.db_id.unwrap_or_else(|| cfg.notion.database_id.clone());

    let db = client.retrieve_database(&db_id).await?;
    println!("Database ID: {}", db.id);
    println!("Properties:");
    let mut props: Vec<_> = db.properties.into_iter().collect();
    props.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, prop) in props {
        let mapped = mapped_field(&cfg.properties, &name)
            .map(|f| format!("  <- properties.{}", f))
            .unwrap_or_default();
        println!("  {} -> {{ id: {}, type: {} }}{}", name, prop.id, prop.typ, mapped);
    }
    Ok(())
}

fn mapped_field(props: &config::Properties, name: &str) -> Option<&'static str> {
    [
        ("title", &props.title),
        ("slug", &props.slug),
        ("description", &props.description),
        ("date", &props.date),
        ("tags", &props.tags),
        ("category", &props.category),
        ("author", &props.author),
        ("excerpt", &props.excerpt),
        ("cover", &props.cover),
    ]
    .into_iter()
    .find(|(_, n)| n.as_str() == name)
    .map(|(f, _)| f)
}
