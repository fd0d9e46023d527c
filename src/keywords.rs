//! `gallery keywords`: the grouped keyword catalog.

use anyhow::Result;
use std::collections::BTreeSet;

use photo_gallery_core::keywords::KeywordCatalog;

use crate::backend::create_service;
use crate::config::Config;

pub async fn run_keywords(config: &Config, search: Option<&str>) -> Result<()> {
    let service = create_service(config).await?;
    let catalog = KeywordCatalog::load(service.as_ref()).await?;

    if let Some(query) = search {
        let hits = catalog.search(query, &BTreeSet::new());
        if hits.is_empty() {
            println!("No keywords match '{}'.", query);
        }
        for hit in hits {
            println!("{} ({})", hit.keyword, hit.group);
        }
        return Ok(());
    }

    if catalog.is_empty() {
        println!("No keywords.");
        return Ok(());
    }
    for group in catalog.groups() {
        println!("{}:", group.name);
        for keyword in &group.keywords {
            println!("  {}", keyword);
        }
    }
    Ok(())
}
