//! `gallery top`: community ranking from pairwise votes.

use anyhow::Result;
use std::collections::HashMap;

use photo_gallery_core::query::fetch_by_ids;

use crate::backend::create_service;
use crate::config::Config;

pub async fn run_top(config: &Config, limit: u32) -> Result<()> {
    let service = create_service(config).await?;
    let ranked = service.top_rated(limit.max(1)).await?;
    if ranked.is_empty() {
        println!("No votes yet.");
        return Ok(());
    }

    let ids: Vec<i64> = ranked.iter().map(|r| r.media_id).collect();
    let names: HashMap<i64, String> = fetch_by_ids(service.as_ref(), &ids)
        .await?
        .into_iter()
        .map(|m| (m.id, format!("{}{}", m.filename, m.extension)))
        .collect();

    for (rank, entry) in ranked.iter().enumerate() {
        let name = names.get(&entry.media_id).map_or("?", String::as_str);
        println!(
            "{:>3}. #{:<6} {}  ({} votes)",
            rank + 1,
            entry.media_id,
            name,
            entry.votes
        );
    }
    Ok(())
}
