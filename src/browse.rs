//! `gallery browse`: page through the catalog with a filter.
//!
//! Drives a [`GalleryLoader`] the way an infinite-scroll view would: bind
//! the filter, then call `load_more()` once per extra page requested.

use anyhow::Result;
use chrono::DateTime;
use photo_gallery_core::filter::{FilterMode, FilterSpec, KeywordMode, SortOrder};
use photo_gallery_core::loader::{GalleryLoader, LoadStatus};
use photo_gallery_core::models::MediaRecord;
use serde::Serialize;
use tracing::info;

use crate::backend::create_service;
use crate::config::Config;

/// Filter options as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct BrowseArgs {
    pub keywords: Vec<String>,
    pub mode: Option<KeywordMode>,
    pub ids: Vec<i64>,
    pub sort: Option<SortOrder>,
    pub background: bool,
    /// Deep-link query string used as the starting filter.
    pub query: Option<String>,
    pub pages: u32,
    pub json: bool,
}

/// Combine the deep link with explicit flags; flags win.
pub fn build_filter(args: &BrowseArgs) -> Result<FilterSpec> {
    let mut spec = match &args.query {
        Some(query) => FilterSpec::from_query_string(query)?,
        None => FilterSpec::new(),
    };
    spec = spec
        .with_keywords(args.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()))
        .with_ids(args.ids.iter().copied());
    if let Some(mode) = args.mode {
        spec = spec.with_keyword_mode(mode);
    }
    if let Some(sort) = args.sort {
        spec = spec.with_sort(sort);
    }
    if args.background {
        spec = spec.with_mode(FilterMode::Background);
    }
    Ok(spec)
}

#[derive(Serialize)]
struct BrowseOutput<'a> {
    filter: String,
    items: &'a [MediaRecord],
    has_more: bool,
}

pub async fn run_browse(config: &Config, args: &BrowseArgs) -> Result<()> {
    let spec = build_filter(args)?;
    let filter = spec.to_query_string();
    let service = create_service(config).await?;
    let loader = GalleryLoader::new(service, config.gallery.page_size);

    loader.set_filter(spec).await?;
    let mut pages = 1;
    while pages < args.pages.max(1) {
        match loader.load_more().await? {
            LoadStatus::Appended { .. } => pages += 1,
            LoadStatus::Idle | LoadStatus::Stale => break,
        }
    }

    let snapshot = loader.snapshot();
    info!(
        items = snapshot.items.len(),
        pages,
        has_more = snapshot.has_more,
        "browse finished"
    );

    if args.json {
        let output = BrowseOutput {
            filter,
            items: &snapshot.items,
            has_more: snapshot.has_more,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if snapshot.items.is_empty() {
        println!("No media found.");
        return Ok(());
    }
    for media in &snapshot.items {
        println!("{}", format_line(media));
    }
    if snapshot.has_more {
        println!("-- more results: pass --pages {} to see them --", pages + 1);
    } else {
        println!("-- end of results ({} items) --", snapshot.items.len());
    }
    Ok(())
}

fn format_line(media: &MediaRecord) -> String {
    let date = media
        .capture_date
        .as_deref()
        .map(|raw| match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => dt.format("%Y-%m-%d").to_string(),
            Err(_) => raw.to_string(),
        })
        .unwrap_or_else(|| "-".to_string());
    let kind = if media.is_video() { "video" } else { "photo" };
    let keywords = media
        .keywords
        .as_ref()
        .map(|k| k.join(", "))
        .unwrap_or_default();
    format!(
        "{:>6}  {:<5}  {}{}  {}  \u{2665}{}  {}",
        media.id, kind, media.filename, media.extension, date, media.like_count, keywords
    )
    .trim_end()
    .to_string()
}
