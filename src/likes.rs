//! `gallery likes` and `gallery favorites`.

use anyhow::{bail, Result};
use std::sync::Arc;

use photo_gallery_core::likes::LikeSet;
use photo_gallery_core::query::fetch_by_ids;
use photo_gallery_core::service::QueryService;
use photo_gallery_core::session::UserSession;

use crate::backend::create_service;
use crate::config::{Config, USER_ID_ENV};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    List,
    Add(i64),
    Remove(i64),
}

async fn like_set(
    config: &Config,
    user: Option<String>,
) -> Result<(Arc<dyn QueryService>, LikeSet<dyn QueryService>)> {
    if user.is_none() {
        bail!("likes need a user: pass --user or set {}", USER_ID_ENV);
    }
    let service = create_service(config).await?;
    let identity = Arc::new(UserSession::new(user));
    let mut likes = LikeSet::new(Arc::clone(&service), identity);
    likes.refresh().await?;
    Ok((service, likes))
}

pub async fn run_likes(config: &Config, user: Option<String>, action: LikeAction) -> Result<()> {
    let (_, mut likes) = like_set(config, user).await?;
    match action {
        LikeAction::List => {
            let ids = likes.ids();
            if ids.is_empty() {
                println!("No likes.");
            }
            for id in ids {
                println!("{}", id);
            }
        }
        LikeAction::Add(id) => {
            if likes.add(id).await? {
                println!("Liked #{}.", id);
            } else {
                println!("#{} was already liked.", id);
            }
        }
        LikeAction::Remove(id) => {
            if likes.remove(id).await? {
                println!("Removed like from #{}.", id);
            } else {
                println!("#{} was not liked.", id);
            }
        }
    }
    Ok(())
}

/// Print the full records of everything the user liked.
pub async fn run_favorites(config: &Config, user: Option<String>) -> Result<()> {
    let (service, likes) = like_set(config, user).await?;
    let records = fetch_by_ids(service.as_ref(), &likes.ids()).await?;
    if records.is_empty() {
        println!("No favorites yet.");
    }
    for media in records {
        println!(
            "{:>6}  {}{}  \u{2665}{}",
            media.id, media.filename, media.extension, media.like_count
        );
    }
    Ok(())
}
