//! `gallery assets <id>`: URLs of every rendered variant of one record.

use anyhow::{anyhow, bail, Result};

use photo_gallery_core::assets::AssetUrls;
use photo_gallery_core::query::fetch_by_ids;

use crate::backend::create_service;
use crate::config::Config;

pub async fn run_assets(config: &Config, id: i64) -> Result<()> {
    let base_url = config
        .media
        .base_url
        .as_deref()
        .ok_or_else(|| anyhow!("media.base_url must be set to derive asset URLs"))?;
    let urls = AssetUrls::new(base_url);

    let service = create_service(config).await?;
    let Some(media) = fetch_by_ids(service.as_ref(), &[id]).await?.pop() else {
        bail!("media not found: {}", id);
    };

    let set = urls.all(&media);
    println!("thumbnail  {}", set.thumbnail);
    println!("medium     {}", set.medium);
    println!("large      {}", set.large);
    if let Some(video) = set.video {
        println!("video      {}", video);
    }
    Ok(())
}
