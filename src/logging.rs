//! Tracing setup for the `gallery` binary.
//!
//! Logs go to stderr so command output on stdout stays pipeable. The level
//! comes from `GALLERY_LOG` (any `EnvFilter` directive, e.g.
//! `GALLERY_LOG=photo_gallery=debug`), then `[logging].level`, then `info`.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "GALLERY_LOG";

pub fn init(default_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;

    Ok(())
}
