//! Backend selection.
//!
//! Use [`create_service`] to instantiate the query service named by
//! `[service].backend`.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use photo_gallery_core::service::memory::InMemoryQueryService;
use photo_gallery_core::service::QueryService;

use crate::config::{Backend, Config};
use crate::fixture::Fixture;
use crate::http::RestQueryService;

pub async fn create_service(config: &Config) -> Result<Arc<dyn QueryService>> {
    match config.service.backend {
        Backend::Rest => {
            let service = RestQueryService::from_config(config)?;
            Ok(Arc::new(service))
        }
        Backend::Memory => {
            let service = match &config.service.fixture {
                Some(path) => Fixture::load(path)?.into_service().await?,
                None => InMemoryQueryService::new(),
            };
            info!(media = service.media_count(), "using in-memory backend");
            Ok(Arc::new(service))
        }
    }
}
