//! Media query builder.
//!
//! Turns a [`FilterSpec`] into exactly one [`QueryService::query_media`]
//! call and normalizes every returned row into a [`MediaRecord`]. The
//! builder never retries; retry policy belongs to the caller.

use tracing::debug;

use crate::error::GalleryError;
use crate::filter::{FilterSpec, DEFAULT_LIMIT};
use crate::models::MediaRecord;
use crate::service::{MediaQuery, QueryService};

/// Validate a filter and produce the service call it stands for.
///
/// `limit` defaults to [`DEFAULT_LIMIT`] and must be positive; `offset`
/// defaults to 0.
pub fn build_query(spec: &FilterSpec) -> Result<MediaQuery, GalleryError> {
    let limit = spec.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(GalleryError::InvalidFilter(
            "limit must be greater than 0".to_string(),
        ));
    }

    Ok(MediaQuery {
        mode: spec.resolved_mode(),
        keywords: spec.keywords.iter().cloned().collect(),
        ids: spec.ids.iter().copied().collect(),
        limit,
        offset: spec.offset.unwrap_or(0),
        sort: spec.sort.direction(),
    })
}

/// Fetch one window of media for `spec`.
///
/// An empty result is `Ok(vec![])`; any service error becomes
/// [`GalleryError::QueryFailure`].
pub async fn fetch_media<S>(service: &S, spec: &FilterSpec) -> Result<Vec<MediaRecord>, GalleryError>
where
    S: QueryService + ?Sized,
{
    let query = build_query(spec)?;
    debug!(
        mode = query.mode.as_str(),
        limit = query.limit,
        offset = query.offset,
        sort = query.sort.as_str(),
        "querying media"
    );

    let rows = service
        .query_media(&query)
        .await
        .map_err(GalleryError::query)?;

    Ok(rows.into_iter().map(MediaRecord::from).collect())
}

/// Fetch the records for an explicit id list in one call.
///
/// The window is sized to the list so no id falls off the first page.
pub async fn fetch_by_ids<S>(service: &S, ids: &[i64]) -> Result<Vec<MediaRecord>, GalleryError>
where
    S: QueryService + ?Sized,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let limit = u32::try_from(ids.len()).unwrap_or(u32::MAX);
    let spec = FilterSpec::new()
        .with_ids(ids.iter().copied())
        .with_window(limit, 0);
    fetch_media(service, &spec).await
}
