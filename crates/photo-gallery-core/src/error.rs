//! Error taxonomy for gallery operations.

/// Failure surfaced by the query builder, loader, voting session, or likes.
///
/// Every variant leaves the caller's previously loaded state usable; none
/// is fatal. Stale page results are not errors and never appear here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GalleryError {
    /// The query service returned an error or was unreachable.
    #[error("query failed: {0}")]
    QueryFailure(String),

    /// The operation needs a signed-in user.
    #[error("sign-in required")]
    AuthRequired,

    /// A vote named a media id outside the current pair.
    #[error("media {selected} is not part of the current pair")]
    InvalidSelection { selected: i64 },

    /// A vote was attempted while no pair is live.
    #[error("no voting pair is available")]
    NoActivePair,

    /// The filter could not be turned into a query.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

impl GalleryError {
    /// Wrap a collaborator error, keeping its full context chain.
    pub fn query(err: anyhow::Error) -> Self {
        GalleryError::QueryFailure(format!("{:#}", err))
    }
}
