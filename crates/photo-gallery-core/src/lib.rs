//! # Photo Gallery Core
//!
//! Shared, I/O-free logic for Photo Gallery: media models, filter
//! resolution, the media query builder, the incremental gallery loader,
//! the pairwise voting session, likes, keyword catalog, and asset naming.
//!
//! This crate contains no tokio, HTTP client, filesystem I/O, or other
//! native-only dependencies. Everything that talks to the backend goes
//! through the [`service::QueryService`] trait, implemented over HTTP by
//! the `photo-gallery` app crate and in memory by
//! [`service::memory::InMemoryQueryService`].

pub mod assets;
pub mod error;
pub mod filter;
pub mod keywords;
pub mod likes;
pub mod loader;
pub mod models;
pub mod query;
pub mod service;
pub mod session;
pub mod voting;

pub use error::GalleryError;
