//! # Photo Gallery
//!
//! Command-line client for a hosted photo gallery. The gallery logic
//! (filters, paginated loading, pairwise voting, likes) lives in
//! [`photo_gallery_core`]; this crate supplies the HTTP backend,
//! configuration, logging, and the `gallery` commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌──────────────────┐
//! │ gallery CLI  │──▶│ photo-gallery-core │──▶│  QueryService    │
//! │ browse/vote… │   │ loader · voting    │   │ REST │ in-memory │
//! └──────────────┘   └────────────────────┘   └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | tracing subscriber setup |
//! | [`http`] | PostgREST query service with retry |
//! | [`fixture`] | JSON catalogs for the in-memory backend |
//! | [`backend`] | Backend selection |
//! | [`browse`] | Filtered, paginated listing |
//! | [`keywords`] | Keyword catalog |
//! | [`vote`] | Interactive pairwise voting |
//! | [`likes`] | Likes and favorites |
//! | [`top`] | Community ranking |
//! | [`assets`] | Asset URLs |

pub mod assets;
pub mod backend;
pub mod browse;
pub mod config;
pub mod fixture;
pub mod http;
pub mod keywords;
pub mod likes;
pub mod logging;
pub mod top;
pub mod vote;
