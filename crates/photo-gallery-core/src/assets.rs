//! Asset URLs derived from a record's filename and extension.
//!
//! | Variant | Image | Video |
//! |---------|-------|-------|
//! | thumbnail | `{f}-thumb{ext}` | `{f}-thumb.jpg` |
//! | medium | `{f}{ext}` | `{f}.jpg` |
//! | large | `{f}-big{ext}` | `{f}.jpg` |
//! | video | none | `{f}{ext}` |

use serde::Serialize;

use crate::models::MediaRecord;

const POSTER_EXTENSION: &str = ".jpg";

/// Every URL a view may need for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSet {
    pub thumbnail: String,
    pub medium: String,
    pub large: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

/// URL builder rooted at the media host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrls {
    base_url: String,
}

impl AssetUrls {
    /// `base_url` may or may not end in `/`.
    pub fn new(base_url: &str) -> Self {
        let mut base_url = base_url.trim_end_matches('/').to_string();
        base_url.push('/');
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn join(&self, filename: &str, suffix: &str, ext: &str) -> String {
        format!("{}{}{}{}", self.base_url, filename, suffix, ext)
    }

    pub fn thumbnail(&self, media: &MediaRecord) -> String {
        if media.is_video() {
            self.poster_thumbnail(media)
        } else {
            self.join(&media.filename, "-thumb", &media.extension)
        }
    }

    pub fn medium(&self, media: &MediaRecord) -> String {
        if media.is_video() {
            self.poster(media)
        } else {
            self.join(&media.filename, "", &media.extension)
        }
    }

    pub fn large(&self, media: &MediaRecord) -> String {
        if media.is_video() {
            self.poster(media)
        } else {
            self.join(&media.filename, "-big", &media.extension)
        }
    }

    /// The playable file, for videos only.
    pub fn video(&self, media: &MediaRecord) -> Option<String> {
        media
            .is_video()
            .then(|| self.join(&media.filename, "", &media.extension))
    }

    pub fn poster(&self, media: &MediaRecord) -> String {
        self.join(&media.filename, "", POSTER_EXTENSION)
    }

    pub fn poster_thumbnail(&self, media: &MediaRecord) -> String {
        self.join(&media.filename, "-thumb", POSTER_EXTENSION)
    }

    pub fn all(&self, media: &MediaRecord) -> AssetSet {
        AssetSet {
            thumbnail: self.thumbnail(media),
            medium: self.medium(media),
            large: self.large(media),
            video: self.video(media),
        }
    }
}
