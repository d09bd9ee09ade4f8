//! Photo record as published by the remote source and served to clients.

use serde::{Deserialize, Serialize};

/// A single flat photo record.
///
/// `id` is the deduplication key. Every other field is opaque to the service
/// and kept exactly as received; fields missing from the remote payload stay
/// missing on output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<i64>,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Photo {
    pub fn new(id: u64) -> Self {
        Self {
            album_id: None,
            id,
            title: None,
            url: None,
            thumbnail_url: None,
        }
    }

    pub fn with_album(mut self, album_id: i64) -> Self {
        self.album_id = Some(album_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_urls(mut self, url: impl Into<String>, thumbnail_url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }
}
