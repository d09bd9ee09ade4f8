//! Remote photo source: the collaborator the refresh worker pulls from.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{error::FetchError, model::Photo};

/// Anything that can produce the full remote collection on demand.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch_all(&self) -> Result<Vec<Photo>, FetchError>;
}

/// Fetches the collection with a single HTTP GET.
pub struct HttpPhotoSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPhotoSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("photo-feed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PhotoSource for HttpPhotoSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_all(&self) -> Result<Vec<Photo>, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!("Received {} bytes from remote source", body.len());
        decode_collection(&body)
    }
}

/// Decode a remote payload into photos.
///
/// The payload must be a JSON array. Elements that are not photo-shaped
/// (for example a missing, zero or non-integer `id`) are skipped.
pub fn decode_collection(body: &[u8]) -> Result<Vec<Photo>, FetchError> {
    let value: Value = serde_json::from_slice(body)?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(FetchError::NotAnArray {
                found: json_type_name(&other),
            })
        }
    };

    let mut photos = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match serde_json::from_value::<Photo>(item) {
            Ok(photo) if photo.id == 0 => {
                skipped += 1;
                debug!("Skipping record with non-positive id");
            }
            Ok(photo) => photos.push(photo),
            Err(e) => {
                skipped += 1;
                debug!("Skipping malformed record: {}", e);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed records in remote payload", skipped);
    }
    Ok(photos)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_array_of_photos() {
        let body = br#"[
            {"albumId": 1, "id": 1, "title": "a", "url": "u1", "thumbnailUrl": "t1"},
            {"albumId": 1, "id": 2, "title": "b", "url": "u2", "thumbnailUrl": "t2"}
        ]"#;

        let photos = decode_collection(body).unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[1].id, 2);
        assert_eq!(photos[1].thumbnail_url.as_deref(), Some("t2"));
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = decode_collection(br#"{"photos": []}"#).unwrap_err();
        assert!(matches!(err, FetchError::NotAnArray { found: "object" }));
        assert_eq!(err.kind(), "not_an_array");
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let err = decode_collection(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_decode_skips_malformed_elements() {
        let body = br#"[{"id": 1}, {"title": "no id"}, 5, {"id": "x"}, {"id": 0}, {"id": -3}, {"id": 2}]"#;
        let ids: Vec<u64> = decode_collection(body).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert!(decode_collection(b"[]").unwrap().is_empty());
    }
}
