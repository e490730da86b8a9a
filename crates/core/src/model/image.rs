use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageError {
    #[error("image prompt cannot be empty")]
    EmptyPrompt,

    #[error("image payload must be an inline data URL or an http(s) URL")]
    InvalidPayload,
}

/// An illustrative reward image, keyed by the visual prompt it was made for.
///
/// The payload is either an inline `data:image/…` URL (generated images are
/// stored this way so the cache works offline) or a remote http(s) URL.
/// Images are decoration: a question without one is a fully valid display
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardImage {
    prompt: String,
    data: String,
    created_at: DateTime<Utc>,
}

impl RewardImage {
    /// Creates a reward image from a prompt and payload.
    ///
    /// # Errors
    ///
    /// Returns `ImageError` if the prompt is blank or the payload is neither
    /// an inline data URL nor a parseable http(s) URL.
    pub fn new(
        prompt: impl Into<String>,
        data: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ImageError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ImageError::EmptyPrompt);
        }

        let data = data.into();
        if !payload_is_valid(&data) {
            return Err(ImageError::InvalidPayload);
        }

        Ok(Self {
            prompt,
            data,
            created_at,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn payload_is_valid(data: &str) -> bool {
    if data.starts_with("data:image/") {
        return data.len() > "data:image/".len();
    }
    match Url::parse(data) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn accepts_data_url_payload() {
        let img = RewardImage::new("a red steam engine", "data:image/png;base64,aGk=", fixed_now());
        assert!(img.is_ok());
    }

    #[test]
    fn accepts_https_payload() {
        let img = RewardImage::new("a red steam engine", "https://img.example/train.png", fixed_now());
        assert!(img.is_ok());
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = RewardImage::new("  ", "data:image/png;base64,aGk=", fixed_now()).unwrap_err();
        assert_eq!(err, ImageError::EmptyPrompt);
    }

    #[test]
    fn rejects_non_url_payload() {
        let err = RewardImage::new("a train", "not an image", fixed_now()).unwrap_err();
        assert_eq!(err, ImageError::InvalidPayload);
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = RewardImage::new("a train", "ftp://img.example/train.png", fixed_now()).unwrap_err();
        assert_eq!(err, ImageError::InvalidPayload);
    }
}
