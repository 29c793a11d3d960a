//! Image upload fetching
//!
//! Downloads image uploads so they can be passed inline to the provider.
//! Failures are logged and the image is dropped; a missing picture never
//! fails a study guide run.

use std::time::Duration;
use thiserror::Error;

use crate::llm::ImageInput;
use crate::services::prompt_builder::ImageRef;

const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    /// `size` is the bytes seen so far when the body has no length header
    #[error("Image too large ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("Not an image (detected {0})")]
    NotAnImage(String),
}

/// Detect an image MIME type from magic bytes
pub fn detect_image_mime(bytes: &[u8]) -> Result<&'static str, ImageLoadError> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(kind.mime_type()),
        Some(kind) => Err(ImageLoadError::NotAnImage(kind.mime_type().to_string())),
        None => Err(ImageLoadError::NotAnImage("unknown".to_string())),
    }
}

/// Sequential downloader for image uploads
pub struct ImageLoader {
    http_client: reqwest::Client,
    max_bytes: usize,
}

impl ImageLoader {
    pub fn new(max_bytes: usize) -> Result<Self, ImageLoadError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| ImageLoadError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            max_bytes,
        })
    }

    /// Download every referenced image, skipping the ones that fail
    pub async fn load_all(&self, images: &[ImageRef]) -> Vec<ImageInput> {
        let mut loaded = Vec::with_capacity(images.len());

        for image in images {
            match self.load(image).await {
                Ok(input) => {
                    tracing::debug!(
                        number = image.number,
                        title = %image.title,
                        mime_type = %input.mime_type,
                        bytes = input.data.len(),
                        "Image upload loaded"
                    );
                    loaded.push(input);
                }
                Err(e) => {
                    tracing::warn!(
                        number = image.number,
                        title = %image.title,
                        error = %e,
                        "Skipping image upload"
                    );
                }
            }
        }

        loaded
    }

    /// Download one image, giving up as soon as the body passes `max_bytes`
    pub async fn load(&self, image: &ImageRef) -> Result<ImageInput, ImageLoadError> {
        let mut response = self
            .http_client
            .get(&image.url)
            .send()
            .await
            .map_err(|e| ImageLoadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageLoadError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            let length = length as usize;
            if length > self.max_bytes {
                return Err(ImageLoadError::TooLarge {
                    size: length,
                    limit: self.max_bytes,
                });
            }
        }

        // Chunked responses carry no length, so count while reading
        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ImageLoadError::Network(e.to_string()))?
        {
            let size = data.len() + chunk.len();
            if size > self.max_bytes {
                return Err(ImageLoadError::TooLarge {
                    size,
                    limit: self.max_bytes,
                });
            }
            data.extend_from_slice(&chunk);
        }

        let mime_type = detect_image_mime(&data)?;
        Ok(ImageInput {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}
