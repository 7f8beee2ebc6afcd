//! Image loading for inline encoding.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use glance_common::config::HttpConfig;
use glance_common::InlineImage;
use reqwest::Client;

use crate::error::ImageFetchError;
use crate::transport::build_client;

/// Raw bytes and the content type the source reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Loads image bytes from a locator (URL or data URI).
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<FetchedImage, ImageFetchError>;
}

/// Fetch an image and encode it for a request.
///
/// The reported content type must be `image/*`.
pub async fn encode_image(
    fetcher: &dyn ImageFetcher,
    locator: &str,
) -> Result<InlineImage, ImageFetchError> {
    let fetched = fetcher.fetch(locator).await?;
    let mime_type = fetched
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !mime_type.starts_with("image/") {
        return Err(ImageFetchError::InvalidMime(mime_type));
    }

    tracing::debug!(mime_type = %mime_type, bytes = fetched.bytes.len(), "Image encoded");
    Ok(InlineImage::from_bytes(mime_type, &fetched.bytes))
}

/// Decode a `data:` URI into bytes and its declared media type.
fn decode_data_uri(locator: &str) -> Result<FetchedImage, ImageFetchError> {
    let rest = locator
        .strip_prefix("data:")
        .ok_or(ImageFetchError::InvalidDataUri)?;
    let (meta, payload) = rest.split_once(',').ok_or(ImageFetchError::InvalidDataUri)?;

    let mut meta_parts = meta.split(';');
    let media_type = meta_parts.next().unwrap_or_default().trim();
    let is_base64 = meta_parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        BASE64
            .decode(payload.trim().as_bytes())
            .map_err(|_| ImageFetchError::InvalidDataUri)?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(FetchedImage {
        bytes,
        content_type: (!media_type.is_empty()).then(|| media_type.to_string()),
    })
}

/// Fetches `http(s)` URLs with reqwest and decodes `data:` URIs in place.
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            client: build_client(config),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new(&HttpConfig::default())
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedImage, ImageFetchError> {
        if locator.starts_with("data:") {
            return decode_data_uri(locator);
        }

        let parsed = url::Url::parse(locator)
            .map_err(|_| ImageFetchError::UnsupportedLocator(locator.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageFetchError::UnsupportedLocator(parsed.scheme().to_string()));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| ImageFetchError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageFetchError::Transport(e.without_url().to_string()))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(FetchedImage);

    #[async_trait]
    impl ImageFetcher for Canned {
        async fn fetch(&self, _locator: &str) -> Result<FetchedImage, ImageFetchError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_decode_base64_data_uri() {
        let img = decode_data_uri("data:image/png;base64,AQID").unwrap();
        assert_eq!(img.bytes, vec![1, 2, 3]);
        assert_eq!(img.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_decode_bad_data_uri() {
        assert_eq!(decode_data_uri("data:image/png;base64"), Err(ImageFetchError::InvalidDataUri));
        assert_eq!(
            decode_data_uri("data:image/png;base64,***"),
            Err(ImageFetchError::InvalidDataUri)
        );
    }

    #[tokio::test]
    async fn test_encode_strips_content_type_params() {
        let fetcher = Canned(FetchedImage {
            bytes: vec![1, 2, 3],
            content_type: Some("image/JPEG; charset=binary".into()),
        });
        let img = encode_image(&fetcher, "https://x.test/a.jpg").await.unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!(img.data, "AQID");
    }

    #[tokio::test]
    async fn test_encode_rejects_non_image() {
        let fetcher = Canned(FetchedImage {
            bytes: b"<html>".to_vec(),
            content_type: Some("text/html".into()),
        });
        let err = encode_image(&fetcher, "https://x.test/").await.unwrap_err();
        assert_eq!(err, ImageFetchError::InvalidMime("text/html".into()));
    }

    #[tokio::test]
    async fn test_encode_rejects_missing_content_type() {
        let fetcher = Canned(FetchedImage {
            bytes: vec![0],
            content_type: None,
        });
        assert!(matches!(
            encode_image(&fetcher, "x").await,
            Err(ImageFetchError::InvalidMime(_))
        ));
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_other_schemes() {
        let fetcher = HttpImageFetcher::default();
        assert!(matches!(
            fetcher.fetch("ftp://host/img.png").await,
            Err(ImageFetchError::UnsupportedLocator(_))
        ));
        let img = fetcher.fetch("data:image/gif;base64,R0lG").await.unwrap();
        assert_eq!(img.content_type.as_deref(), Some("image/gif"));
    }
}
