use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use pulsevest_core::SignatureAlgorithm;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::StorageError;
use crate::signing::sign_params_with;

/// Asset class the provider stores an upload under. It is part of the upload
/// URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Image,
    Video,
    Raw,
}

impl ResourceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
            ResourceType::Raw => "raw",
        }
    }

    /// Resource type for a project's primary media file. Video content types
    /// are stored as `video`; everything else (audio included) as `raw`.
    #[must_use]
    pub fn for_media_content_type(content_type: &str) -> Self {
        if content_type.starts_with("video") {
            ResourceType::Video
        } else {
            ResourceType::Raw
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// HTTP client for a Cloudinary-compatible signed upload API.
///
/// Non-2xx responses and responses without a `secure_url` surface as typed
/// errors. Uploads are not retried.
pub struct StorageClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    signature_algorithm: SignatureAlgorithm,
}

impl fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageClient")
            .field("base_url", &self.base_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &"[redacted]")
            .field("api_secret", &"[redacted]")
            .field("signature_algorithm", &self.signature_algorithm)
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    /// Creates a `StorageClient` against `base_url` (no trailing path) with
    /// the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        cloud_name: &str,
        api_key: &str,
        api_secret: &str,
        timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("pulsevest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            cloud_name: cloud_name.to_owned(),
            api_key: api_key.to_owned(),
            api_secret: api_secret.to_owned(),
            signature_algorithm: SignatureAlgorithm::default(),
        })
    }

    /// Switches the signing digest. Accounts default to SHA-1.
    #[must_use]
    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = algorithm;
        self
    }

    /// Signs client-supplied upload parameters with this account's secret.
    #[must_use]
    pub fn sign(&self, params: &BTreeMap<String, Value>) -> String {
        sign_params_with(params, &self.api_secret, self.signature_algorithm)
    }

    /// Uploads `bytes` and returns the public HTTPS URL of the stored asset.
    ///
    /// # Errors
    ///
    /// - [`StorageError::UnexpectedStatus`] for any non-2xx response.
    /// - [`StorageError::Http`] on network or TLS failure.
    /// - [`StorageError::Deserialize`] if the body is not the expected JSON.
    /// - [`StorageError::MissingSecureUrl`] if the body carries no `secure_url`.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        resource_type: ResourceType,
    ) -> Result<String, StorageError> {
        let url = self.upload_url(resource_type);
        let timestamp = chrono::Utc::now().timestamp();

        let mut signed = BTreeMap::new();
        signed.insert("timestamp".to_owned(), Value::from(timestamp));
        let signature = self.sign(&signed);

        let size = bytes.len();
        let file = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<UploadResponse>(&body).map_err(|e| {
            StorageError::Deserialize {
                context: format!("upload response for {filename}"),
                source: e,
            }
        })?;

        let secure_url = parsed
            .secure_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| StorageError::MissingSecureUrl {
                filename: filename.to_owned(),
            })?;

        tracing::info!(
            filename,
            %resource_type,
            size,
            "upload stored"
        );
        Ok(secure_url)
    }

    fn upload_url(&self, resource_type: ResourceType) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.base_url, self.cloud_name, resource_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StorageClient {
        StorageClient::new("https://api.example.com/", "demo", "key-123", "secret", 5)
            .expect("client builds")
    }

    #[test]
    fn media_content_type_picks_resource_type() {
        assert_eq!(
            ResourceType::for_media_content_type("video/mp4"),
            ResourceType::Video
        );
        assert_eq!(
            ResourceType::for_media_content_type("audio/mpeg"),
            ResourceType::Raw
        );
        assert_eq!(
            ResourceType::for_media_content_type("application/octet-stream"),
            ResourceType::Raw
        );
    }

    #[test]
    fn upload_url_trims_trailing_slash() {
        assert_eq!(
            client().upload_url(ResourceType::Image),
            "https://api.example.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn debug_redacts_key_and_secret() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("\"secret\""));
        assert!(!rendered.contains("key-123"));
        assert!(rendered.contains("demo"));
    }

    #[test]
    fn sign_uses_configured_algorithm() {
        let mut params = BTreeMap::new();
        params.insert("timestamp".to_owned(), Value::from(1_315_060_510));

        let sha1 = client().sign(&params);
        assert_eq!(sha1.len(), 40);

        let sha256 = client()
            .with_signature_algorithm(SignatureAlgorithm::Sha256)
            .sign(&params);
        assert_eq!(sha256.len(), 64);
        assert_ne!(&sha256[..40], sha1);
    }
}
