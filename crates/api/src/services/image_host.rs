//! Cloudinary image uploads.
//!
//! Uploads are signed server-side: the request parameters (other than the
//! file and API key) are sorted, joined as `k=v&k=v`, suffixed with the API
//! secret and hashed with SHA-256.


use reqwest::{
    Client,
    multipart::{Form, Part},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::CloudinaryConfig;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Errors from uploading an image.
#[derive(Debug, Error)]
pub enum ImageHostError {
    #[error("Cloudinary request failed: {0}")]
    Request(String),

    #[error("Cloudinary API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid Cloudinary response: {0}")]
    Response(String),
}

/// Folders uploads may go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadFolder {
    CleaningPhotos,
    VehiclePhotos,
    ProfilePhotos,
    DamageReports,
}

impl UploadFolder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CleaningPhotos => "cleaning-photos",
            Self::VehiclePhotos => "vehicle-photos",
            Self::ProfilePhotos => "profile-photos",
            Self::DamageReports => "damage-reports",
        }
    }
}

/// Where an uploaded image ended up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Signed-upload client for Cloudinary.
#[derive(Clone)]
pub struct ImageHost {
    client: Client,
    config: CloudinaryConfig,
}

impl std::fmt::Debug for ImageHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHost")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Signature over `params` (already sorted by key) and `secret`.
#[must_use]
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl ImageHost {
    /// Create a new image host client.
    #[must_use]
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Upload one image into `folder`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Cloudinary rejects the upload.
    #[instrument(skip(self, bytes), fields(folder = folder.as_str(), size = bytes.len()))]
    pub async fn upload(
        &self,
        folder: UploadFolder,
        file_name: String,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, ImageHostError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", folder.as_str()), ("timestamp", &timestamp)],
            self.config.api_secret.expose_secret(),
        );

        let file = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(|e| ImageHostError::Request(e.to_string()))?;

        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.as_str())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(format!(
                "{CLOUDINARY_API_BASE}/{}/image/upload",
                self.config.cloud_name
            ))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageHostError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map_or_else(|_| "Unknown error".to_string(), |e| e.error.message);
            tracing::error!(status = status.as_u16(), %message, "Cloudinary rejected upload");
            return Err(ImageHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::Response(e.to_string()))?;

        tracing::info!(public_id = %uploaded.public_id, "Image uploaded");
        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_sha256_hex() {
        let signature = sign(&[("folder", "cleaning-photos"), ("timestamp", "1700000000")], "s3cr3t");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        // Deterministic, and sensitive to the secret.
        assert_eq!(
            signature,
            sign(&[("folder", "cleaning-photos"), ("timestamp", "1700000000")], "s3cr3t")
        );
        assert_ne!(
            signature,
            sign(&[("folder", "cleaning-photos"), ("timestamp", "1700000000")], "other")
        );
    }

    #[test]
    fn test_signature_of_empty_params_hashes_secret() {
        // sha256("abc")
        assert_eq!(
            sign(&[], "abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_folder_path_names_match_cloudinary_folders() {
        for folder in [
            UploadFolder::CleaningPhotos,
            UploadFolder::VehiclePhotos,
            UploadFolder::ProfilePhotos,
            UploadFolder::DamageReports,
        ] {
            let parsed: UploadFolder =
                serde_json::from_value(serde_json::json!(folder.as_str())).unwrap();
            assert_eq!(parsed, folder);
        }
        assert!(serde_json::from_value::<UploadFolder>(serde_json::json!("secrets")).is_err());
    }
}
