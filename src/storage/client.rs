use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::{AppError, StorageError};
use crate::storage::{ImageStorage, StoredImage};

const PUBLIC_ID_LENGTH: usize = 20;

/// REST client for the hosted image store. Requests are authenticated with
/// the account api_key plus a sha256 signature over the signed parameters
/// and the api_secret, the provider's server-to-server scheme.
pub struct CloudStorageClient {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudStorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn fresh_public_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PUBLIC_ID_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Signature over the alphabetically ordered signed parameters, with the
    /// api_secret appended, hex-encoded.
    fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort_by_key(|(name, _)| *name);

        let joined = sorted
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ImageStorage for CloudStorageClient {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<StoredImage, AppError> {
        let public_id = Self::fresh_public_id();
        let timestamp = Utc::now().timestamp().to_string();
        let signature = Self::sign(
            &[("public_id", &public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let file = format!("data:{};base64,{}", content_type, BASE64.encode(&data));
        let url = format!("{}/{}/image/upload", self.base_url, self.cloud_name);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("file", file.as_str()),
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed(format!("{}: {}", status, body)).into());
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        info!("Uploaded image {} to storage provider", uploaded.public_id);

        Ok(StoredImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), AppError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = Self::sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let url = format!("{}/{}/image/destroy", self.base_url, self.cloud_name);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::DeleteFailed(format!("{}: {}", status, body)).into());
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        // The provider reports "not found" for an already-deleted asset;
        // the row is gone either way.
        if destroyed.result != "ok" {
            warn!("Storage delete for {} returned: {}", public_id, destroyed.result);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_order_independent() {
        let a = CloudStorageClient::sign(
            &[("public_id", "abc"), ("timestamp", "1700000000")],
            "secret",
        );
        let b = CloudStorageClient::sign(
            &[("timestamp", "1700000000"), ("public_id", "abc")],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_depends_on_secret_and_params() {
        let base = CloudStorageClient::sign(&[("public_id", "abc")], "secret");
        let other_secret = CloudStorageClient::sign(&[("public_id", "abc")], "other");
        let other_param = CloudStorageClient::sign(&[("public_id", "abd")], "secret");
        assert_ne!(base, other_secret);
        assert_ne!(base, other_param);
    }

    #[test]
    fn test_fresh_public_ids_are_unique() {
        let a = CloudStorageClient::fresh_public_id();
        let b = CloudStorageClient::fresh_public_id();
        assert_eq!(a.len(), PUBLIC_ID_LENGTH);
        assert_ne!(a, b);
    }
}
