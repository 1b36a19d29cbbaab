//! Provider license verification
//!
//! Thin client for the payment provider's license API. Used by the
//! subscription endpoints to check a license code against the product it
//! was sold for; the webhook path never calls out here.

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.mayar.id";

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("License API request failed: {0}")]
    Request(String),

    #[error("License API returned status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for LicenseError {
    fn from(err: reqwest::Error) -> Self {
        LicenseError::Request(err.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    license_code: &'a str,
    product_id: &'a str,
}

#[derive(Clone)]
pub struct LicenseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    product_id: String,
}

impl LicenseClient {
    pub fn new(api_key: String, product_id: String) -> Self {
        Self::with_base_url(api_key, product_id, DEFAULT_BASE_URL.to_string())
    }

    /// Base URL injectable so tests can point at a local mock server.
    pub fn with_base_url(api_key: String, product_id: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            product_id,
        }
    }

    /// Ask the provider whether a license code is valid for our product.
    /// Returns the provider's JSON verdict as-is; callers inspect the
    /// fields they care about.
    pub async fn verify(&self, license_code: &str) -> Result<serde_json::Value, LicenseError> {
        let url = format!("{}/saas/v1/license/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&VerifyRequest {
                license_code,
                product_id: &self.product_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                "License verification request rejected"
            );
            return Err(LicenseError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_posts_license_and_product() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/saas/v1/license/verify")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "licenseCode": "LIC-123",
                "productId": "prod-1"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"licenseCode":"LIC-123","isValid":true}"#)
            .create_async()
            .await;

        let client = LicenseClient::with_base_url(
            "test-key".to_string(),
            "prod-1".to_string(),
            server.url(),
        );
        let verdict = client.verify("LIC-123").await.unwrap();

        mock.assert_async().await;
        assert_eq!(verdict["isValid"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_verify_surfaces_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/saas/v1/license/verify")
            .with_status(403)
            .create_async()
            .await;

        let client = LicenseClient::with_base_url(
            "bad-key".to_string(),
            "prod-1".to_string(),
            server.url(),
        );
        let result = client.verify("LIC-123").await;
        assert!(matches!(result, Err(LicenseError::Status(403))));
    }
}
