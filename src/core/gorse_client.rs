use crate::config::GorseConfig;
use crate::domain::model::Recommendation;
use crate::utils::error::{EtlError, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "X-API-Key";

const BODY_PREVIEW_CHARS: usize = 200;

pub fn body_preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Thin wrapper over the Gorse REST API. Every call is a single request;
/// nothing is retried here.
#[derive(Debug, Clone)]
pub struct GorseClient {
    client: Client,
    config: GorseConfig,
}

impl GorseClient {
    pub fn new(config: GorseConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|e| EtlError::ConfigError {
            message: format!("api_key is not a valid header value: {}", e),
        })?;
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GorseConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn ensure_ok(response: Response) -> Result<Response> {
        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(EtlError::HttpStatusError { status, body })
    }

    /// `GET /items?n=1`, used only to see whether the server answers.
    pub async fn check_connection(&self) -> Result<()> {
        let url = self.url("items?n=1");
        tracing::debug!("📡 Probing {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            EtlError::ConnectionError {
                message: e.to_string(),
            }
        })?;

        Self::ensure_ok(response).await.map_err(|e| match e {
            EtlError::HttpStatusError { status, body } => EtlError::ConnectionError {
                message: format!("status {}: {}", status, body_preview(&body)),
            },
            other => other,
        })?;
        Ok(())
    }

    /// Sends one batch as a JSON array. Only a 200 response is success.
    pub async fn send_batch<T: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        batch: &[T],
    ) -> Result<Response> {
        let response = self
            .client
            .request(method, self.url(path))
            .json(batch)
            .send()
            .await?;
        Self::ensure_ok(response).await
    }

    /// `POST /train` with no body.
    pub async fn trigger_training(&self) -> Result<()> {
        let response = self.client.post(self.url("train")).send().await?;
        Self::ensure_ok(response).await?;
        Ok(())
    }

    /// `GET /recommend/{user_id}?n={count}`.
    pub async fn recommend(&self, user_id: &str, count: usize) -> Result<Vec<Recommendation>> {
        let url = self.url(&format!("recommend/{}?n={}", user_id, count));
        tracing::debug!("📡 Requesting {}", url);

        let response = self.client.get(&url).send().await?;
        let response = Self::ensure_ok(response).await?;
        let recommendations = response.json::<Option<Vec<Recommendation>>>().await?;
        Ok(recommendations.unwrap_or_default())
    }
}
