//! Earth Engine REST client.
//!
//! Sends expression graphs to `v1/projects/{project}/value:compute` and
//! decodes the array of per-image sums. Obtaining the OAuth access token
//! is left to the caller (e.g. `gcloud auth print-access-token`).

use crate::imagery::expression::{region_sum_expression, result_node};
use crate::imagery::{ImageryArchive, RegionQuery};
use crate::models::CampaignError;
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the Earth Engine client.
#[derive(Debug, Clone)]
pub struct EarthEngineConfig {
    pub endpoint: String,
    pub project: String,
    pub access_token: String,
    pub timeout_seconds: u64,
}

impl Default for EarthEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://earthengine.googleapis.com".to_string(),
            project: "earthengine-legacy".to_string(),
            access_token: String::new(),
            timeout_seconds: 300,
        }
    }
}

/// `value:compute` request body.
#[derive(Debug, Serialize)]
struct ComputeValueRequest<'a> {
    expression: &'a Value,
}

/// `value:compute` response body.
#[derive(Debug, Deserialize)]
struct ComputeValueResponse {
    #[serde(default)]
    result: Value,
}

/// Client for the Earth Engine REST API.
pub struct EarthEngineClient {
    config: EarthEngineConfig,
    http_client: reqwest::Client,
}

impl EarthEngineClient {
    /// Create a new client. The access token is sent with every request.
    pub fn new(config: EarthEngineConfig) -> Result<Self> {
        if config.access_token.trim().is_empty() {
            return Err(CampaignError::MissingCredentials.into());
        }

        info!(
            "Initializing Earth Engine client for project {} at {}",
            config.project, config.endpoint
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// URL of the `value:compute` method for the configured project.
    pub fn compute_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/value:compute",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project
        )
    }

    /// Evaluate an expression graph and return its `result` value.
    pub async fn compute_value(&self, expression: &Value) -> Result<Value> {
        let url = self.compute_url();

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&ComputeValueRequest { expression })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to Earth Engine at {}", self.config.endpoint)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CampaignError::Remote { status, body }.into());
        }

        let compute_response: ComputeValueResponse = response
            .json()
            .await
            .context("Failed to parse Earth Engine response")?;

        Ok(compute_response.result)
    }

    async fn fetch_per_image_sums(&self, query: &RegionQuery) -> Result<Vec<f64>> {
        let expression = region_sum_expression(query);
        debug!(
            "Computing {} of {} sums {}..{} over {:?}",
            result_node(&expression)["functionInvocationValue"]["functionName"],
            query.box_size,
            query.start,
            query.end,
            query.bbox
        );

        let result = self.compute_value(&expression).await?;
        parse_sum_array(&result)
    }
}

impl ImageryArchive for EarthEngineClient {
    fn per_image_sums<'a>(&'a self, query: &'a RegionQuery) -> BoxFuture<'a, Result<Vec<f64>>> {
        self.fetch_per_image_sums(query).boxed()
    }
}

/// Decode the aggregated array. Images with a null reduction are skipped.
pub fn parse_sum_array(result: &Value) -> Result<Vec<f64>> {
    match result {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| {
                v.as_f64()
                    .with_context(|| format!("Expected a number in result array, got {}", v))
            })
            .collect(),
        other => anyhow::bail!("Expected an array result, got {}", other),
    }
}
