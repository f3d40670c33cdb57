pub mod epic;
pub mod steam;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::deal::{Deal, Detail, Store};

/// A storefront that can be polled for eligible deals
#[async_trait]
pub trait DealSource: Send + Sync {
    fn store(&self) -> Store;

    /// Fetch every candidate that passes this store's eligibility rule.
    /// Any network or payload failure fails the whole fetch.
    async fn fetch_deals(&self) -> Result<Vec<Deal>>;

    /// Supplementary description and rating for a deal. Stores without a
    /// details API reuse the description carried on the deal.
    async fn details(&self, deal: &Deal) -> Detail {
        Detail {
            description: deal.description.clone().unwrap_or_default(),
            rating: Detail::NO_RATING.to_string(),
        }
    }
}

/// HTTP client shared by the storefront sources
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("dealbot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build storefront HTTP client")
}

/// GET a URL and return the body, failing on non-success status
pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        anyhow::bail!("HTTP {} from {}: {}", status, url, body);
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read response body: {}", url))
}
