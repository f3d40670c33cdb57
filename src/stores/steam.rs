use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info};

use super::{get_text, DealSource};
use crate::deal::{Deal, Detail, Store};

const STORE_BASE_URL: &str = "https://store.steampowered.com";

/// Minimum discount for a paid Steam title to be announced
pub const MIN_DISCOUNT_PERCENT: i64 = 50;

#[derive(Debug, Deserialize)]
struct FeaturedCategories {
    #[serde(default)]
    specials: Option<Specials>,
}

#[derive(Debug, Deserialize)]
struct Specials {
    #[serde(default)]
    items: Vec<SpecialItem>,
}

#[derive(Debug, Deserialize)]
struct SpecialItem {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    discount_percent: i64,
    /// Price in cents; absent means unknown, not free
    #[serde(default)]
    final_price: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsEntry {
    #[serde(default)]
    data: Option<AppData>,
}

#[derive(Debug, Deserialize)]
struct AppData {
    #[serde(default)]
    short_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewsResponse {
    #[serde(default)]
    query_summary: Option<QuerySummary>,
}

#[derive(Debug, Deserialize)]
struct QuerySummary {
    #[serde(default)]
    review_score_desc: Option<String>,
}

/// A Steam special is worth announcing when it is at least half off or free
pub fn is_eligible(discount_percent: i64, final_price_cents: Option<i64>) -> bool {
    discount_percent >= MIN_DISCOUNT_PERCENT || final_price_cents == Some(0)
}

/// Parse the featured-categories payload into eligible deals
pub fn parse_specials(body: &str) -> Result<Vec<Deal>> {
    let featured: FeaturedCategories =
        serde_json::from_str(body).context("Failed to parse Steam specials")?;
    let items = featured.specials.map(|s| s.items).unwrap_or_default();
    let total = items.len();

    let deals: Vec<Deal> = items
        .into_iter()
        .filter(|item| is_eligible(item.discount_percent, item.final_price))
        .map(|item| Deal {
            store: Store::Steam,
            id: item.id.to_string(),
            name: item.name,
            discount_percent: item.discount_percent,
            final_price: item.final_price.unwrap_or(0) as f64 / 100.0,
            currency: item.currency.unwrap_or_else(|| "USD".to_string()),
            description: None,
        })
        .collect();

    debug!("Steam specials: {} of {} items eligible", deals.len(), total);
    Ok(deals)
}

/// Extract `short_description` for `app_id` from an appdetails payload
pub fn parse_description(body: &str, app_id: &str) -> Result<String> {
    let entries: HashMap<String, AppDetailsEntry> =
        serde_json::from_str(body).context("Failed to parse Steam app details")?;
    let data = entries
        .get(app_id)
        .and_then(|entry| entry.data.as_ref())
        .with_context(|| format!("No app details returned for {}", app_id))?;
    Ok(data.short_description.clone().unwrap_or_default())
}

/// Extract the review summary label from an appreviews payload
pub fn parse_rating(body: &str) -> Result<String> {
    let reviews: ReviewsResponse =
        serde_json::from_str(body).context("Failed to parse Steam reviews")?;
    Ok(reviews
        .query_summary
        .and_then(|q| q.review_score_desc)
        .unwrap_or_else(|| Detail::UNKNOWN_RATING.to_string()))
}

pub struct SteamSource {
    client: reqwest::Client,
    base_url: String,
}

impl SteamSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, STORE_BASE_URL)
    }

    /// Point every Steam endpoint at another host, e.g. a mirror
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_description(&self, app_id: &str) -> Result<String> {
        let url = format!("{}/api/appdetails?appids={}&l=en", self.base_url, app_id);
        let body = get_text(&self.client, &url).await?;
        parse_description(&body, app_id)
    }

    async fn fetch_rating(&self, app_id: &str) -> Result<String> {
        let url = format!(
            "{}/appreviews/{}?json=1&language=all&purchase_type=all",
            self.base_url, app_id
        );
        let body = get_text(&self.client, &url).await?;
        parse_rating(&body)
    }
}

#[async_trait]
impl DealSource for SteamSource {
    fn store(&self) -> Store {
        Store::Steam
    }

    async fn fetch_deals(&self) -> Result<Vec<Deal>> {
        info!("Fetching Steam specials");
        let url = format!("{}/api/featuredcategories", self.base_url);
        let body = get_text(&self.client, &url).await?;
        parse_specials(&body)
    }

    /// Description and rating are fetched independently; either one
    /// degrades to its default without affecting the other.
    async fn details(&self, deal: &Deal) -> Detail {
        let description = match self.fetch_description(&deal.id).await {
            Ok(description) => description,
            Err(e) => {
                error!("Failed to fetch details for {}: {:#}", deal.id, e);
                String::new()
            }
        };
        let rating = match self.fetch_rating(&deal.id).await {
            Ok(rating) => rating,
            Err(e) => {
                error!("Failed to fetch reviews for {}: {:#}", deal.id, e);
                Detail::UNKNOWN_RATING.to_string()
            }
        };
        Detail {
            description,
            rating,
        }
    }
}
