use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{get_text, DealSource};
use crate::deal::{Deal, Store};

const PROMOTIONS_URL: &str = "https://store-site-backend-static.ak.epicgames.com/freeGamesPromotions?locale=en-US&country=US&allowCountries=US";

#[derive(Debug, Deserialize)]
struct PromotionsResponse {
    #[serde(default)]
    data: Option<PromotionsData>,
}

#[derive(Debug, Deserialize)]
struct PromotionsData {
    #[serde(rename = "Catalog", default)]
    catalog: Option<Catalog>,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(rename = "searchStore", default)]
    search_store: Option<SearchStore>,
}

#[derive(Debug, Deserialize)]
struct SearchStore {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    #[serde(rename = "totalPrice", default)]
    total_price: Option<TotalPrice>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TotalPrice {
    #[serde(default)]
    original_price: i64,
    /// Defaults to the original price when absent
    #[serde(default)]
    discount_price: Option<i64>,
    #[serde(default)]
    currency_code: Option<String>,
}

/// Discount percent for an Epic listing, or None when it is not cheap
/// enough to announce. Prices are in cents.
///
/// Eligible when the sale price is at most half the original or zero. A
/// zero original price counts as 100% off only when the sale price is zero
/// too; a price above a zero original is malformed and skipped.
pub fn discount_percent(original: i64, discount: i64) -> Option<i64> {
    if original == 0 {
        return (discount == 0).then_some(100);
    }
    if discount == 0 || discount * 2 <= original {
        Some(100 - (discount * 100).div_euclid(original))
    } else {
        None
    }
}

/// Parse the free-games-promotions payload into eligible deals
pub fn parse_promotions(body: &str) -> Result<Vec<Deal>> {
    let response: PromotionsResponse =
        serde_json::from_str(body).context("Failed to parse Epic promotions")?;
    let elements = response
        .data
        .and_then(|d| d.catalog)
        .and_then(|c| c.search_store)
        .map(|s| s.elements)
        .unwrap_or_default();
    let total = elements.len();

    let mut deals = Vec::new();
    for element in elements {
        let Some(id) = element.id else {
            debug!("Skipping Epic element without id: {}", element.title);
            continue;
        };
        let price = element
            .price
            .and_then(|p| p.total_price)
            .unwrap_or_default();
        let discount = price.discount_price.unwrap_or(price.original_price);

        let Some(percent) = discount_percent(price.original_price, discount) else {
            continue;
        };

        deals.push(Deal {
            store: Store::Epic,
            id,
            name: element.title,
            discount_percent: percent,
            final_price: discount as f64 / 100.0,
            currency: price.currency_code.unwrap_or_else(|| "USD".to_string()),
            description: element.description,
        });
    }

    debug!("Epic promotions: {} of {} elements eligible", deals.len(), total);
    Ok(deals)
}

pub struct EpicSource {
    client: reqwest::Client,
}

impl EpicSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DealSource for EpicSource {
    fn store(&self) -> Store {
        Store::Epic
    }

    async fn fetch_deals(&self) -> Result<Vec<Deal>> {
        info!("Fetching Epic Games deals");
        let body = get_text(&self.client, PROMOTIONS_URL).await?;
        parse_promotions(&body)
    }
}
