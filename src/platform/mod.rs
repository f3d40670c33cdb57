pub mod discord;

use anyhow::Result;
use async_trait::async_trait;

use crate::deal::{Deal, Detail};

/// Delivers announcement text to a chat platform
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, message: &str) -> Result<()>;
}

/// Render the announcement for one deal
pub fn format_announcement(deal: &Deal, detail: &Detail, summary: &str) -> String {
    format!(
        "**{}** on {} - {}% off\nPrice: {:.2} {}\nRating: {}\nSummary: {}",
        deal.name,
        deal.store.label(),
        deal.discount_percent,
        deal.final_price,
        deal.currency,
        detail.rating,
        summary
    )
}
