use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::Announcer;

/// Discord rejects webhook content longer than this
pub const MAX_CONTENT_LEN: usize = 2000;

/// Cut `text` into pieces of at most `limit` bytes. A piece ends after
/// the last newline in its window, else after the last space, else at
/// the window edge (moved back onto a char boundary).
fn chunk_content(text: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while rest.len() > limit {
        let mut edge = limit;
        while !rest.is_char_boundary(edge) {
            edge -= 1;
        }
        if edge == 0 {
            // window narrower than the next char
            edge = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let window = &rest[..edge];
        let cut = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(pos) => pos + 1,
            None => edge,
        };
        let (piece, tail) = rest.split_at(cut);
        pieces.push(piece);
        rest = tail;
    }
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest);
    }
    pieces
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts announcements to a Discord webhook. Without a URL every
/// announcement is skipped with a warning.
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: Option<String>,
}

impl DiscordWebhook {
    pub fn new(url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client, url })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn post(&self, url: &str, content: &str) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(&WebhookPayload { content })
            .send()
            .await
            .context("Error posting to Discord")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to post to Discord ({}): {}", status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl Announcer for DiscordWebhook {
    async fn announce(&self, message: &str) -> Result<()> {
        let Some(url) = self.url.as_deref() else {
            warn!("DISCORD_WEBHOOK_URL not set; skipping Discord notification");
            return Ok(());
        };

        let chunks = chunk_content(message, MAX_CONTENT_LEN);
        debug!("Posting announcement in {} chunk(s)", chunks.len());
        for chunk in chunks {
            self.post(url, chunk).await?;
        }
        Ok(())
    }
}
