use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::cache::DealCache;
use crate::deal::Store;
use crate::platform::{format_announcement, Announcer};
use crate::stores::DealSource;
use crate::summarizer::SummaryService;

/// Outcome of one store's pass within a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct StoreReport {
    pub store: Store,
    pub fetched: usize,
    pub already_posted: usize,
    pub announced: usize,
    pub delivery_failures: usize,
}

impl StoreReport {
    fn new(store: Store) -> Self {
        Self {
            store,
            fetched: 0,
            already_posted: 0,
            announced: 0,
            delivery_failures: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleReport {
    pub cache_reset: bool,
    pub stores: Vec<StoreReport>,
}

impl CycleReport {
    pub fn announced(&self) -> usize {
        self.stores.iter().map(|s| s.announced).sum()
    }
}

/// Drives fetch, dedup and announce across every source.
///
/// Owns the deal cache; nothing else reads or writes it while the bot runs.
pub struct DealBot {
    sources: Vec<Box<dyn DealSource>>,
    summarizer: SummaryService,
    announcer: Box<dyn Announcer>,
    cache: DealCache,
    reset_interval: Option<Duration>,
    last_reset: DateTime<Utc>,
}

impl DealBot {
    pub fn new(
        sources: Vec<Box<dyn DealSource>>,
        summarizer: SummaryService,
        announcer: Box<dyn Announcer>,
        cache: DealCache,
    ) -> Self {
        Self {
            sources,
            summarizer,
            announcer,
            cache,
            reset_interval: None,
            last_reset: Utc::now(),
        }
    }

    /// Clear the whole cache each time `interval` has passed since the last reset
    pub fn with_reset_interval(mut self, interval: Option<Duration>) -> Self {
        self.reset_interval = interval;
        self
    }

    pub fn cache(&self) -> &DealCache {
        &self.cache
    }

    pub fn reset_cache(&mut self) {
        self.reset_cache_at(Utc::now());
    }

    fn reset_cache_at(&mut self, now: DateTime<Utc>) {
        self.cache.reset();
        self.last_reset = now;
    }

    fn reset_due(&self, now: DateTime<Utc>) -> bool {
        let Some(interval) = self.reset_interval else {
            return false;
        };
        match (now - self.last_reset).to_std() {
            Ok(elapsed) => elapsed >= interval,
            Err(_) => false,
        }
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// One full pass: optional reset, every source in order, then persist.
    /// Failures are logged and never abort the cycle.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();

        if self.reset_due(now) {
            info!("Cache reset interval elapsed since {}", self.last_reset);
            self.reset_cache_at(now);
            report.cache_reset = true;
        }

        for source in &self.sources {
            let store_report = process_source(
                source.as_ref(),
                &self.summarizer,
                self.announcer.as_ref(),
                &mut self.cache,
            )
            .await;
            info!(
                "{}: {} eligible, {} already posted, {} announced, {} delivery failures",
                store_report.store,
                store_report.fetched,
                store_report.already_posted,
                store_report.announced,
                store_report.delivery_failures
            );
            report.stores.push(store_report);
        }

        self.cache.persist();
        info!(
            "Cycle finished: {} announced, {} ids cached{}",
            report.announced(),
            self.cache.len(),
            if report.cache_reset { " (cache was reset)" } else { "" }
        );
        report
    }
}

async fn process_source(
    source: &dyn DealSource,
    summarizer: &SummaryService,
    announcer: &dyn Announcer,
    cache: &mut DealCache,
) -> StoreReport {
    let store = source.store();
    let mut report = StoreReport::new(store);

    let deals = match source.fetch_deals().await {
        Ok(deals) => deals,
        Err(e) => {
            error!("Failed to fetch {} deals: {:#}", store, e);
            return report;
        }
    };
    report.fetched = deals.len();

    for deal in deals {
        if cache.contains(store, &deal.id) {
            debug!("Skipping already posted {} deal {}", store, deal.id);
            report.already_posted += 1;
            continue;
        }

        let detail = source.details(&deal).await;
        let summary = summarizer.summarize(&detail.description).await;
        let message = format_announcement(&deal, &detail, &summary);

        match announcer.announce(&message).await {
            Ok(()) => report.announced += 1,
            Err(e) => {
                error!("Failed to announce {} deal {}: {:#}", store, deal.id, e);
                report.delivery_failures += 1;
            }
        }
        // marked even when delivery failed; failed posts are not retried
        cache.insert(store, deal.id);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::temp_cache_path;
    use crate::deal::{Deal, Detail};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FakeSource {
        store: Store,
        deals: Vec<Deal>,
        fail: bool,
    }

    #[async_trait]
    impl DealSource for FakeSource {
        fn store(&self) -> Store {
            self.store
        }

        async fn fetch_deals(&self) -> Result<Vec<Deal>> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.deals.clone())
        }

        async fn details(&self, deal: &Deal) -> Detail {
            Detail {
                description: format!("{} is fun. Play it now. Really.", deal.name),
                rating: "Very Positive".to_string(),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingAnnouncer {
        messages: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingAnnouncer {
        fn count(&self) -> usize {
            self.messages.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn announce(&self, message: &str) -> Result<()> {
            self.messages.lock().unwrap().push(message.to_string());
            if self.fail {
                anyhow::bail!("webhook returned 500");
            }
            Ok(())
        }
    }

    fn steam_deal(id: &str) -> Deal {
        Deal {
            store: Store::Steam,
            id: id.to_string(),
            name: format!("Game {}", id),
            discount_percent: 75,
            final_price: 4.99,
            currency: "USD".to_string(),
            description: None,
        }
    }

    fn source(store: Store, deals: Vec<Deal>) -> Box<dyn DealSource> {
        Box::new(FakeSource {
            store,
            deals,
            fail: false,
        })
    }

    fn bot_with(
        sources: Vec<Box<dyn DealSource>>,
        announcer: &RecordingAnnouncer,
        path: &std::path::Path,
    ) -> DealBot {
        DealBot::new(
            sources,
            SummaryService::local_only(),
            Box::new(announcer.clone()),
            DealCache::load(path),
        )
    }

    #[tokio::test]
    async fn test_first_cycle_announces_and_persists() {
        let path = temp_cache_path();
        let announcer = RecordingAnnouncer::default();
        let mut bot = bot_with(
            vec![
                source(Store::Steam, vec![steam_deal("42")]),
                source(Store::Epic, vec![]),
            ],
            &announcer,
            &path,
        );

        let report = bot.run_cycle().await;
        assert_eq!(report.announced(), 1);
        assert_eq!(announcer.count(), 1);

        let message = announcer.messages.lock().unwrap()[0].clone();
        assert_eq!(
            message,
            "**Game 42** on Steam - 75% off\n\
             Price: 4.99 USD\n\
             Rating: Very Positive\n\
             Summary: Game 42 is fun. Play it now."
        );

        let persisted: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted, serde_json::json!({"Steam": ["42"], "Epic": []}));

        let report = bot.run_cycle().await;
        assert_eq!(report.announced(), 0);
        assert_eq!(report.stores[0].already_posted, 1);
        assert_eq!(announcer.count(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_persisted_cache_survives_restart() {
        let path = temp_cache_path();
        let announcer = RecordingAnnouncer::default();
        let deals = vec![steam_deal("1"), steam_deal("2")];

        let mut first = bot_with(vec![source(Store::Steam, deals.clone())], &announcer, &path);
        first.run_cycle().await;
        assert_eq!(announcer.count(), 2);

        let mut restarted = bot_with(vec![source(Store::Steam, deals)], &announcer, &path);
        restarted.run_cycle().await;
        assert_eq!(announcer.count(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_same_id_in_different_stores_is_distinct() {
        let path = temp_cache_path();
        let announcer = RecordingAnnouncer::default();
        let mut epic = steam_deal("42");
        epic.store = Store::Epic;

        let mut bot = bot_with(
            vec![
                source(Store::Steam, vec![steam_deal("42")]),
                source(Store::Epic, vec![epic]),
            ],
            &announcer,
            &path,
        );
        bot.run_cycle().await;
        assert_eq!(announcer.count(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_stop_other_store() {
        let path = temp_cache_path();
        let announcer = RecordingAnnouncer::default();
        let mut epic = steam_deal("free-game");
        epic.store = Store::Epic;

        let mut bot = bot_with(
            vec![
                Box::new(FakeSource {
                    store: Store::Steam,
                    deals: vec![steam_deal("42")],
                    fail: true,
                }) as Box<dyn DealSource>,
                source(Store::Epic, vec![epic]),
            ],
            &announcer,
            &path,
        );

        let report = bot.run_cycle().await;
        assert_eq!(report.stores[0].fetched, 0);
        assert_eq!(report.stores[1].announced, 1);
        assert!(bot.cache().contains(Store::Epic, "free-game"));
        assert!(!bot.cache().contains(Store::Steam, "42"));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_failed_delivery_still_marks_seen() {
        let path = temp_cache_path();
        let announcer = RecordingAnnouncer {
            fail: true,
            ..Default::default()
        };
        let mut bot = bot_with(
            vec![source(Store::Steam, vec![steam_deal("42")])],
            &announcer,
            &path,
        );

        let report = bot.run_cycle().await;
        assert_eq!(report.stores[0].delivery_failures, 1);
        assert!(bot.cache().contains(Store::Steam, "42"));

        bot.run_cycle().await;
        assert_eq!(announcer.count(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_reset_reannounces() {
        let path = temp_cache_path();
        let announcer = RecordingAnnouncer::default();
        let mut bot = bot_with(
            vec![source(Store::Steam, vec![steam_deal("42")])],
            &announcer,
            &path,
        );

        bot.run_cycle().await;
        bot.reset_cache();
        assert!(!bot.cache().contains(Store::Steam, "42"));

        bot.run_cycle().await;
        assert_eq!(announcer.count(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_reset_interval_elapsed() {
        let path = temp_cache_path();
        let announcer = RecordingAnnouncer::default();
        let mut bot = bot_with(
            vec![source(Store::Steam, vec![steam_deal("42")])],
            &announcer,
            &path,
        )
        .with_reset_interval(Some(Duration::from_secs(3600)));

        let start = Utc::now();
        let report = bot.run_cycle_at(start).await;
        assert!(!report.cache_reset);
        assert_eq!(announcer.count(), 1);

        let report = bot.run_cycle_at(start + chrono::Duration::minutes(30)).await;
        assert!(!report.cache_reset);
        assert_eq!(announcer.count(), 1);

        let report = bot.run_cycle_at(start + chrono::Duration::minutes(61)).await;
        assert!(report.cache_reset);
        assert_eq!(announcer.count(), 2);

        // the interval restarts from the last reset
        let report = bot.run_cycle_at(start + chrono::Duration::minutes(90)).await;
        assert!(!report.cache_reset);
        assert_eq!(announcer.count(), 2);

        std::fs::remove_file(&path).ok();
    }
}
