use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use crate::bot::DealBot;

/// Runs a deal cycle on a fixed period. The first tick comes one period
/// after `start`; callers run the initial cycle themselves.
pub struct CycleScheduler {
    jobs: JobScheduler,
    every: Duration,
}

impl CycleScheduler {
    pub async fn start(bot: Arc<Mutex<DealBot>>, every: Duration) -> Result<Self> {
        let jobs = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;

        let cycle = Job::new_repeated_async(every, move |_uuid, _lock| {
            let bot = bot.clone();
            Box::pin(async move {
                // a cycle still running holds the lock, so ticks queue up
                let report = bot.lock().await.run_cycle().await;
                debug!("Scheduled cycle announced {} deal(s)", report.announced());
            })
        })
        .context("Failed to create deal cycle job")?;

        jobs.add(cycle)
            .await
            .context("Failed to add deal cycle job")?;
        jobs.start().await.context("Failed to start scheduler")?;

        info!("Deal cycle scheduled every {:?}", every);
        Ok(Self { jobs, every })
    }

    pub fn period(&self) -> Duration {
        self.every
    }

    /// Stop issuing ticks. A cycle already running is not interrupted.
    pub async fn stop(mut self) -> Result<()> {
        self.jobs
            .shutdown()
            .await
            .context("Failed to shut down scheduler")?;
        info!("Deal cycle scheduler stopped");
        Ok(())
    }
}
