//! Ambient housekeeping jobs: universe refresh and the hourly scan-and-alert
//! sweep. Grounded on the teacher's `job_scheduler_service.rs` (`JobScheduler`
//! setup, `Job::new_async` closures, cron schedule registration), simplified
//! since this system has no job-run-history table to write to.

use std::sync::{Arc, RwLock};

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::errors::AppError;
use crate::services::alert_service::AlertService;
use crate::services::anomaly_engine::AnomalyEngine;
use crate::services::composite_engine::CompositeEngine;
use crate::services::universe;

#[derive(Clone)]
pub struct SchedulerContext {
    pub data_dir: String,
    pub universe: Arc<RwLock<Vec<String>>>,
    pub anomaly_engine: Arc<AnomalyEngine>,
    pub composite_engine: Arc<CompositeEngine>,
    pub alert_service: Arc<AlertService>,
}

pub struct AppJobScheduler {
    scheduler: JobScheduler,
}

impl AppJobScheduler {
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("failed to create job scheduler: {e}")))?;
        Ok(Self { scheduler })
    }

    pub async fn start(&mut self, ctx: SchedulerContext) -> Result<(), AppError> {
        self.schedule_universe_refresh(&ctx).await?;
        self.schedule_scan_and_alert_sweep(&ctx).await?;

        self.scheduler.start().await.map_err(|e| AppError::External(format!("failed to start job scheduler: {e}")))?;
        info!("job scheduler started");
        Ok(())
    }

    async fn schedule_universe_refresh(&mut self, ctx: &SchedulerContext) -> Result<(), AppError> {
        let data_dir = ctx.data_dir.clone();
        let universe = ctx.universe.clone();

        let job = Job::new_async("0 0 3 * * *", move |_uuid, _l| {
            let data_dir = data_dir.clone();
            let universe = universe.clone();
            Box::pin(async move {
                info!("running universe refresh job");
                let loaded = universe::load_universe(&data_dir);
                *universe.write().unwrap() = loaded;
            })
        })
        .map_err(|e| AppError::External(format!("failed to create universe refresh job: {e}")))?;

        self.scheduler.add(job).await.map_err(|e| AppError::External(e.to_string()))?;
        info!("scheduled universe refresh: daily at 03:00");
        Ok(())
    }

    async fn schedule_scan_and_alert_sweep(&mut self, ctx: &SchedulerContext) -> Result<(), AppError> {
        let universe = ctx.universe.clone();
        let anomaly_engine = ctx.anomaly_engine.clone();
        let composite_engine = ctx.composite_engine.clone();
        let alert_service = ctx.alert_service.clone();

        let job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let universe = universe.clone();
            let anomaly_engine = anomaly_engine.clone();
            let composite_engine = composite_engine.clone();
            let alert_service = alert_service.clone();
            Box::pin(async move {
                if let Err(e) = run_scan_and_alert_sweep(&universe, &anomaly_engine, &composite_engine, &alert_service).await {
                    error!(error = %e, "scan-and-alert sweep failed");
                }
            })
        })
        .map_err(|e| AppError::External(format!("failed to create scan sweep job: {e}")))?;

        self.scheduler.add(job).await.map_err(|e| AppError::External(e.to_string()))?;
        info!("scheduled scan-and-alert sweep: hourly at :00");
        Ok(())
    }
}

async fn run_scan_and_alert_sweep(
    universe: &Arc<RwLock<Vec<String>>>,
    anomaly_engine: &Arc<AnomalyEngine>,
    composite_engine: &Arc<CompositeEngine>,
    alert_service: &Arc<AlertService>,
) -> Result<(), AppError> {
    let tickers: Vec<String> = universe.read().unwrap().clone();
    let mut signals = Vec::with_capacity(tickers.len());

    for ticker in &tickers {
        let signal = anomaly_engine.analyze_ticker(ticker).await?;
        let composed = composite_engine.compose(ticker, signal).await;
        signals.push(composed);
    }

    let actionable = alert_service.evaluate(signals).await?;
    info!(tickers = tickers.len(), actionable = actionable.len(), "scan-and-alert sweep complete");
    Ok(())
}
