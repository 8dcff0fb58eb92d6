use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;

use insider_sentinel::cli::{Cli, Command};
use insider_sentinel::config::Config;
use insider_sentinel::external::{FilingSource, SecEdgarFilingSource};
use insider_sentinel::logging;
use insider_sentinel::services::alert_service::AlertService;
use insider_sentinel::services::anomaly_engine::AnomalyEngine;
use insider_sentinel::services::composite_engine::CompositeEngine;
use insider_sentinel::services::filing_monitor::{FilingMonitor, FilingMonitorConfig};
use insider_sentinel::services::filing_sentiment::NoopFilingSentimentProvider;
use insider_sentinel::services::job_scheduler::{AppJobScheduler, SchedulerContext};
use insider_sentinel::services::narrator::{LlmNarrator, Narrator, TemplateNarrator};
use insider_sentinel::services::universe;
use insider_sentinel::state::AppState;
use insider_sentinel::store::{PgTransactionStore, TransactionStore};
use insider_sentinel::app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    logging::init_logging(logging::LoggingConfig::from_env())?;

    let config = Config::from_env()?;
    let cli = Cli::parse();

    info!(project = %config.project_name, debug = config.debug, "starting up");

    let pool = PgPoolOptions::new()
        .min_connections(config.postgres_pool_min)
        .max_connections(config.postgres_pool_max)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&config.postgres_dsn())
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<dyn TransactionStore> = Arc::new(PgTransactionStore::new(pool));
    let filing_source = Arc::new(SecEdgarFilingSource::new(config.sec_user_agent.clone(), config.insider_ingest_rate_limit));

    let anomaly_engine = Arc::new(AnomalyEngine::new(store.clone(), config.insider_lookback_days, config.insider_cluster_window_days));

    let narrator: Arc<dyn Narrator> = match &config.openai_api_key {
        Some(key) => Arc::new(LlmNarrator::new(key.clone())),
        None => Arc::new(TemplateNarrator),
    };
    let filing_sentiment = Arc::new(NoopFilingSentimentProvider);
    let composite_engine = Arc::new(CompositeEngine::new(filing_sentiment, narrator));

    let alert_service = Arc::new(AlertService::new(store.clone(), config.insider_anomaly_threshold));

    let universe_tickers = universe::load_universe(&config.data_dir);
    let universe = Arc::new(RwLock::new(universe_tickers));

    let config = Arc::new(config);

    match cli.command {
        Command::Serve => {
            run_server(store, filing_source, anomaly_engine, composite_engine, alert_service, universe, config).await?;
        }
        Command::Ingest { tickers, days_back } => {
            let tickers = if tickers.is_empty() { universe.read().unwrap().clone() } else { tickers };
            let txns = filing_source.batch_fetch(&tickers, days_back, 20).await?;
            let inserted = store.upsert_transactions(&txns).await?;
            info!(tickers = tickers.len(), fetched = txns.len(), new = inserted, "ingest complete");
        }
        Command::Analyze { ticker } => {
            let ticker = ticker.to_uppercase();
            let signal = anomaly_engine.analyze_ticker(&ticker).await?;
            let composed = composite_engine.compose(&ticker, signal).await;
            println!("{}", serde_json::to_string_pretty(&composed)?);
        }
        Command::Scan => {
            let tickers = universe.read().unwrap().clone();
            let mut signals = Vec::with_capacity(tickers.len());
            for ticker in &tickers {
                let signal = anomaly_engine.analyze_ticker(ticker).await?;
                signals.push(composite_engine.compose(ticker, signal).await);
            }
            let actionable = alert_service.evaluate(signals).await?;
            info!(tickers = tickers.len(), actionable = actionable.len(), "scan complete");
        }
        Command::Monitor => {
            let monitor_config = FilingMonitorConfig {
                atom_poll_interval_market: std::time::Duration::from_secs(config.insider_atom_poll_interval_market),
                atom_poll_interval_off: std::time::Duration::from_secs(config.insider_atom_poll_interval_off),
                batch_interval: std::time::Duration::from_secs(config.insider_batch_interval_minutes * 60),
                batch_overlap_hours: config.insider_batch_overlap_hours,
                filings_per_ticker: 20,
            };
            let mut monitor = FilingMonitor::new(store, filing_source, universe.read().unwrap().clone(), monitor_config);
            monitor.start();
            tokio::signal::ctrl_c().await?;
            monitor.stop().await;
        }
        Command::Alerts { limit } => {
            let alerts = alert_service.get_active_alerts(limit).await?;
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        Command::UniverseRefresh => {
            let reloaded = universe::load_universe(&config.data_dir);
            info!(count = reloaded.len(), "universe reloaded");
            *universe.write().unwrap() = reloaded;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_server(
    store: Arc<dyn TransactionStore>,
    filing_source: Arc<SecEdgarFilingSource>,
    anomaly_engine: Arc<AnomalyEngine>,
    composite_engine: Arc<CompositeEngine>,
    alert_service: Arc<AlertService>,
    universe: Arc<RwLock<Vec<String>>>,
    config: Arc<Config>,
) -> Result<(), Box<dyn std::error::Error>> {
    let monitor_config = FilingMonitorConfig {
        atom_poll_interval_market: std::time::Duration::from_secs(config.insider_atom_poll_interval_market),
        atom_poll_interval_off: std::time::Duration::from_secs(config.insider_atom_poll_interval_off),
        batch_interval: std::time::Duration::from_secs(config.insider_batch_interval_minutes * 60),
        batch_overlap_hours: config.insider_batch_overlap_hours,
        filings_per_ticker: 20,
    };
    let mut monitor = FilingMonitor::new(store.clone(), filing_source.clone(), universe.read().unwrap().clone(), monitor_config);
    monitor.start();

    let mut scheduler = AppJobScheduler::new().await?;
    scheduler
        .start(SchedulerContext {
            data_dir: config.data_dir.clone(),
            universe: universe.clone(),
            anomaly_engine: anomaly_engine.clone(),
            composite_engine: composite_engine.clone(),
            alert_service: alert_service.clone(),
        })
        .await?;

    let state = AppState { store, filing_source, anomaly_engine, composite_engine, alert_service, universe, config };

    let app = app::create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = TcpListener::bind(&addr).await?;
    info!("insider sentinel running at http://{}/", addr);
    axum::serve(listener, app).await?;

    monitor.stop().await;
    Ok(())
}
