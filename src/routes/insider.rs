use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{InsiderAlert, InsiderAnomaly, InsiderProfile, InsiderSignal};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingest", post(ingest_form4))
        .route("/anomalies/:ticker", get(get_ticker_anomalies))
        .route("/anomalies", get(get_all_anomalies))
        .route("/profile/:ticker/:insider_name", get(get_insider_profile))
        .route("/signal/:ticker", get(get_ticker_signal))
        .route("/alerts", get(get_alerts))
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    #[serde(default)]
    tickers: Vec<String>,
    #[serde(default = "default_days_back")]
    days_back: i64,
}

fn default_days_back() -> i64 {
    90
}

#[derive(Debug, serde::Serialize)]
struct IngestResponse {
    tickers: usize,
    fetched: usize,
    new: u64,
}

/// Triggers Form 4 ingestion for the given tickers, or the full universe when none are given.
async fn ingest_form4(State(state): State<AppState>, body: Option<Json<IngestRequest>>) -> Result<Json<IngestResponse>, AppError> {
    let request = body.map(|b| b.0).unwrap_or(IngestRequest { tickers: vec![], days_back: default_days_back() });

    let tickers = if request.tickers.is_empty() {
        state.universe.read().unwrap().clone()
    } else {
        request.tickers
    };

    let txns = state.filing_source.batch_fetch(&tickers, request.days_back, 20).await?;
    let fetched = txns.len();
    let inserted = state.store.upsert_transactions(&txns).await?;

    info!(tickers = tickers.len(), fetched, new = inserted, "ingest complete");
    Ok(Json(IngestResponse { tickers: tickers.len(), fetched, new: inserted }))
}

async fn get_ticker_anomalies(State(state): State<AppState>, Path(ticker): Path<String>) -> Result<Json<Vec<InsiderAnomaly>>, AppError> {
    let anomalies = state.store.get_anomalies(Some(&ticker.to_uppercase()), 0.0, 1000).await?;
    Ok(Json(anomalies))
}

#[derive(Debug, Deserialize)]
struct AnomalyQuery {
    #[serde(default)]
    min_score: f64,
    #[serde(default = "default_anomaly_limit")]
    limit: i64,
}

fn default_anomaly_limit() -> i64 {
    100
}

async fn get_all_anomalies(State(state): State<AppState>, Query(query): Query<AnomalyQuery>) -> Result<Json<Vec<InsiderAnomaly>>, AppError> {
    let anomalies = state.store.get_anomalies(None, query.min_score, query.limit).await?;
    Ok(Json(anomalies))
}

async fn get_insider_profile(
    State(state): State<AppState>,
    Path((ticker, insider_name)): Path<(String, String)>,
) -> Result<Json<InsiderProfile>, AppError> {
    let profile = state.store.get_profile(&ticker.to_uppercase(), &insider_name).await?;
    profile.map(Json).ok_or(AppError::NotFound)
}

/// Runs anomaly analysis and returns the composite alpha signal, tolerating
/// the absence of filing-sentiment data.
async fn get_ticker_signal(State(state): State<AppState>, Path(ticker): Path<String>) -> Result<Json<InsiderSignal>, AppError> {
    let ticker = ticker.to_uppercase();
    let signal = state.anomaly_engine.analyze_ticker(&ticker).await?;
    let composed = state.composite_engine.compose(&ticker, signal).await;
    Ok(Json(composed))
}

#[derive(Debug, Deserialize)]
struct AlertQuery {
    #[serde(default = "default_alert_limit")]
    limit: i64,
}

fn default_alert_limit() -> i64 {
    50
}

async fn get_alerts(State(state): State<AppState>, Query(query): Query<AlertQuery>) -> Result<Json<Vec<InsiderAlert>>, AppError> {
    let alerts = state.alert_service.get_active_alerts(query.limit).await?;
    Ok(Json(alerts))
}
