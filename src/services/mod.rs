pub mod alert_service;
pub mod anomaly_engine;
pub mod composite_engine;
pub mod filing_monitor;
pub mod filing_sentiment;
pub mod isolation_forest;
pub mod job_scheduler;
pub mod narrator;
pub mod rate_limiter;
pub mod universe;
