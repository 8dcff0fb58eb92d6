use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::external::FilingSource;
use crate::services::alert_service::AlertService;
use crate::services::anomaly_engine::AnomalyEngine;
use crate::services::composite_engine::CompositeEngine;
use crate::store::TransactionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub filing_source: Arc<dyn FilingSource>,
    pub anomaly_engine: Arc<AnomalyEngine>,
    pub composite_engine: Arc<CompositeEngine>,
    pub alert_service: Arc<AlertService>,
    pub universe: Arc<RwLock<Vec<String>>>,
    pub config: Arc<Config>,
}
