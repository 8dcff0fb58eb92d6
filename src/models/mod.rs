pub mod insider_alert;
pub mod insider_anomaly;
pub mod insider_profile;
pub mod insider_signal;
pub mod transaction;

pub use insider_alert::InsiderAlert;
pub use insider_anomaly::{AnomalyType, InsiderAnomaly};
pub use insider_profile::InsiderProfile;
pub use insider_signal::{InsiderSentiment, InsiderSignal};
pub use transaction::{InsiderTransaction, TransactionCode};