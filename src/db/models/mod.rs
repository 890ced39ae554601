pub mod intention;
pub mod redirect;
pub mod statistics;

pub use intention::{IntentionRecord, IntentionStatus};
pub use redirect::RedirectRecord;
pub use statistics::{ActivityChoice, InterruptionRecord, QuickMetrics, TopApp};
