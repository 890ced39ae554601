pub mod controller;
pub mod state;

pub use controller::IntentionTimer;
pub use state::{format_remaining, IntentionSnapshot, IntentionState, TimerStatus};
