//! Signals the core emits towards the UI layer.

use serde::Serialize;
use tokio::sync::mpsc;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "signals";

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Signal {
    #[serde(rename_all = "camelCase")]
    Detection { app_id: String, display_name: String },
    #[serde(rename_all = "camelCase")]
    TimerTick { app_id: String, seconds_remaining: u32 },
    #[serde(rename_all = "camelCase")]
    TimerComplete {
        app_id: String,
        display_name: String,
        intention: String,
    },
}

impl Signal {
    /// Event name used by host bridges.
    pub fn event_name(&self) -> &'static str {
        match self {
            Signal::Detection { .. } => "app-detected",
            Signal::TimerTick { .. } => "intention-timer-tick",
            Signal::TimerComplete { .. } => "intention-timer-complete",
        }
    }
}

pub trait SignalSink: Send + Sync {
    fn emit(&self, signal: Signal);
}

/// Forwards signals into a tokio channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Signal>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SignalSink for ChannelSink {
    fn emit(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            log_warn!("signal receiver dropped");
        }
    }
}

/// Logs signals and drops them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SignalSink for LogSink {
    fn emit(&self, signal: Signal) {
        log_info!("{} {:?}", signal.event_name(), signal);
    }
}
