use std::sync::Arc;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    config::WatchdogConfig,
    db::{Database, RedirectRecord},
    dispatch::{DispatchRequest, RedirectDispatcher},
    error::WatchdogError,
    platform::UsageEventSource,
    registry::WatchedAppRegistry,
    signals::{Signal, SignalSink},
    suppression::SuppressionStore,
};

use super::detector::{Detection, Detector};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "watchdog";

use crate::{log_debug, log_error, log_info, log_warn};

/// Everything the detection loop reads or writes.
#[derive(Clone)]
pub struct DetectionContext {
    pub config: WatchdogConfig,
    pub source: Arc<dyn UsageEventSource>,
    pub registry: Arc<WatchedAppRegistry>,
    pub suppression: Arc<SuppressionStore>,
    pub db: Database,
    pub dispatcher: Arc<RedirectDispatcher>,
    pub sink: Arc<dyn SignalSink>,
}

pub(crate) async fn detection_loop(ctx: DetectionContext, cancel_token: CancellationToken) {
    let mut ticker = time::interval(ctx.config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut detector = Detector::new(ctx.registry.clone(), ctx.config.dedup_window());

    log_info!(
        "detection loop started (tick {}ms, window {}ms)",
        ctx.config.tick_interval_ms,
        ctx.config.query_window_ms
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_tick(&ctx, &mut detector, &cancel_token).await {
                    Ok(()) => {}
                    Err(WatchdogError::QueryFailed(reason)) => {
                        log_warn!("usage query failed, retrying next tick: {}", reason);
                    }
                    Err(err) => log_error!("detection tick failed: {err}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("detection loop shutting down");
                break;
            }
        }
    }
}

async fn run_tick(
    ctx: &DetectionContext,
    detector: &mut Detector,
    cancel_token: &CancellationToken,
) -> Result<(), WatchdogError> {
    let now = ctx.suppression.now();
    let start = now - ctx.config.query_window();
    let source = ctx.source.clone();
    let query_started = Instant::now();

    let query = tokio::task::spawn_blocking(move || source.query_events(start, now));
    let events = tokio::select! {
        joined = query => joined
            .map_err(|err| WatchdogError::QueryFailed(format!("query task failed: {err}")))??,
        _ = cancel_token.cancelled() => return Ok(()),
    };

    let elapsed = query_started.elapsed();
    if elapsed > ctx.config.tick_interval() {
        log_warn!("usage query took {}ms, longer than one tick", elapsed.as_millis());
    }

    let Some(detection) = detector.evaluate(&events, &ctx.suppression, now) else {
        return Ok(());
    };

    log_info!("detected {} ({})", detection.display_name, detection.app_id);
    persist_redirect(&ctx.db, &detection).await;

    tokio::select! {
        _ = time::sleep(ctx.config.dispatch_delay()) => {}
        _ = cancel_token.cancelled() => {
            log_debug!("stopped before dispatching {}", detection.app_id);
            return Ok(());
        }
    }

    let request = DispatchRequest {
        app_id: detection.app_id.clone(),
        display_name: detection.display_name.clone(),
        detected_at: detection.detected_at,
    };
    let outcome = ctx.dispatcher.dispatch(&request);
    log_debug!("dispatch outcome for {}: {:?}", detection.app_id, outcome);

    ctx.sink.emit(Signal::Detection {
        app_id: detection.app_id,
        display_name: detection.display_name,
    });

    Ok(())
}

async fn persist_redirect(db: &Database, detection: &Detection) {
    let record = RedirectRecord::new(
        detection.app_id.clone(),
        detection.display_name.clone(),
        detection.detected_at,
    );

    if let Err(err) = db.put_redirect_record(&record).await {
        log_error!("{}", WatchdogError::persistence(err));
    }
}
