use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle, time};
use uuid::Uuid;

use crate::{
    clock::Clock,
    db::{Database, IntentionRecord, IntentionStatus},
    error::{Result, WatchdogError},
    launch::LaunchSequence,
    platform::SessionNotifier,
    signals::{Signal, SignalSink},
    suppression::SuppressionStore,
};

use super::state::{format_remaining, IntentionSnapshot, IntentionState, TickOutcome};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "intention";

use crate::{log_error, log_info, log_warn};

/// Countdown for a user-declared intention. While it runs the target app is
/// exempt from detection.
#[derive(Clone)]
pub struct IntentionTimer {
    state: Arc<Mutex<IntentionState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    suppression: Arc<SuppressionStore>,
    launch: Arc<LaunchSequence>,
    notifier: Arc<dyn SessionNotifier>,
    sink: Arc<dyn SignalSink>,
    db: Database,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
}

impl IntentionTimer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        suppression: Arc<SuppressionStore>,
        launch: Arc<LaunchSequence>,
        notifier: Arc<dyn SessionNotifier>,
        sink: Arc<dyn SignalSink>,
        db: Database,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(IntentionState::new())),
            ticker: Arc::new(Mutex::new(None)),
            suppression,
            launch,
            notifier,
            sink,
            db,
            clock,
            tick_interval,
        }
    }

    pub async fn snapshot(&self) -> IntentionSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Protects `app_id`, launches it and starts counting down. A failed
    /// launch is logged and the countdown runs anyway.
    pub async fn start(
        &self,
        app_id: &str,
        display_name: &str,
        duration_secs: u32,
        intention: &str,
    ) -> Result<IntentionSnapshot> {
        if app_id.trim().is_empty() {
            return Err(WatchdogError::InvalidIntention("app id is empty".into()));
        }
        if duration_secs == 0 {
            return Err(WatchdogError::InvalidIntention(
                "duration must be greater than zero".into(),
            ));
        }
        let intention = intention.trim();
        if intention.is_empty() {
            return Err(WatchdogError::InvalidIntention("intention text is empty".into()));
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = self.clock.now();

        let generation = {
            let mut state = self.state.lock().await;
            if state.is_running() {
                let active = state.app_id.clone().unwrap_or_default();
                return Err(WatchdogError::TimerActive(active));
            }
            let generation = state.begin(
                session_id.clone(),
                app_id,
                display_name,
                intention,
                duration_secs,
                started_at,
            );
            self.suppression.add_active_session(app_id);
            generation
        };

        let record = IntentionRecord {
            id: session_id,
            app_id: app_id.to_string(),
            display_name: display_name.to_string(),
            intention: intention.to_string(),
            duration_secs: u64::from(duration_secs),
            status: IntentionStatus::Running,
            started_at,
            ended_at: None,
            updated_at: started_at,
        };
        if let Err(err) = self.db.insert_intention(&record).await {
            log_error!("{}", WatchdogError::persistence(err));
        }

        // Held until the ticker is spawned so cancel() cannot interleave.
        let mut state = self.state.lock().await;
        if state.generation != generation || !state.is_running() {
            log_info!("intention for {} ended before it was launched", app_id);
            if state.generation == generation {
                // cancel() may have marked the row before it was inserted.
                let now = self.clock.now();
                if let Err(err) = self
                    .db
                    .mark_intention_status(&record.id, IntentionStatus::Cancelled, Some(now), now)
                    .await
                {
                    log_error!("{}", WatchdogError::persistence(err));
                }
            }
            return Ok(state.snapshot());
        }

        match self.launch.launch(app_id) {
            Ok(method) => state.launched_via = Some(method),
            Err(err) => log_warn!("continuing intention without auto-launch: {err}"),
        }

        if let Err(err) = self
            .notifier
            .show_remaining(display_name, &format_remaining(duration_secs))
        {
            log_warn!("failed to show remaining time: {err:#}");
        }

        self.spawn_ticker(generation).await;
        log_info!(
            "intention started for {} ({}s): {}",
            app_id,
            duration_secs,
            intention
        );

        Ok(state.snapshot())
    }

    /// Abandons the running session without a completion signal. No-op when
    /// nothing is running.
    pub async fn cancel(&self) -> Result<()> {
        let (session_id, app_id) = {
            let mut state = self.state.lock().await;
            if !state.is_running() {
                return Ok(());
            }
            state.cancel();
            let app_id = state.app_id.clone().unwrap_or_default();
            self.suppression.remove_active_session(&app_id);
            (state.session_id.clone(), app_id)
        };

        self.cancel_ticker().await;

        if let Err(err) = self.notifier.clear() {
            log_warn!("failed to clear session notification: {err:#}");
        }

        if let Some(session_id) = session_id {
            let now = self.clock.now();
            if let Err(err) = self
                .db
                .mark_intention_status(&session_id, IntentionStatus::Cancelled, Some(now), now)
                .await
            {
                log_error!("{}", WatchdogError::persistence(err));
            }
        }

        log_info!("intention for {} cancelled", app_id);
        Ok(())
    }

    async fn spawn_ticker(&self, generation: u64) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let timer = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval =
                time::interval_at(time::Instant::now() + timer.tick_interval, timer.tick_interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !timer.tick_once(generation).await {
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    /// Returns false once the ticker should stop.
    async fn tick_once(&self, generation: u64) -> bool {
        let (outcome, app_id, display_name, intention, session_id) = {
            let mut state = self.state.lock().await;
            if state.generation != generation || !state.is_running() {
                return false;
            }

            let outcome = state.tick();
            let app_id = state.app_id.clone().unwrap_or_default();
            let display_name = state.display_name.clone().unwrap_or_default();
            let intention = state.intention.clone().unwrap_or_default();

            // Emitted under the state lock so cancel() cannot interleave.
            let remaining = match outcome {
                TickOutcome::Remaining(seconds) => seconds,
                TickOutcome::Completed => 0,
            };
            self.sink.emit(Signal::TimerTick {
                app_id: app_id.clone(),
                seconds_remaining: remaining,
            });

            if outcome == TickOutcome::Completed {
                self.suppression.remove_active_session(&app_id);
                self.sink.emit(Signal::TimerComplete {
                    app_id: app_id.clone(),
                    display_name: display_name.clone(),
                    intention: intention.clone(),
                });
            }

            (outcome, app_id, display_name, intention, state.session_id.clone())
        };

        match outcome {
            TickOutcome::Remaining(seconds) => {
                if let Err(err) = self
                    .notifier
                    .show_remaining(&display_name, &format_remaining(seconds))
                {
                    log_warn!("failed to update remaining time: {err:#}");
                }
                true
            }
            TickOutcome::Completed => {
                log_info!("intention for {} completed", app_id);
                if let Err(err) = self
                    .notifier
                    .show_completion(&app_id, &display_name, &intention)
                {
                    log_warn!("failed to show completion: {err:#}");
                }

                if let Some(session_id) = session_id {
                    let now = self.clock.now();
                    if let Err(err) = self
                        .db
                        .mark_intention_status(
                            &session_id,
                            IntentionStatus::Completed,
                            Some(now),
                            now,
                        )
                        .await
                    {
                        log_error!("{}", WatchdogError::persistence(err));
                    }
                }
                false
            }
        }
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
