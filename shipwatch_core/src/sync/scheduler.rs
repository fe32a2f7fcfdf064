use crate::store::traits::{ConfigStore, DEFAULT_AUTO_UPDATE_INTERVAL_HOURS};
use crate::sync::traits::SyncPass;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Idle / Armed state behind the scheduler's mutex. `timer` owns the single
/// pending sleep task; arming always cancels any prior one first.
#[derive(Default)]
struct TimerState {
    next_update_time: Option<DateTime<Utc>>,
    timer: Option<JoinHandle<()>>,
}

/// Self-rescheduling driver for the auto-update pass.
///
/// Armed as a single-shot sleep task rather than a self-rescheduling
/// callback; when the timer fires it runs one pass, then unconditionally
/// re-arms. A failing pass is logged and still reschedules. The interval is
/// read fresh from the config store at every computation.
pub struct AutoUpdateScheduler {
    config: Arc<dyn ConfigStore>,
    pass: Arc<dyn SyncPass>,
    state: Mutex<TimerState>,
    cancellations: AtomicU64,
}

impl AutoUpdateScheduler {
    pub fn new(config: Arc<dyn ConfigStore>, pass: Arc<dyn SyncPass>) -> Self {
        Self {
            config,
            pass,
            state: Mutex::new(TimerState::default()),
            cancellations: AtomicU64::new(0),
        }
    }

    /// Arm the timer for `now + interval`. Idempotent: calling again cancels
    /// the pending timer and arms a fresh one, so at most one exists.
    pub async fn start(self: &Arc<Self>) {
        let deadline = Utc::now() + self.interval().await;
        self.arm(deadline).await;
    }

    pub async fn next_update_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.next_update_time
    }

    /// How many pending timers have been cancelled by re-arming.
    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::SeqCst)
    }

    async fn interval(&self) -> Duration {
        let hours = match self.config.auto_update_interval_hours().await {
            Ok(hours) if hours > 0 => hours,
            Ok(_) => DEFAULT_AUTO_UPDATE_INTERVAL_HOURS,
            Err(error) => {
                tracing::warn!(%error, "failed to read auto-update interval, using default");
                DEFAULT_AUTO_UPDATE_INTERVAL_HOURS
            }
        };
        Duration::hours(i64::from(hours))
    }

    async fn arm(self: &Arc<Self>, deadline: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.timer.take() {
            timer.abort();
            self.cancellations.fetch_add(1, Ordering::SeqCst);
        }

        let now = Utc::now();
        // A deadline the process slept through is pushed out a full interval
        // instead of firing in a tight loop.
        let deadline = if deadline <= now {
            now + self.interval().await
        } else {
            deadline
        };

        state.next_update_time = Some(deadline);
        if let Err(error) = self.config.set_next_auto_update(deadline).await {
            tracing::warn!(%error, "failed to persist next update time");
        }

        let delay = (deadline - now).to_std().unwrap_or_default();
        let scheduler = Arc::clone(self);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire().await;
        }));
        tracing::info!(next_update = %deadline, "auto-update timer armed");
    }

    // Returns a boxed `Send` future rather than being an `async fn` to break
    // the mutually recursive async `Send` cycle with `arm` (which spawns a
    // task that re-enters `fire`): erasing `fire`'s opaque future type lets
    // `arm` depend on a concrete `Send` type instead of an opaque one.
    fn fire(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            tracing::info!("auto-update pass starting");
            if let Err(error) = self.pass.run().await {
                tracing::warn!(%error, "auto-update pass failed");
            }

            // This task is the spent timer; drop the handle before re-arming so
            // the cancel-before-arm step does not abort the running task.
            {
                let mut state = self.state.lock().await;
                state.timer = None;
                state.next_update_time = None;
            }
            let deadline = Utc::now() + self.interval().await;
            self.arm(deadline).await;
        })
    }
}
