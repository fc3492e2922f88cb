use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A cancellable scheduled task standing in for push delivery.
///
/// Explicit start/stop contract: [`Poller::start`] spawns the loop,
/// [`Poller::stop`] cancels it and waits for the task to finish. Dropping a
/// running poller also signals it to stop, so a poller bound to a view scope
/// cannot outlive it and keep updating torn-down state.
pub struct Poller {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawns a loop that awaits `tick` once per `period`. The first tick
    /// fires one full period after start, matching a plain repeating timer.
    pub fn start<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval yields immediately on its first tick; consume it so
            // the first poll happens at start + period.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => tick().await,
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(event_name = "poller.stopped", name, "poller loop ended");
        });

        debug!(event_name = "poller.started", name, period_secs = period.as_secs(), "poller started");
        Self { name, stop_tx, handle: Some(handle) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signals the loop to stop and waits for it to finish. No tick fires
    /// after this returns.
    pub async fn stop(mut self) {
        self.signal();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    fn signal(&self) {
        let _ = self.stop_tx.send(true);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.signal();
    }
}
