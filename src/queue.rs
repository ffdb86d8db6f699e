//! Queue delivery options and the background listener.

use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};
use typedkv_core::Key;
use typedkv_store::Store;

/// How long a listener blocks in the store per poll. Short enough that a
/// stop request is noticed promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Delivery options for an enqueue.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Hold the message back this long before first delivery.
    pub delay: Option<Duration>,
    /// Keys to write the payload into if delivery ultimately fails.
    pub keys_if_undelivered: Vec<Key>,
    /// Redelivery delays, tried in order; `None` uses the store default.
    pub backoff_schedule: Option<Vec<Duration>>,
}

impl EnqueueOptions {
    /// Hold the message back before first delivery.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Write the payload to these keys if every delivery attempt fails.
    pub fn keys_if_undelivered(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.keys_if_undelivered = keys.into_iter().collect();
        self
    }

    /// Override the redelivery schedule. An empty schedule means a single
    /// delivery attempt.
    pub fn backoff_schedule(mut self, schedule: impl IntoIterator<Item = Duration>) -> Self {
        self.backoff_schedule = Some(schedule.into_iter().collect());
        self
    }
}

/// A running queue listener.
///
/// The handler runs on a dedicated thread. Dropping the listener (or calling
/// [`stop`](QueueListener::stop)) asks the thread to finish its current
/// message and exit, then joins it.
pub struct QueueListener {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl QueueListener {
    pub(crate) fn spawn<M, F>(store: Arc<dyn Store>, mut handler: F) -> Self
    where
        M: DeserializeOwned + Send + 'static,
        F: FnMut(M) -> typedkv_core::Result<()> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = std::thread::spawn(move || {
            debug!(target: "typedkv::queue", "Queue listener started");
            while !stop_flag.load(Ordering::Relaxed) {
                let message = match store.queue_next(POLL_INTERVAL) {
                    Ok(Some(message)) => message,
                    Ok(None) => continue,
                    Err(err) => {
                        warn!(target: "typedkv::queue", error = %err, "Queue poll failed");
                        break;
                    }
                };
                let handled = match message.decode::<M>() {
                    Ok(decoded) => match handler(decoded) {
                        Ok(()) => true,
                        Err(err) => {
                            warn!(
                                target: "typedkv::queue",
                                attempt = message.attempt,
                                error = %err,
                                "Queue handler failed"
                            );
                            false
                        }
                    },
                    Err(err) => {
                        warn!(
                            target: "typedkv::queue",
                            attempt = message.attempt,
                            error = %err,
                            "Queue message failed to decode"
                        );
                        false
                    }
                };
                if let Err(err) = store.queue_finish(message.id, handled) {
                    warn!(target: "typedkv::queue", error = %err, "Queue finish failed");
                }
            }
            debug!(target: "typedkv::queue", "Queue listener stopped");
        });
        QueueListener {
            stop,
            thread: Some(thread),
        }
    }

    /// Stop the listener and wait for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for QueueListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}
