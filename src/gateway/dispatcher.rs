// src/gateway/dispatcher.rs — Per-user serialization of inbound events
//
// Each user gets a queue and a worker task, created on their first event.
// A worker handles its user's events one at a time in arrival order, so two
// events for the same user never touch the session concurrently. Workers for
// different users run independently.
//
// A worker that stays idle retires: it closes its queue, finishes whatever
// was already queued and exits. The next event for that user starts a new
// worker, which waits for its predecessor before handling anything.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::router::Router;
use crate::core::types::{InboundEvent, UserId};
use crate::integrations::types::MessagingAdapter;

struct Worker {
    tx: mpsc::UnboundedSender<InboundEvent>,
    handle: JoinHandle<()>,
}

/// How long a worker waits for its next event before retiring.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

pub struct Dispatcher {
    router: Arc<Router>,
    messenger: Arc<dyn MessagingAdapter>,
    workers: HashMap<UserId, Worker>,
    idle_timeout: Duration,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>, messenger: Arc<dyn MessagingAdapter>) -> Self {
        Self {
            router,
            messenger,
            workers: HashMap::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Queue an event behind any earlier events from the same user.
    pub fn dispatch(&mut self, event: InboundEvent) {
        let user = event.user;
        let (event, predecessor) = match self.workers.remove(&user) {
            Some(worker) => match worker.tx.send(event) {
                Ok(()) => {
                    self.workers.insert(user, worker);
                    return;
                }
                // Worker retired or a handler panicked; start a fresh one.
                Err(mpsc::error::SendError(event)) => {
                    tracing::debug!(user = %user, "Worker gone, restarting");
                    (event, Some(worker.handle))
                }
            },
            None => (event, None),
        };

        let worker = self.spawn_worker(user, predecessor);
        if worker.tx.send(event).is_err() {
            tracing::error!(user = %user, "Fresh worker rejected event");
        }
        self.workers.insert(user, worker);
    }

    fn spawn_worker(&self, user: UserId, predecessor: Option<JoinHandle<()>>) -> Worker {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundEvent>();
        let router = self.router.clone();
        let messenger = self.messenger.clone();
        let idle_timeout = self.idle_timeout;

        let handle = tokio::spawn(async move {
            if let Some(previous) = predecessor {
                // Still draining events queued before it retired.
                if let Err(e) = previous.await {
                    tracing::warn!(user = %user, "Previous worker ended abnormally: {e}");
                }
            }
            tracing::debug!(user = %user, "Worker started");

            loop {
                match tokio::time::timeout(idle_timeout, rx.recv()).await {
                    Ok(Some(event)) => router.handle(&event, messenger.as_ref()).await,
                    Ok(None) => break,
                    Err(_) => {
                        rx.close();
                        while let Some(event) = rx.recv().await {
                            router.handle(&event, messenger.as_ref()).await;
                        }
                        tracing::debug!(user = %user, "Worker idle, retiring");
                        break;
                    }
                }
            }
            tracing::debug!(user = %user, "Worker stopped");
        });

        Worker { tx, handle }
    }

    /// Drop finished workers from the table. Returns how many were removed.
    pub fn reap(&mut self) -> usize {
        let before = self.workers.len();
        self.workers.retain(|_, worker| !worker.handle.is_finished());
        before - self.workers.len()
    }

    /// Number of users with a worker.
    pub fn active_users(&self) -> usize {
        self.workers.len()
    }

    /// Close every queue and wait for queued events to finish.
    pub async fn shutdown(self) {
        let handles: Vec<JoinHandle<()>> = self
            .workers
            .into_values()
            .map(|Worker { tx, handle }| {
                drop(tx);
                handle
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Worker ended abnormally: {e}");
            }
        }
    }
}
