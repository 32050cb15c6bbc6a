// src/gateway/mod.rs — Gateway event loop

pub mod dispatcher;
pub mod poller;

use std::sync::Arc;
use std::time::Duration;

use crate::core::router::Router;
use crate::integrations::types::{MessagingAdapter, UpdateSource};

pub use dispatcher::Dispatcher;
pub use poller::Poller;

/// How often retired per-user workers are dropped from the dispatcher.
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Run until Ctrl+C: poll the platform and hand events to per-user workers.
pub async fn run_gateway(
    router: Arc<Router>,
    source: Arc<dyn UpdateSource>,
    messenger: Arc<dyn MessagingAdapter>,
    poll_timeout_secs: u64,
) -> anyhow::Result<()> {
    tracing::info!("chatgate starting...");

    let mut poller = Poller::new(source, poll_timeout_secs);
    let mut events = poller.start();
    let mut dispatcher = Dispatcher::new(router, messenger);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut reap = tokio::time::interval(REAP_INTERVAL);

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(event) => dispatcher.dispatch(event),
                    None => {
                        tracing::warn!("Poller channel closed");
                        break;
                    }
                }
            }
            _ = reap.tick() => {
                let reaped = dispatcher.reap();
                if reaped > 0 {
                    tracing::debug!(reaped, active = dispatcher.active_users(), "Reaped idle workers");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    poller.stop();
    tracing::info!(
        users = dispatcher.active_users(),
        "Waiting for in-flight events"
    );
    dispatcher.shutdown().await;
    tracing::info!("chatgate stopped.");
    Ok(())
}
