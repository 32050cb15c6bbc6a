// src/gateway/poller.rs — Background long-polling of the messaging platform
//
// Polls for updates, acknowledges them through the offset, and forwards
// routable events on a channel.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::core::types::InboundEvent;
use crate::integrations::types::{PolledUpdate, UpdateSource};

/// Wait before polling again after a failed poll.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct Poller {
    source: Arc<dyn UpdateSource>,
    timeout_secs: u64,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl Poller {
    pub fn new(source: Arc<dyn UpdateSource>, timeout_secs: u64) -> Self {
        Self {
            source,
            timeout_secs,
            shutdown_tx: None,
        }
    }

    /// Start polling, returning a channel that receives events.
    pub fn start(&mut self) -> mpsc::Receiver<InboundEvent> {
        let (event_tx, event_rx) = mpsc::channel(100);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let source = self.source.clone();
        let timeout_secs = self.timeout_secs;

        tokio::spawn(async move {
            let mut offset: Option<i64> = None;
            tracing::info!("Poller started ({}s long poll)", timeout_secs);

            loop {
                tokio::select! {
                    polled = source.poll_updates(offset, timeout_secs) => {
                        match polled {
                            Ok(updates) => {
                                offset = next_offset(offset, &updates);
                                for event in updates.into_iter().filter_map(|u| u.event) {
                                    if event_tx.send(event).await.is_err() {
                                        // Receiver dropped
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Poll failed: {}", e);
                                tokio::select! {
                                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                                    _ = shutdown_rx.recv() => break,
                                }
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            tracing::info!("Poller stopping");
        });

        event_rx
    }

    /// Stop the polling task.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Offset that acknowledges everything in `updates`.
fn next_offset(current: Option<i64>, updates: &[PolledUpdate]) -> Option<i64> {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .max(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ChatId, UserId};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn update(id: i64, text: Option<&str>) -> PolledUpdate {
        PolledUpdate {
            update_id: id,
            event: text.map(|t| InboundEvent::from_text(UserId(1), ChatId(1), t)),
        }
    }

    #[test]
    fn test_next_offset() {
        assert_eq!(next_offset(None, &[]), None);
        assert_eq!(next_offset(Some(5), &[]), Some(5));
        assert_eq!(
            next_offset(None, &[update(10, None), update(12, Some("x"))]),
            Some(13)
        );
        assert_eq!(next_offset(Some(20), &[update(3, None)]), Some(20));
    }

    struct ScriptedSource {
        batches: Mutex<VecDeque<anyhow::Result<Vec<PolledUpdate>>>>,
        offsets: Mutex<Vec<Option<i64>>>,
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn poll_updates(
            &self,
            offset: Option<i64>,
            _timeout_secs: u64,
        ) -> anyhow::Result<Vec<PolledUpdate>> {
            self.offsets.lock().unwrap().push(offset);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => std::future::pending().await,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_events_and_advances_offset() {
        let source = Arc::new(ScriptedSource {
            batches: Mutex::new(
                vec![
                    Ok(vec![update(1, Some("a")), update(2, None)]),
                    Err(anyhow::anyhow!("network down")),
                    Ok(vec![update(3, Some("b"))]),
                ]
                .into(),
            ),
            offsets: Mutex::default(),
        });

        let mut poller = Poller::new(source.clone(), 30);
        let mut rx = poller.start();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        poller.stop();

        assert_eq!(first, InboundEvent::from_text(UserId(1), ChatId(1), "a"));
        assert_eq!(second, InboundEvent::from_text(UserId(1), ChatId(1), "b"));

        let offsets = source.offsets.lock().unwrap().clone();
        assert_eq!(&offsets[..3], &[None, Some(3), Some(3)]);
    }
}
