//! Handoff queue
//!
//! FIFO mailbox between the link's notification context and the single
//! decision worker. The producer side never blocks (capacity is bounded
//! only by memory - acceptable for one wearable emitting a sample every
//! few seconds); the consumer side awaits until a sample arrives. One
//! producer, one consumer, no external locking.

use tokio::sync::mpsc;

use crate::types::TelemetrySample;

/// Create a connected handoff queue pair.
pub fn handoff_queue() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HandoffSender { tx }, HandoffReceiver { rx })
}

/// Producer half, held by the connection manager.
#[derive(Clone)]
pub struct HandoffSender {
    tx: mpsc::UnboundedSender<TelemetrySample>,
}

impl HandoffSender {
    /// Enqueue a sample without blocking the notification context.
    ///
    /// A send can only fail once the consumer has been torn down, which
    /// happens at process shutdown; the sample is logged and discarded
    /// rather than surfaced as an error.
    pub fn put(&self, sample: TelemetrySample) {
        if let Err(e) = self.tx.send(sample) {
            tracing::warn!(
                worker_id = e.0.worker_id,
                "Decision worker gone; discarding sample"
            );
        }
    }
}

/// Consumer half, owned by the decision pipeline.
pub struct HandoffReceiver {
    rx: mpsc::UnboundedReceiver<TelemetrySample>,
}

impl HandoffReceiver {
    /// Await the next sample in FIFO order.
    ///
    /// Returns `None` only after every producer handle has been dropped.
    pub async fn get(&mut self) -> Option<TelemetrySample> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImpactStatus, SosStatus};
    use chrono::Utc;

    fn make_test_sample(worker_id: u32) -> TelemetrySample {
        TelemetrySample {
            worker_id,
            heart_rate: 70.0,
            body_temp: 36.6,
            spo2: 98.0,
            sos_status: SosStatus::None,
            impact_status: ImpactStatus::None,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fifo_ordering() {
        let (tx, mut rx) = handoff_queue();

        for id in 1..=5 {
            tx.put(make_test_sample(id));
        }

        for id in 1..=5 {
            let sample = rx.get().await.unwrap();
            assert_eq!(sample.worker_id, id);
        }
    }

    #[tokio::test]
    async fn test_get_returns_none_after_producer_drop() {
        let (tx, mut rx) = handoff_queue();
        tx.put(make_test_sample(1));
        drop(tx);

        assert_eq!(rx.get().await.unwrap().worker_id, 1);
        assert!(rx.get().await.is_none());
    }

    #[tokio::test]
    async fn test_put_after_consumer_drop_is_silent() {
        let (tx, rx) = handoff_queue();
        drop(rx);

        // Must not panic or block
        tx.put(make_test_sample(1));
    }
}
