//! Connection manager for the peripheral link
//!
//! Maintains a live subscription to the wearable's notification channel
//! and turns inbound frames into telemetry samples on the handoff queue.
//!
//! State machine: Disconnected -> Connecting -> Subscribed, with any
//! transport fault dropping back to Disconnected after a fixed backoff.
//! The retry loop is unbounded on purpose: the peripheral is
//! battery-powered and vanishes and reappears arbitrarily, and pipeline
//! availability matters more than bounding retries.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::IngestError;
use crate::frame;
use crate::queue::HandoffSender;

/// Delay between a transport fault and the next connection attempt
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// Identity of the peripheral and reconnect tuning
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Transport address of the wearable (e.g. a BLE MAC)
    pub device_address: String,
    /// Identifier of the notification channel to subscribe to
    pub notification_channel: String,
    /// Wait between reconnect attempts
    pub backoff: Duration,
}

impl LinkConfig {
    pub fn new(device_address: impl Into<String>, notification_channel: impl Into<String>) -> Self {
        Self {
            device_address: device_address.into(),
            notification_channel: notification_channel.into(),
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Transport boundary to the peripheral.
///
/// Implementations own negotiation, pairing and subscription details;
/// the relay only needs a session it can open and a stream of raw
/// notification payloads. Every fault surfaces as
/// [`IngestError::Link`].
#[async_trait]
pub trait PeripheralLink: Send {
    /// Establish a transport session and subscribe to the notification
    /// channel named in `config`.
    async fn connect(&mut self, config: &LinkConfig) -> Result<(), IngestError>;

    /// Await the next notification payload on the subscribed channel.
    async fn next_frame(&mut self) -> Result<Vec<u8>, IngestError>;
}

/// Owns the link lifecycle and feeds the handoff queue.
///
/// The only state it mutates outside itself is the queue; it never
/// touches the database or the model.
pub struct ConnectionManager<L> {
    link: L,
    config: LinkConfig,
    queue: HandoffSender,
}

impl<L: PeripheralLink> ConnectionManager<L> {
    pub fn new(link: L, config: LinkConfig, queue: HandoffSender) -> Self {
        Self {
            link,
            config,
            queue,
        }
    }

    /// Run the connect/listen/backoff loop.
    ///
    /// Never returns under normal operation; the supervising process
    /// boundary is responsible for tearing the task down.
    pub async fn connect_and_listen(mut self) {
        loop {
            tracing::info!(
                address = %self.config.device_address,
                channel = %self.config.notification_channel,
                "Attempting peripheral connection"
            );

            match self.link.connect(&self.config).await {
                Ok(()) => {
                    tracing::info!("Peripheral connected; listening for notifications");
                    let fault = self.listen().await;
                    tracing::warn!(error = %fault, "Link fault; connection lost");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Connection attempt failed");
                }
            }

            tracing::info!(
                backoff_secs = self.config.backoff.as_secs(),
                "Reconnecting after backoff"
            );
            tokio::time::sleep(self.config.backoff).await;
        }
    }

    /// One connected session. Returns the transport fault that ended it.
    ///
    /// A frame that fails to decode is dropped without tearing the
    /// session down - a malformed payload cannot be repaired, but the
    /// link is still healthy.
    async fn listen(&mut self) -> IngestError {
        loop {
            let payload = match self.link.next_frame().await {
                Ok(payload) => payload,
                Err(fault) => return fault,
            };

            match frame::decode(&payload) {
                Ok(sample) => {
                    tracing::debug!(
                        worker_id = sample.worker_id,
                        heart_rate = sample.heart_rate,
                        "Frame decoded"
                    );
                    // Unbounded send; never stalls the notification context
                    self.queue.put(sample);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable frame");
                }
            }
        }
    }
}
