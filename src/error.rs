//! Error types for the relay

use thiserror::Error;

/// Errors raised while ingesting and routing telemetry.
///
/// None of these terminate the process. `Link` is contained by the
/// connection manager's reconnect loop; everything else is contained at
/// the decision pipeline's per-sample boundary.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Transport-level fault on the peripheral link. Triggers a backoff
    /// wait followed by a fresh connection attempt.
    #[error("Peripheral link failure: {0}")]
    Link(String),

    /// Malformed notification payload. The frame is dropped; the
    /// connection stays up.
    #[error("Undecodable notification frame: {0}")]
    Decode(String),

    /// The worker directory has no profile for this id. The sample is
    /// dropped because classification needs baseline attributes.
    #[error("No worker profile for id {0}")]
    LookupMiss(u32),

    /// The risk classifier call failed.
    #[error("Risk classification failed: {0}")]
    Classification(String),

    /// A persistence gateway write failed. Logged, not retried.
    #[error("Persistence write failed: {0}")]
    Persistence(String),
}
