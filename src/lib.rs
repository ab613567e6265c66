//! Safetronics Relay - real-time ingestion and alert decisioning for
//! wearable safety telemetry
//!
//! The relay keeps a live link to a single wearable, decodes each
//! notification frame into a telemetry sample, and routes every sample
//! down one of two paths: an immediate-alert path for panic and impact
//! events, or a classify-then-persist path that scores the vitals with
//! an external risk model.
//!
//! ## Pipeline
//!
//! peripheral -> connection manager (decode) -> handoff queue ->
//! decision pipeline -> { persistence gateway, risk classifier, worker
//! directory }
//!
//! The connection manager and the decision pipeline are the only two
//! execution contexts; they share nothing but the queue. Both run for
//! the lifetime of the process: the link retries forever on transport
//! faults, and the worker drops bad samples instead of dying.
//!
//! ## Classifier polarity
//!
//! The risk model's binary label is inverted relative to intuition:
//! label 0 means risk detected, label 1 means normal. This crate
//! preserves that polarity everywhere (see [`types::RiskLabel`]).

pub mod error;
pub mod external;
pub mod features;
pub mod frame;
pub mod link;
pub mod pipeline;
pub mod queue;
pub mod types;

pub use error::IngestError;
pub use external::{PersistenceGateway, RiskClassifier, WorkerDirectory};
pub use features::{FeatureVector, HRV_PLACEHOLDER};
pub use link::{ConnectionManager, LinkConfig, PeripheralLink, DEFAULT_BACKOFF};
pub use pipeline::{DecisionPipeline, Outcome};
pub use queue::{handoff_queue, HandoffReceiver, HandoffSender};
pub use types::{
    AlertEvent, AlertType, ImpactStatus, MeasurementRecord, RiskLabel, RiskScore, SosStatus,
    TelemetrySample, WorkerProfile,
};

/// Relay version embedded in log output
pub const RELAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for log output
pub const PRODUCER_NAME: &str = "safetronics-relay";
