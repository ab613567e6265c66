//! External collaborator boundaries
//!
//! The relay drives three opaque, potentially blocking remote
//! capabilities: the persistence gateway (durable store for alerts and
//! measurements), the worker directory (baseline attributes by id) and
//! the risk classifier (model scoring). Each is a trait seam; transports,
//! schemas and model loading live entirely behind the implementations.

use async_trait::async_trait;

use crate::error::IngestError;
use crate::features::FeatureVector;
use crate::types::{AlertEvent, MeasurementRecord, RiskScore, WorkerProfile};

/// Durable store for decision outcomes.
///
/// Writes are fire-and-forget from the relay's perspective but must
/// report success or failure synchronously so the pipeline can log and
/// move on; the relay never retries a failed write.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Insert one alert row.
    async fn insert_alert(&self, alert: &AlertEvent) -> Result<(), IngestError>;

    /// Insert one measurement row.
    async fn insert_measurement(&self, record: &MeasurementRecord) -> Result<(), IngestError>;
}

/// Lookup of worker baseline attributes.
#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    /// Fetch the profile for a worker id, `None` when the id is unknown.
    async fn get_worker(&self, worker_id: u32) -> Result<Option<WorkerProfile>, IngestError>;
}

/// Opaque scoring capability over the trained risk model.
///
/// Model and scaler loading, versioning and inference are entirely the
/// implementation's responsibility. The returned label keeps the model's
/// inverted polarity: 0 = risk detected, 1 = normal.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    /// Score one feature vector.
    async fn score(&self, features: &FeatureVector) -> Result<RiskScore, IngestError>;
}
