//! Decision pipeline
//!
//! The single consumer of the handoff queue. Each dequeued sample is
//! routed down one of two paths:
//!
//! - **Immediate alert**: panic or impact flag set - persist one alert
//!   and skip classification entirely (latency-critical events never
//!   wait on the model).
//! - **Classify then persist**: fetch the worker's baseline profile,
//!   score the feature vector, persist a health-risk alert when the
//!   model flags it, and always persist the measurement.
//!
//! The central resilience contract: no single sample's failure may stop
//! the worker. Every error in the per-sample steps is logged and the
//! loop moves to the next sample.

use crate::error::IngestError;
use crate::external::{PersistenceGateway, RiskClassifier, WorkerDirectory};
use crate::features::FeatureVector;
use crate::queue::HandoffReceiver;
use crate::types::{AlertEvent, AlertType, MeasurementRecord, RiskLabel, RiskScore, TelemetrySample};

/// Terminal outcome of one successfully routed sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The immediate-alert path persisted one alert of this type
    ImmediateAlert(AlertType),
    /// The classify path persisted one measurement, plus a health-risk
    /// alert when `alerted` is true
    Classified { score: RiskScore, alerted: bool },
}

/// The decision worker and its external collaborators.
pub struct DecisionPipeline<D, C, G> {
    queue: HandoffReceiver,
    directory: D,
    classifier: C,
    gateway: G,
}

impl<D, C, G> DecisionPipeline<D, C, G>
where
    D: WorkerDirectory,
    C: RiskClassifier,
    G: PersistenceGateway,
{
    pub fn new(queue: HandoffReceiver, directory: D, classifier: C, gateway: G) -> Self {
        Self {
            queue,
            directory,
            classifier,
            gateway,
        }
    }

    /// Consume the queue until every producer is gone.
    ///
    /// Runs for the lifetime of the process in normal operation; samples
    /// are processed strictly in enqueue order, one at a time, so a slow
    /// downstream call delays the next sample rather than reordering it.
    pub async fn run(mut self) {
        tracing::info!("Decision worker started");

        while let Some(sample) = self.queue.get().await {
            match self.process_sample(&sample).await {
                Ok(outcome) => {
                    tracing::debug!(
                        worker_id = sample.worker_id,
                        outcome = ?outcome,
                        "Sample routed"
                    );
                }
                Err(e) => {
                    // Contained: log, drop this sample, keep consuming
                    tracing::warn!(
                        worker_id = sample.worker_id,
                        error = %e,
                        "Sample dropped"
                    );
                }
            }
        }

        tracing::info!("Handoff queue closed; decision worker exiting");
    }

    /// Route one sample to its terminal outcome.
    ///
    /// Every sample yields exactly one outcome on success: one immediate
    /// alert, or one measurement plus conditionally one health-risk
    /// alert.
    pub async fn process_sample(&self, sample: &TelemetrySample) -> Result<Outcome, IngestError> {
        if sample.requires_immediate_alert() {
            // SOS wins when both flags are set
            let alert_type = if sample.sos_status.is_active() {
                AlertType::Sos
            } else {
                AlertType::FallDetected
            };

            let alert = AlertEvent::new(sample.worker_id, alert_type);
            self.gateway.insert_alert(&alert).await?;

            tracing::info!(
                worker_id = sample.worker_id,
                alert_type = alert_type.as_str(),
                "Immediate alert persisted"
            );
            return Ok(Outcome::ImmediateAlert(alert_type));
        }

        let profile = self
            .directory
            .get_worker(sample.worker_id)
            .await?
            .ok_or(IngestError::LookupMiss(sample.worker_id))?;

        let features = FeatureVector::build(sample, &profile);
        let score = self.classifier.score(&features).await?;

        // Inverted polarity: label 0 (Risk) is the alerting case
        let alerted = score.label == RiskLabel::Risk;
        if alerted {
            let alert = AlertEvent::new(sample.worker_id, AlertType::HealthRisk);
            self.gateway.insert_alert(&alert).await?;

            tracing::info!(
                worker_id = sample.worker_id,
                probability = score.probability,
                "Health risk alert persisted"
            );
        }

        let record = MeasurementRecord::new(sample, &score, features.hrv);
        self.gateway.insert_measurement(&record).await?;

        Ok(Outcome::Classified { score, alerted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::HRV_PLACEHOLDER;
    use crate::queue::handoff_queue;
    use crate::types::{Gender, ImpactStatus, SosStatus, WorkerProfile};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Gateway double that records every write in call order.
    #[derive(Clone, Default)]
    struct RecordingGateway {
        alerts: Arc<Mutex<Vec<AlertEvent>>>,
        measurements: Arc<Mutex<Vec<MeasurementRecord>>>,
        ops: Arc<Mutex<Vec<String>>>,
        fail_measurements: bool,
    }

    #[async_trait]
    impl PersistenceGateway for RecordingGateway {
        async fn insert_alert(&self, alert: &AlertEvent) -> Result<(), IngestError> {
            self.ops
                .lock()
                .unwrap()
                .push(format!("alert:{}", alert.alert_type.as_str()));
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        }

        async fn insert_measurement(&self, record: &MeasurementRecord) -> Result<(), IngestError> {
            if self.fail_measurements {
                return Err(IngestError::Persistence("connection refused".into()));
            }
            self.ops.lock().unwrap().push("measurement".into());
            self.measurements.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// Directory double backed by a fixed roster.
    #[derive(Clone, Default)]
    struct StaticDirectory {
        profiles: HashMap<u32, WorkerProfile>,
    }

    #[async_trait]
    impl WorkerDirectory for StaticDirectory {
        async fn get_worker(&self, worker_id: u32) -> Result<Option<WorkerProfile>, IngestError> {
            Ok(self.profiles.get(&worker_id).cloned())
        }
    }

    /// Classifier double returning a canned score and counting calls.
    #[derive(Clone)]
    struct CannedClassifier {
        score: RiskScore,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CannedClassifier {
        fn returning(probability: f64, label: RiskLabel) -> Self {
            Self {
                score: RiskScore { probability, label },
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl RiskClassifier for CannedClassifier {
        async fn score(&self, _features: &FeatureVector) -> Result<RiskScore, IngestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(IngestError::Classification("scorer unavailable".into()));
            }
            Ok(self.score)
        }
    }

    fn make_test_sample(worker_id: u32, sos: SosStatus, impact: ImpactStatus) -> TelemetrySample {
        TelemetrySample {
            worker_id,
            heart_rate: 70.0,
            body_temp: 36.6,
            spo2: 98.0,
            sos_status: sos,
            impact_status: impact,
            received_at: Utc::now(),
        }
    }

    fn make_test_profile(worker_id: u32) -> WorkerProfile {
        WorkerProfile {
            worker_id,
            age: 40,
            gender: Gender::Male,
            weight_kg: 80.0,
            height_m: 1.78,
            bmi: 25.2,
        }
    }

    fn make_pipeline(
        directory: StaticDirectory,
        classifier: CannedClassifier,
        gateway: RecordingGateway,
    ) -> DecisionPipeline<StaticDirectory, CannedClassifier, RecordingGateway> {
        let (_tx, rx) = handoff_queue();
        DecisionPipeline::new(rx, directory, classifier, gateway)
    }

    #[tokio::test]
    async fn test_sos_sample_short_circuits_classification() {
        let gateway = RecordingGateway::default();
        let classifier = CannedClassifier::returning(0.5, RiskLabel::Normal);
        let pipeline = make_pipeline(StaticDirectory::default(), classifier.clone(), gateway.clone());

        let sample = make_test_sample(1, SosStatus::SosAlert, ImpactStatus::None);
        let outcome = pipeline.process_sample(&sample).await.unwrap();

        assert_eq!(outcome, Outcome::ImmediateAlert(AlertType::Sos));

        let alerts = gateway.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].worker_id, 1);
        assert_eq!(alerts[0].alert_type, AlertType::Sos);
        assert!(!alerts[0].acknowledged);

        assert!(gateway.measurements.lock().unwrap().is_empty());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_impact_sample_raises_fall_alert() {
        let gateway = RecordingGateway::default();
        let classifier = CannedClassifier::returning(0.5, RiskLabel::Normal);
        let pipeline = make_pipeline(StaticDirectory::default(), classifier.clone(), gateway.clone());

        let sample = make_test_sample(2, SosStatus::None, ImpactStatus::ImpactDetected);
        let outcome = pipeline.process_sample(&sample).await.unwrap();

        assert_eq!(outcome, Outcome::ImmediateAlert(AlertType::FallDetected));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sos_wins_when_both_flags_set() {
        let gateway = RecordingGateway::default();
        let classifier = CannedClassifier::returning(0.5, RiskLabel::Normal);
        let pipeline = make_pipeline(StaticDirectory::default(), classifier, gateway.clone());

        let sample = make_test_sample(1, SosStatus::SosAlert, ImpactStatus::ImpactDetected);
        let outcome = pipeline.process_sample(&sample).await.unwrap();

        assert_eq!(outcome, Outcome::ImmediateAlert(AlertType::Sos));
    }

    #[tokio::test]
    async fn test_risk_label_persists_measurement_and_health_alert() {
        let gateway = RecordingGateway::default();
        let classifier = CannedClassifier::returning(0.82, RiskLabel::Risk);
        let directory = StaticDirectory {
            profiles: HashMap::from([(1, make_test_profile(1))]),
        };
        let pipeline = make_pipeline(directory, classifier, gateway.clone());

        let mut sample = make_test_sample(1, SosStatus::None, ImpactStatus::None);
        sample.heart_rate = 130.0;
        sample.body_temp = 39.2;
        sample.spo2 = 90.0;

        let outcome = pipeline.process_sample(&sample).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Classified {
                score: RiskScore {
                    probability: 0.82,
                    label: RiskLabel::Risk
                },
                alerted: true
            }
        );

        let alerts = gateway.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::HealthRisk);

        let measurements = gateway.measurements.lock().unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].predicted_label, 0);
        assert_eq!(measurements[0].predicted_probability, 0.82);
        assert_eq!(measurements[0].heart_rate, 130.0);
        assert_eq!(measurements[0].hrv, HRV_PLACEHOLDER);

        // The health alert is written before the measurement
        let ops = gateway.ops.lock().unwrap();
        assert_eq!(*ops, vec!["alert:Health".to_string(), "measurement".to_string()]);
    }

    #[tokio::test]
    async fn test_normal_label_persists_measurement_only() {
        let gateway = RecordingGateway::default();
        let classifier = CannedClassifier::returning(0.10, RiskLabel::Normal);
        let directory = StaticDirectory {
            profiles: HashMap::from([(1, make_test_profile(1))]),
        };
        let pipeline = make_pipeline(directory, classifier, gateway.clone());

        let sample = make_test_sample(1, SosStatus::None, ImpactStatus::None);
        let outcome = pipeline.process_sample(&sample).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Classified {
                score: RiskScore {
                    probability: 0.10,
                    label: RiskLabel::Normal
                },
                alerted: false
            }
        );
        assert!(gateway.alerts.lock().unwrap().is_empty());
        assert_eq!(gateway.measurements.lock().unwrap().len(), 1);
        assert_eq!(gateway.measurements.lock().unwrap()[0].predicted_label, 1);
    }

    #[tokio::test]
    async fn test_unknown_worker_is_a_lookup_miss() {
        let gateway = RecordingGateway::default();
        let classifier = CannedClassifier::returning(0.5, RiskLabel::Normal);
        let pipeline = make_pipeline(StaticDirectory::default(), classifier.clone(), gateway.clone());

        let sample = make_test_sample(99, SosStatus::None, ImpactStatus::None);
        let err = pipeline.process_sample(&sample).await.unwrap_err();

        assert!(matches!(err, IngestError::LookupMiss(99)));
        assert!(gateway.alerts.lock().unwrap().is_empty());
        assert!(gateway.measurements.lock().unwrap().is_empty());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_surfaces_and_writes_nothing() {
        let gateway = RecordingGateway::default();
        let mut classifier = CannedClassifier::returning(0.5, RiskLabel::Normal);
        classifier.fail = true;
        let directory = StaticDirectory {
            profiles: HashMap::from([(1, make_test_profile(1))]),
        };
        let pipeline = make_pipeline(directory, classifier, gateway.clone());

        let sample = make_test_sample(1, SosStatus::None, ImpactStatus::None);
        let err = pipeline.process_sample(&sample).await.unwrap_err();

        assert!(matches!(err, IngestError::Classification(_)));
        assert!(gateway.measurements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_worker_survives_bad_samples() {
        // A lookup miss followed by a persistence failure must not stop
        // the loop from reaching later samples.
        let gateway = RecordingGateway::default();
        let classifier = CannedClassifier::returning(0.3, RiskLabel::Normal);
        let directory = StaticDirectory {
            profiles: HashMap::from([(1, make_test_profile(1))]),
        };

        let (tx, rx) = handoff_queue();
        let pipeline = DecisionPipeline::new(rx, directory, classifier, gateway.clone());
        let task = tokio::spawn(pipeline.run());

        tx.put(make_test_sample(99, SosStatus::None, ImpactStatus::None)); // unknown id
        tx.put(make_test_sample(1, SosStatus::None, ImpactStatus::None)); // fine
        tx.put(make_test_sample(1, SosStatus::SosAlert, ImpactStatus::None)); // fine
        drop(tx);
        task.await.unwrap();

        assert_eq!(gateway.measurements.lock().unwrap().len(), 1);
        let alerts = gateway.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Sos);
    }

    #[tokio::test]
    async fn test_worker_survives_persistence_failure() {
        let gateway = RecordingGateway {
            fail_measurements: true,
            ..Default::default()
        };
        let classifier = CannedClassifier::returning(0.3, RiskLabel::Normal);
        let directory = StaticDirectory {
            profiles: HashMap::from([(1, make_test_profile(1))]),
        };

        let (tx, rx) = handoff_queue();
        let pipeline = DecisionPipeline::new(rx, directory, classifier, gateway.clone());
        let task = tokio::spawn(pipeline.run());

        tx.put(make_test_sample(1, SosStatus::None, ImpactStatus::None)); // write fails
        tx.put(make_test_sample(1, SosStatus::SosAlert, ImpactStatus::None)); // still routed
        drop(tx);
        task.await.unwrap();

        let alerts = gateway.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Sos);
    }
}
