//! Core types for the relay pipeline
//!
//! This module defines the data that flows through each stage: decoded
//! telemetry samples, worker baseline profiles, classifier scores, and the
//! two persisted record shapes (alerts and measurements).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Panic-button state carried by a telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SosStatus {
    None,
    SosAlert,
}

impl SosStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SosStatus::SosAlert)
    }
}

/// Impact-sensor state carried by a telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactStatus {
    None,
    ImpactDetected,
}

impl ImpactStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ImpactStatus::ImpactDetected)
    }
}

/// One decoded reading from the wearable.
///
/// Produced by frame decoding, immutable afterwards, and consumed exactly
/// once by the decision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Identifier of the worker wearing the device
    pub worker_id: u32,
    /// Pulse rate (bpm)
    pub heart_rate: f64,
    /// Body temperature (celsius)
    pub body_temp: f64,
    /// Blood oxygen saturation (percentage, 0-100)
    pub spo2: f64,
    /// Panic-button state
    pub sos_status: SosStatus,
    /// Impact-sensor state
    pub impact_status: ImpactStatus,
    /// When the frame was decoded by the relay (UTC)
    pub received_at: DateTime<Utc>,
}

impl TelemetrySample {
    /// True when the sample must take the immediate-alert path,
    /// bypassing classification entirely.
    pub fn requires_immediate_alert(&self) -> bool {
        self.sos_status.is_active() || self.impact_status.is_active()
    }
}

/// Worker gender as recorded in the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Numeric code used by the risk model: 0 for female, 1 otherwise.
    pub fn code(&self) -> f64 {
        match self {
            Gender::Female => 0.0,
            Gender::Male => 1.0,
        }
    }
}

/// Demographic and biometric baseline attributes for one worker.
///
/// Fetched on demand from the worker directory for every classified
/// sample; the relay never caches profiles (freshness over reuse).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub worker_id: u32,
    pub age: u32,
    pub gender: Gender,
    pub weight_kg: f64,
    pub height_m: f64,
    pub bmi: f64,
}

/// Alert category persisted to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Panic button pressed on the wearable
    Sos,
    /// Impact sensor tripped
    FallDetected,
    /// Risk classifier flagged the vitals
    HealthRisk,
}

impl AlertType {
    /// Stored representation. These exact strings are what the alerts
    /// table already contains; do not rename them.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Sos => "sos",
            AlertType::FallDetected => "fall_detected",
            AlertType::HealthRisk => "Health",
        }
    }
}

/// One alert row handed to the persistence gateway.
///
/// Created unacknowledged; acknowledgement happens downstream of this
/// system. Terminal once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub worker_id: u32,
    pub acknowledged: bool,
    pub alert_type: AlertType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertEvent {
    /// Build an unacknowledged alert stamped with the current time.
    pub fn new(worker_id: u32, alert_type: AlertType) -> Self {
        let now = Utc::now();
        Self {
            worker_id,
            acknowledged: false,
            alert_type,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Binary risk label returned by the classifier.
///
/// The polarity is INVERTED relative to intuition and must be preserved
/// for compatibility with the trained model and the persisted
/// `predicted_label` column: wire label 0 means risk detected, wire
/// label 1 means normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    /// Wire label 0 - the model flagged the vitals
    Risk,
    /// Wire label 1 - vitals look normal
    Normal,
}

impl RiskLabel {
    /// The 0/1 label persisted alongside the probability.
    pub fn wire_label(&self) -> u8 {
        match self {
            RiskLabel::Risk => 0,
            RiskLabel::Normal => 1,
        }
    }

    /// Interpret a raw model label, preserving the inverted polarity.
    pub fn from_wire_label(label: u8) -> Self {
        if label == 0 {
            RiskLabel::Risk
        } else {
            RiskLabel::Normal
        }
    }
}

/// Classifier output for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Model probability in [0, 1]
    pub probability: f64,
    /// Binary label (see [`RiskLabel`] for the polarity)
    pub label: RiskLabel,
}

/// One measurement row handed to the persistence gateway.
///
/// Created only on the classify-then-persist path, carrying the raw
/// vitals together with the classifier outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub worker_id: u32,
    pub body_temp: f64,
    pub heart_rate: f64,
    pub spo2: f64,
    /// Heart rate variability. Currently always the documented
    /// placeholder (see [`crate::features::HRV_PLACEHOLDER`]).
    pub hrv: f64,
    /// Raw model label, inverted polarity (0 = risk, 1 = normal)
    pub predicted_label: u8,
    pub predicted_probability: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MeasurementRecord {
    /// Build a measurement row from a sample and its classifier score,
    /// stamped with the current time.
    pub fn new(sample: &TelemetrySample, score: &RiskScore, hrv: f64) -> Self {
        let now = Utc::now();
        Self {
            worker_id: sample.worker_id,
            body_temp: sample.body_temp,
            heart_rate: sample.heart_rate,
            spo2: sample.spo2,
            hrv,
            predicted_label: score.label.wire_label(),
            predicted_probability: score.probability,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_stored_strings() {
        assert_eq!(AlertType::Sos.as_str(), "sos");
        assert_eq!(AlertType::FallDetected.as_str(), "fall_detected");
        assert_eq!(AlertType::HealthRisk.as_str(), "Health");
    }

    #[test]
    fn test_risk_label_polarity() {
        // 0 means risk, 1 means normal - inverted on purpose
        assert_eq!(RiskLabel::Risk.wire_label(), 0);
        assert_eq!(RiskLabel::Normal.wire_label(), 1);
        assert_eq!(RiskLabel::from_wire_label(0), RiskLabel::Risk);
        assert_eq!(RiskLabel::from_wire_label(1), RiskLabel::Normal);
    }

    #[test]
    fn test_new_alert_is_unacknowledged() {
        let alert = AlertEvent::new(7, AlertType::Sos);
        assert!(!alert.acknowledged);
        assert_eq!(alert.worker_id, 7);
        assert_eq!(alert.created_at, alert.updated_at);
    }

    #[test]
    fn test_immediate_alert_flags() {
        let mut sample = TelemetrySample {
            worker_id: 1,
            heart_rate: 70.0,
            body_temp: 36.6,
            spo2: 98.0,
            sos_status: SosStatus::None,
            impact_status: ImpactStatus::None,
            received_at: Utc::now(),
        };
        assert!(!sample.requires_immediate_alert());

        sample.sos_status = SosStatus::SosAlert;
        assert!(sample.requires_immediate_alert());

        sample.sos_status = SosStatus::None;
        sample.impact_status = ImpactStatus::ImpactDetected;
        assert!(sample.requires_immediate_alert());
    }

    #[test]
    fn test_gender_code() {
        assert_eq!(Gender::Female.code(), 0.0);
        assert_eq!(Gender::Male.code(), 1.0);
    }
}
