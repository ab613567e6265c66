//! Feature vector assembly
//!
//! Combines a telemetry sample with the worker's baseline profile into
//! the ordered numeric input the risk classifier was trained on. The
//! column order is fixed by the trained model and must not change.

use crate::types::{TelemetrySample, WorkerProfile};

/// Fixed stand-in for heart rate variability.
///
/// No sensor channel provides HRV yet, so every vector (and every
/// persisted measurement) carries this documented placeholder. It is a
/// known gap, not a bug; replace it once the firmware exposes an HRV
/// channel.
pub const HRV_PLACEHOLDER: f64 = 0.067;

/// Ordered model input built from one sample and one profile.
///
/// Field order mirrors the model's training columns:
/// `(heart_rate, body_temp, spo2, age, gender_code, weight_kg, height_m,
/// hrv, bmi)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub heart_rate: f64,
    pub body_temp: f64,
    pub spo2: f64,
    pub age: f64,
    pub gender_code: f64,
    pub weight_kg: f64,
    pub height_m: f64,
    pub hrv: f64,
    pub bmi: f64,
}

impl FeatureVector {
    /// Assemble the vector for one sample.
    pub fn build(sample: &TelemetrySample, profile: &WorkerProfile) -> Self {
        Self {
            heart_rate: sample.heart_rate,
            body_temp: sample.body_temp,
            spo2: sample.spo2,
            age: profile.age as f64,
            gender_code: profile.gender.code(),
            weight_kg: profile.weight_kg,
            height_m: profile.height_m,
            hrv: HRV_PLACEHOLDER,
            bmi: profile.bmi,
        }
    }

    /// The vector in training-column order, ready for scaling/inference.
    pub fn as_array(&self) -> [f64; 9] {
        [
            self.heart_rate,
            self.body_temp,
            self.spo2,
            self.age,
            self.gender_code,
            self.weight_kg,
            self.height_m,
            self.hrv,
            self.bmi,
        ]
    }
}
