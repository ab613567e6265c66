//! Notification frame codec
//!
//! The wearable pushes each reading as one UTF-8 JSON object over the
//! link's notification channel:
//!
//! ```json
//! {"ID":1,"heartRate":70,"bodyTemp":36.6,"spo2":98,
//!  "sosStatus":"SOS Alert","mpuStatus":"None"}
//! ```
//!
//! The firmware reports status fields as display strings; only the exact
//! strings below activate a flag, anything else reads as inactive.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::types::{ImpactStatus, SosStatus, TelemetrySample};

/// Status string the firmware emits when the panic button is pressed
pub const SOS_ALERT_WIRE: &str = "SOS Alert";
/// Status string the firmware emits when the impact sensor trips
pub const IMPACT_WIRE: &str = "Impact detected";
/// Status string for an inactive flag
pub const NONE_WIRE: &str = "None";

/// On-the-wire frame layout, field names as the firmware sends them
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFrame {
    #[serde(rename = "ID")]
    id: u32,
    #[serde(rename = "heartRate")]
    heart_rate: f64,
    #[serde(rename = "bodyTemp")]
    body_temp: f64,
    #[serde(rename = "spo2")]
    spo2: f64,
    #[serde(rename = "sosStatus")]
    sos_status: String,
    #[serde(rename = "mpuStatus")]
    mpu_status: String,
}

/// Decode a raw notification payload into a telemetry sample.
///
/// The sample is stamped with the decode time. A malformed payload is an
/// [`IngestError::Decode`]; the caller drops the frame and keeps the
/// connection.
pub fn decode(payload: &[u8]) -> Result<TelemetrySample, IngestError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| IngestError::Decode(format!("invalid UTF-8: {e}")))?;

    let frame: WireFrame = serde_json::from_str(text)
        .map_err(|e| IngestError::Decode(format!("invalid frame JSON: {e}")))?;

    Ok(TelemetrySample {
        worker_id: frame.id,
        heart_rate: frame.heart_rate,
        body_temp: frame.body_temp,
        spo2: frame.spo2,
        sos_status: if frame.sos_status == SOS_ALERT_WIRE {
            SosStatus::SosAlert
        } else {
            SosStatus::None
        },
        impact_status: if frame.mpu_status == IMPACT_WIRE {
            ImpactStatus::ImpactDetected
        } else {
            ImpactStatus::None
        },
        received_at: Utc::now(),
    })
}

/// Re-encode a sample into the wire layout.
///
/// Used by replay tooling and tests; decoding followed by re-encoding
/// recovers the original vital fields.
pub fn encode(sample: &TelemetrySample) -> Result<String, IngestError> {
    let frame = WireFrame {
        id: sample.worker_id,
        heart_rate: sample.heart_rate,
        body_temp: sample.body_temp,
        spo2: sample.spo2,
        sos_status: match sample.sos_status {
            SosStatus::SosAlert => SOS_ALERT_WIRE.to_string(),
            SosStatus::None => NONE_WIRE.to_string(),
        },
        mpu_status: match sample.impact_status {
            ImpactStatus::ImpactDetected => IMPACT_WIRE.to_string(),
            ImpactStatus::None => NONE_WIRE.to_string(),
        },
    };

    serde_json::to_string(&frame).map_err(|e| IngestError::Decode(e.to_string()))
}
