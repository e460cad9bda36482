use serde::{Deserialize, Serialize};

/// 告警类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertType {
    Motion,
    Person,
    Vehicle,
    Package,
    Doorbell,
}

/// 设备推送的运动告警。
///
/// `device_id` 是弱引用：设备被移除后告警仍保留在日志中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionAlert {
    pub alert_id: String,
    pub device_id: String,
    pub ts_ms: i64,
    /// 置信度，范围 [0, 1]。
    pub confidence: f32,
    pub alert_type: AlertType,
}

impl MotionAlert {
    pub fn new(
        alert_id: impl Into<String>,
        device_id: impl Into<String>,
        ts_ms: i64,
        confidence: f32,
        alert_type: AlertType,
    ) -> Self {
        Self {
            alert_id: alert_id.into(),
            device_id: device_id.into(),
            ts_ms,
            confidence: clamp_confidence(confidence),
            alert_type,
        }
    }
}

fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
