//! 单设备操作网关
//!
//! 对一台设备发起一次请求/响应：
//! 1. 从注册表确认设备存在且类别支持该操作
//! 2. 调用传输层（可能挂起）
//! 3. 仅在确认成功后把结果写回注册表
//!
//! 网关本身不重试；重试策略属于调用方。

use crate::transport::DeviceTransport;
use domain::{Device, DeviceError, DeviceOperation, DeviceStatus, OperationOutcome};
use fleet_registry::{DeviceRegistry, latest};
use fleet_telemetry::{record_single_operation, record_single_operation_failure};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct OperationGateway {
    registry: Arc<DeviceRegistry>,
    transport: Arc<dyn DeviceTransport>,
}

impl OperationGateway {
    pub fn new(registry: Arc<DeviceRegistry>, transport: Arc<dyn DeviceTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub async fn perform(
        &self,
        operation: DeviceOperation,
        device_id: &str,
    ) -> Result<OperationOutcome, DeviceError> {
        record_single_operation();
        let result = self.perform_inner(operation, device_id).await;
        if let Err(err) = &result {
            record_single_operation_failure();
            warn!(
                target: "fleet.control",
                device_id = %device_id,
                operation = operation.name(),
                error = %err,
                "device_operation_failed"
            );
        }
        result
    }

    async fn perform_inner(
        &self,
        operation: DeviceOperation,
        device_id: &str,
    ) -> Result<OperationOutcome, DeviceError> {
        let device = self
            .registry
            .get(device_id)
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()))?;
        if !operation.applies_to(device.category) {
            return Err(DeviceError::Rejected(format!(
                "{} is not supported by {}",
                operation.name(),
                device.category.as_str()
            )));
        }

        let outcome = self.transport.send(operation, device_id).await?;
        if !outcome.matches(operation) {
            return Err(DeviceError::Unknown(format!(
                "unexpected outcome for {}: {:?}",
                operation.name(),
                outcome
            )));
        }

        let updated = self
            .registry
            .update(device_id, |device| apply_outcome(device, &outcome))?;
        info!(
            target: "fleet.control",
            device_id = %device_id,
            operation = operation.name(),
            status = updated.status.as_str(),
            motion_detection_enabled = updated.motion_detection_enabled,
            battery_level = ?updated.battery_level,
            "device_operation_confirmed"
        );
        Ok(outcome)
    }
}

/// 把确认成功的结果应用到设备字段上。
fn apply_outcome(device: &mut Device, outcome: &OperationOutcome) {
    match outcome {
        OperationOutcome::SnapshotCaptured { captured_at_ms, .. } => {
            device.status = DeviceStatus::Online;
            device.last_activity_ms = latest(device.last_activity_ms, Some(*captured_at_ms));
        }
        OperationOutcome::MotionDetectionSet { enabled } => {
            device.status = DeviceStatus::Online;
            device.motion_detection_enabled = *enabled;
        }
        OperationOutcome::Refreshed {
            status,
            battery_level,
            last_activity_ms,
        } => {
            device.status = *status;
            device.battery_level = battery_level.map(|level| level.min(100));
            device.last_activity_ms = latest(device.last_activity_ms, *last_activity_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DeviceCategory;

    #[test]
    fn snapshot_marks_online_and_keeps_newest_activity() {
        let mut device = Device::new("cam-1", "Porch", DeviceCategory::Camera);
        device.last_activity_ms = Some(5_000);
        apply_outcome(
            &mut device,
            &OperationOutcome::SnapshotCaptured {
                snapshot_id: "snap-1".to_string(),
                captured_at_ms: 4_000,
            },
        );
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.last_activity_ms, Some(5_000));
    }

    #[test]
    fn refresh_replaces_status_and_battery() {
        let mut device = Device::new("cam-1", "Porch", DeviceCategory::Camera)
            .with_status(DeviceStatus::Online)
            .with_battery(80);
        apply_outcome(
            &mut device,
            &OperationOutcome::Refreshed {
                status: DeviceStatus::Offline,
                battery_level: Some(12),
                last_activity_ms: Some(1_000),
            },
        );
        assert_eq!(device.status, DeviceStatus::Offline);
        assert_eq!(device.battery_level, Some(12));
        assert_eq!(device.last_activity_ms, Some(1_000));
    }
}
