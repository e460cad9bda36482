use crate::data::{DeviceCategory, DeviceStatus};
use crate::error::DeviceError;
use serde::{Deserialize, Serialize};

/// 单设备操作请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeviceOperation {
    CaptureSnapshot,
    SetMotionDetection { enabled: bool },
    Refresh,
}

impl DeviceOperation {
    /// 该操作是否适用于指定类别的设备。
    pub fn applies_to(self, category: DeviceCategory) -> bool {
        match self {
            DeviceOperation::CaptureSnapshot => category.supports_snapshot(),
            DeviceOperation::SetMotionDetection { .. } => category.supports_motion_detection(),
            DeviceOperation::Refresh => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceOperation::CaptureSnapshot => "capture_snapshot",
            DeviceOperation::SetMotionDetection { enabled: true } => "enable_motion_detection",
            DeviceOperation::SetMotionDetection { enabled: false } => "disable_motion_detection",
            DeviceOperation::Refresh => "refresh",
        }
    }
}

/// 传输层确认成功后返回的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationOutcome {
    #[serde(rename_all = "camelCase")]
    SnapshotCaptured {
        snapshot_id: String,
        captured_at_ms: i64,
    },
    MotionDetectionSet { enabled: bool },
    #[serde(rename_all = "camelCase")]
    Refreshed {
        status: DeviceStatus,
        battery_level: Option<u8>,
        last_activity_ms: Option<i64>,
    },
}

impl OperationOutcome {
    /// 结果类型是否与请求的操作匹配。
    pub fn matches(&self, operation: DeviceOperation) -> bool {
        match (operation, self) {
            (DeviceOperation::CaptureSnapshot, OperationOutcome::SnapshotCaptured { .. }) => true,
            (
                DeviceOperation::SetMotionDetection { enabled },
                OperationOutcome::MotionDetectionSet { enabled: confirmed },
            ) => enabled == *confirmed,
            (DeviceOperation::Refresh, OperationOutcome::Refreshed { .. }) => true,
            _ => false,
        }
    }
}

/// 设备群批量操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkOperation {
    CaptureSnapshotsFromAllCameras,
    EnableMotionDetectionForAll,
    DisableMotionDetectionForAll,
    RefreshAll,
}

impl BulkOperation {
    /// 每台目标设备上执行的单设备操作。
    pub fn device_operation(self) -> DeviceOperation {
        match self {
            BulkOperation::CaptureSnapshotsFromAllCameras => DeviceOperation::CaptureSnapshot,
            BulkOperation::EnableMotionDetectionForAll => {
                DeviceOperation::SetMotionDetection { enabled: true }
            }
            BulkOperation::DisableMotionDetectionForAll => {
                DeviceOperation::SetMotionDetection { enabled: false }
            }
            BulkOperation::RefreshAll => DeviceOperation::Refresh,
        }
    }

    /// 默认目标集合：适用该操作的设备类别。
    pub fn applies_to(self, category: DeviceCategory) -> bool {
        self.device_operation().applies_to(category)
    }

    pub fn name(self) -> &'static str {
        match self {
            BulkOperation::CaptureSnapshotsFromAllCameras => "capture_snapshots_from_all_cameras",
            BulkOperation::EnableMotionDetectionForAll => "enable_motion_detection_for_all",
            BulkOperation::DisableMotionDetectionForAll => "disable_motion_detection_for_all",
            BulkOperation::RefreshAll => "refresh_all",
        }
    }
}

/// 批量操作中单台设备的失败记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub device_id: String,
    pub error: DeviceError,
}

/// 批量操作汇总结果。
///
/// `succeeded.len() + failed.len()` 恒等于目标设备数；列表按完成顺序排列，
/// 不保证与目标顺序一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResult {
    pub operation_id: String,
    pub operation: BulkOperation,
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOperationResult {
    pub fn empty(operation_id: impl Into<String>, operation: BulkOperation) -> Self {
        Self {
            operation_id: operation_id.into(),
            operation,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn target_count(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// 查找指定设备的失败原因。
    pub fn failure_for(&self, device_id: &str) -> Option<&DeviceError> {
        self.failed
            .iter()
            .find(|item| item.device_id == device_id)
            .map(|item| &item.error)
    }

    /// 面向 UI 的简短统计。
    pub fn summary(&self) -> String {
        format!(
            "{}: {} succeeded, {} failed",
            self.operation.name(),
            self.succeeded.len(),
            self.failed.len()
        )
    }
}
