//! 设备群核心领域模型：所有能力模块共享的数据类型与错误。

pub mod alert;
pub mod data;
pub mod error;
pub mod operation;

pub use alert::{AlertType, MotionAlert};
pub use data::{Device, DeviceCategory, DeviceStatus};
pub use error::DeviceError;
pub use operation::{BulkFailure, BulkOperation, BulkOperationResult, DeviceOperation, OperationOutcome};

/// 当前时间（epoch 毫秒）。
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
