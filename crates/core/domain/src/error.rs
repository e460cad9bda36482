use serde::{Deserialize, Serialize};

/// 单设备操作错误。
///
/// 批量操作中每台设备的错误单独记录，不会中断整个批次。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum DeviceError {
    /// 传输层超时或连接失败，调用方可按策略重试。
    #[error("device unreachable: {0}")]
    Unreachable(String),
    /// 设备拒绝了该状态变更，不应重试。
    #[error("device rejected: {0}")]
    Rejected(String),
    /// 协调器设置的批次截止时间已到。
    #[error("operation timed out")]
    Timeout,
    #[error("unknown device error: {0}")]
    Unknown(String),
    #[error("device not found: {0}")]
    NotFound(String),
}

impl DeviceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::Unreachable(_) | DeviceError::Timeout)
    }
}
