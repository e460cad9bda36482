//! 注册表错误类型

use domain::DeviceError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("device exists: {0}")]
    DeviceExists(String),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl From<RegistryError> for DeviceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DeviceNotFound(device_id) => DeviceError::NotFound(device_id),
            other => DeviceError::Unknown(other.to_string()),
        }
    }
}
