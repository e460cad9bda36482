//! 设备群运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 设备群运行配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetConfig {
    pub alert_log_capacity: usize,
    /// 批量操作默认截止时间；`None` 表示不设超时，等待所有设备完成。
    pub bulk_timeout_ms: Option<u64>,
    pub low_battery_threshold: u8,
    pub alert_channel_capacity: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            alert_log_capacity: 50,
            bulk_timeout_ms: None,
            low_battery_threshold: 20,
            alert_channel_capacity: 64,
        }
    }
}

impl FleetConfig {
    /// 从环境变量读取配置，未设置的项使用默认值。
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let alert_log_capacity =
            read_usize_with_default("FLEET_ALERT_LOG_CAPACITY", defaults.alert_log_capacity)?
                .max(1);
        let bulk_timeout_ms =
            read_optional_u64("FLEET_BULK_TIMEOUT_MS")?.filter(|value| *value > 0);
        let low_battery_threshold = read_u8_with_default(
            "FLEET_LOW_BATTERY_THRESHOLD",
            defaults.low_battery_threshold,
        )?;
        if low_battery_threshold > 100 {
            return Err(ConfigError::Invalid(
                "FLEET_LOW_BATTERY_THRESHOLD".to_string(),
                low_battery_threshold.to_string(),
            ));
        }
        let alert_channel_capacity = read_usize_with_default(
            "FLEET_ALERT_CHANNEL_CAPACITY",
            defaults.alert_channel_capacity,
        )?
        .max(1);

        Ok(Self {
            alert_log_capacity,
            bulk_timeout_ms,
            low_battery_threshold,
            alert_channel_capacity,
        })
    }

    pub fn bulk_timeout(&self) -> Option<Duration> {
        self.bulk_timeout_ms.map(Duration::from_millis)
    }
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        Err(_) => Ok(None),
    }
}
