//! # Fleet Registry 模块
//!
//! 设备注册表：保存设备群的权威内存视图，以及基于它的健康度派生查询。
//!
//! - 读接口返回快照（克隆），调用方拿到的数据不会被并发写入撕裂
//! - 写接口只有 `add_device`、`remove_device` 与 `update` 系列，
//!   每次写入都在同一把写锁内完成，多字段更新不会出现中间态
//! - 列表按设备加入顺序返回
//!
//! 注册表本身不做并发调度，由协调器持有并在设备操作完成时调用写接口。

pub mod error;
pub mod health;

pub use error::RegistryError;
pub use health::*;

use domain::{Device, DeviceStatus};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

#[derive(Default)]
struct RegistryState {
    devices: HashMap<String, Device>,
    order: Vec<String>,
}

/// 设备注册表
///
/// 使用单把 RwLock 保护全部设备；设备规模为数十台，不做细粒度锁。
pub struct DeviceRegistry {
    state: RwLock<RegistryState>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// 以一组设备初始化注册表；重复 ID 以首次出现的为准。
    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let registry = Self::new();
        for device in devices {
            let _ = registry.add_device(device);
        }
        registry
    }

    /// 当前全部设备的快照（加入顺序）。
    pub fn list_devices(&self) -> Vec<Device> {
        self.devices_where(|_| true)
    }

    /// 按谓词过滤的设备快照。
    pub fn devices_where<F>(&self, predicate: F) -> Vec<Device>
    where
        F: Fn(&Device) -> bool,
    {
        self.state
            .read()
            .map(|state| {
                state
                    .order
                    .iter()
                    .filter_map(|device_id| state.devices.get(device_id))
                    .filter(|device| predicate(*device))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.devices.get(device_id).cloned())
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.state
            .read()
            .map(|state| state.devices.contains_key(device_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .map(|state| state.devices.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 加入新发现的设备。
    pub fn add_device(&self, device: Device) -> Result<Device, RegistryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?;
        if state.devices.contains_key(&device.device_id) {
            return Err(RegistryError::DeviceExists(device.device_id));
        }
        state.order.push(device.device_id.clone());
        state
            .devices
            .insert(device.device_id.clone(), device.clone());
        info!(
            target: "fleet.registry",
            device_id = %device.device_id,
            category = device.category.as_str(),
            "device_added"
        );
        Ok(device)
    }

    /// 显式移除设备；注册表从不隐式回收设备。
    pub fn remove_device(&self, device_id: &str) -> Result<Device, RegistryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?;
        let removed = state
            .devices
            .remove(device_id)
            .ok_or_else(|| RegistryError::DeviceNotFound(device_id.to_string()))?;
        state.order.retain(|item| item != device_id);
        info!(target: "fleet.registry", device_id = %device_id, "device_removed");
        Ok(removed)
    }

    /// 在写锁内对单台设备做原子修改，返回修改后的快照。
    ///
    /// `device_id` 不允许被修改，闭包中的改动会被还原。
    pub fn update<F>(&self, device_id: &str, mutate: F) -> Result<Device, RegistryError>
    where
        F: FnOnce(&mut Device),
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?;
        let device = state
            .devices
            .get_mut(device_id)
            .ok_or_else(|| RegistryError::DeviceNotFound(device_id.to_string()))?;
        mutate(device);
        device.device_id = device_id.to_string();
        Ok(device.clone())
    }

    pub fn set_status(&self, device_id: &str, status: DeviceStatus) -> Result<Device, RegistryError> {
        self.update(device_id, |device| device.status = status)
    }

    pub fn set_battery(&self, device_id: &str, level: Option<u8>) -> Result<Device, RegistryError> {
        self.update(device_id, |device| {
            device.battery_level = level.map(|value| value.min(100))
        })
    }

    pub fn set_motion_detection(
        &self,
        device_id: &str,
        enabled: bool,
    ) -> Result<Device, RegistryError> {
        self.update(device_id, |device| device.motion_detection_enabled = enabled)
    }

    pub fn rename(&self, device_id: &str, name: impl Into<String>) -> Result<Device, RegistryError> {
        let name = name.into();
        self.update(device_id, |device| device.name = name)
    }

    /// 记录设备侧事件时间；不会让 `last_activity_ms` 倒退。
    pub fn record_activity(&self, device_id: &str, ts_ms: i64) -> Result<Device, RegistryError> {
        self.update(device_id, |device| {
            device.last_activity_ms = latest(device.last_activity_ms, Some(ts_ms))
        })
    }
}

/// 取两个可选时间戳中较新的一个。
pub fn latest(current: Option<i64>, candidate: Option<i64>) -> Option<i64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
