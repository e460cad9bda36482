//! 健康度派生查询
//!
//! 纯只读投影，无副作用、无错误分支。

use crate::DeviceRegistry;
use domain::{Device, DeviceCategory, DeviceStatus};
use std::collections::HashMap;

/// 默认低电量阈值（含）。
pub const DEFAULT_LOW_BATTERY_THRESHOLD: u8 = 20;

/// 设备群健康度统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetHealthSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub unknown: usize,
    pub low_battery: usize,
    pub motion_disabled: usize,
}

pub fn is_low_battery(device: &Device, threshold: u8) -> bool {
    matches!(device.battery_level, Some(level) if level <= threshold)
}

pub fn is_offline(device: &Device) -> bool {
    device.status == DeviceStatus::Offline
}

pub fn is_motion_disabled(device: &Device) -> bool {
    !device.motion_detection_enabled
}

pub fn summarize(devices: &[Device], low_battery_threshold: u8) -> FleetHealthSummary {
    let mut summary = FleetHealthSummary {
        total: devices.len(),
        ..FleetHealthSummary::default()
    };
    for device in devices {
        match device.status {
            DeviceStatus::Online => summary.online += 1,
            DeviceStatus::Offline => summary.offline += 1,
            DeviceStatus::Unknown => summary.unknown += 1,
        }
        if is_low_battery(device, low_battery_threshold) {
            summary.low_battery += 1;
        }
        if is_motion_disabled(device) {
            summary.motion_disabled += 1;
        }
    }
    summary
}

impl DeviceRegistry {
    pub fn low_battery_devices(&self, threshold: u8) -> Vec<Device> {
        self.devices_where(|device| is_low_battery(device, threshold))
    }

    pub fn offline_devices(&self) -> Vec<Device> {
        self.devices_where(is_offline)
    }

    pub fn motion_disabled_devices(&self) -> Vec<Device> {
        self.devices_where(is_motion_disabled)
    }

    pub fn devices_by_category(&self) -> HashMap<DeviceCategory, Vec<Device>> {
        let mut grouped: HashMap<DeviceCategory, Vec<Device>> = HashMap::new();
        for device in self.list_devices() {
            grouped.entry(device.category).or_default().push(device);
        }
        grouped
    }

    /// 基于同一份快照计算的统计，各计数之间一致。
    pub fn health_summary(&self, low_battery_threshold: u8) -> FleetHealthSummary {
        summarize(&self.list_devices(), low_battery_threshold)
    }
}
