use serde::{Deserialize, Serialize};

/// 设备类别（封闭集合，消费处必须穷举匹配）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceCategory {
    Camera,
    Doorbell,
    MotionSensor,
    Floodlight,
    Chime,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 5] = [
        DeviceCategory::Camera,
        DeviceCategory::Doorbell,
        DeviceCategory::MotionSensor,
        DeviceCategory::Floodlight,
        DeviceCategory::Chime,
    ];

    /// 是否具备拍摄快照能力。
    pub fn supports_snapshot(self) -> bool {
        match self {
            DeviceCategory::Camera | DeviceCategory::Doorbell => true,
            DeviceCategory::MotionSensor | DeviceCategory::Floodlight | DeviceCategory::Chime => {
                false
            }
        }
    }

    /// 是否具备运动检测开关。
    pub fn supports_motion_detection(self) -> bool {
        match self {
            DeviceCategory::Camera
            | DeviceCategory::Doorbell
            | DeviceCategory::MotionSensor
            | DeviceCategory::Floodlight => true,
            DeviceCategory::Chime => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceCategory::Camera => "camera",
            DeviceCategory::Doorbell => "doorbell",
            DeviceCategory::MotionSensor => "motionSensor",
            DeviceCategory::Floodlight => "floodlight",
            DeviceCategory::Chime => "chime",
        }
    }
}

/// 设备在线状态；首次成功通信前为 `Unknown`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Unknown => "unknown",
        }
    }
}

/// 设备记录。
///
/// `device_id` 创建后不变；其余字段只在传输层确认成功后由网关更新。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub category: DeviceCategory,
    pub status: DeviceStatus,
    /// 电量 0–100；市电供电设备为 `None`。
    pub battery_level: Option<u8>,
    pub motion_detection_enabled: bool,
    pub last_activity_ms: Option<i64>,
}

impl Device {
    /// 新发现的设备：状态未知、运动检测开启、无电量与活动记录。
    pub fn new(
        device_id: impl Into<String>,
        name: impl Into<String>,
        category: DeviceCategory,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            name: name.into(),
            category,
            status: DeviceStatus::Unknown,
            battery_level: None,
            motion_detection_enabled: true,
            last_activity_ms: None,
        }
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// 电量超过 100 时截断为 100。
    pub fn with_battery(mut self, level: u8) -> Self {
        self.battery_level = Some(level.min(100));
        self
    }

    pub fn with_motion_detection(mut self, enabled: bool) -> Self {
        self.motion_detection_enabled = enabled;
        self
    }

    pub fn is_battery_powered(&self) -> bool {
        self.battery_level.is_some()
    }
}
