//! 设备群演示程序：加载配置、初始化日志，在脚本化设备群上跑一轮批量操作与告警接入。

use domain::{
    AlertType, BulkOperation, Device, DeviceCategory, DeviceError, DeviceStatus, MotionAlert,
    now_epoch_ms,
};
use fleet_config::FleetConfig;
use fleet_control::{CoordinatorConfig, DeviceScript, FleetCoordinator, ScriptedTransport};
use fleet_telemetry::{init_tracing, metrics};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let config = FleetConfig::from_env()?;
    init_tracing();

    let (devices, transport) = demo_fleet();
    let coordinator =
        FleetCoordinator::with_devices(devices, Arc::new(transport), coordinator_config(&config));

    // 模拟推送通道
    let (alert_tx, alert_rx) = mpsc::channel(config.alert_channel_capacity);
    let listener = coordinator.spawn_alert_listener(alert_rx);
    let now_ms = now_epoch_ms();
    for (index, (device_id, alert_type)) in [
        ("cam-front", AlertType::Person),
        ("bell-door", AlertType::Doorbell),
        ("cam-drive", AlertType::Vehicle),
        ("bell-door", AlertType::Package),
    ]
    .into_iter()
    .enumerate()
    {
        let alert = MotionAlert::new(
            uuid::Uuid::new_v4().to_string(),
            device_id,
            now_ms + index as i64,
            0.75,
            alert_type,
        );
        alert_tx.send(alert).await?;
    }
    drop(alert_tx);
    listener.await?;

    for operation in [
        BulkOperation::RefreshAll,
        BulkOperation::CaptureSnapshotsFromAllCameras,
        BulkOperation::DisableMotionDetectionForAll,
        BulkOperation::EnableMotionDetectionForAll,
    ] {
        let result = coordinator.perform_bulk_operation(operation).await;
        info!(
            target: "fleet.demo",
            operation_id = %result.operation_id,
            summary = %result.summary(),
            result = %serde_json::to_string(&result)?,
            "bulk_result"
        );
    }

    let health = coordinator.health_summary();
    info!(
        target: "fleet.demo",
        total = health.total,
        online = health.online,
        offline = health.offline,
        unknown = health.unknown,
        low_battery = health.low_battery,
        motion_disabled = health.motion_disabled,
        recent_alerts = coordinator.recent_alerts(10).len(),
        "fleet_health"
    );
    info!(target: "fleet.demo", metrics = ?metrics().snapshot(), "metrics_snapshot");
    Ok(())
}

fn coordinator_config(config: &FleetConfig) -> CoordinatorConfig {
    CoordinatorConfig {
        bulk_timeout: config.bulk_timeout(),
        alert_log_capacity: config.alert_log_capacity,
        low_battery_threshold: config.low_battery_threshold,
    }
}

/// 演示设备群：一台离线摄像头、一台响应缓慢的泛光灯、一台拒绝操作的传感器。
fn demo_fleet() -> (Vec<Device>, ScriptedTransport) {
    let devices = vec![
        Device::new("cam-front", "Front yard", DeviceCategory::Camera)
            .with_status(DeviceStatus::Online)
            .with_battery(64),
        Device::new("cam-drive", "Driveway", DeviceCategory::Camera)
            .with_status(DeviceStatus::Online)
            .with_battery(18),
        Device::new("cam-garage", "Garage", DeviceCategory::Camera)
            .with_status(DeviceStatus::Offline),
        Device::new("bell-door", "Front door", DeviceCategory::Doorbell).with_battery(90),
        Device::new("sensor-hall", "Hallway", DeviceCategory::MotionSensor).with_battery(40),
        Device::new("flood-back", "Backyard", DeviceCategory::Floodlight),
        Device::new("chime-kitchen", "Kitchen", DeviceCategory::Chime),
    ];
    let transport = ScriptedTransport::new()
        .with_script(
            "cam-front",
            DeviceScript::ok()
                .with_delay(Duration::from_millis(120))
                .with_battery(63),
        )
        .with_script(
            "cam-drive",
            DeviceScript::ok()
                .with_delay(Duration::from_millis(80))
                .with_battery(17),
        )
        .with_script(
            "cam-garage",
            DeviceScript::failing(DeviceError::Unreachable("no route to host".to_string()))
                .with_delay(Duration::from_millis(300)),
        )
        .with_script(
            "bell-door",
            DeviceScript::ok()
                .with_delay(Duration::from_millis(60))
                .with_battery(89),
        )
        .with_script(
            "sensor-hall",
            DeviceScript::failing(DeviceError::Rejected("device is arming".to_string())),
        )
        .with_script(
            "flood-back",
            DeviceScript::ok().with_delay(Duration::from_millis(900)),
        );
    (devices, transport)
}
