use domain::{BulkOperation, BulkOperationResult, Device, DeviceCategory, DeviceError, DeviceStatus};
use fleet_control::{BulkRequest, CoordinatorConfig, DeviceScript, FleetCoordinator, ScriptedTransport};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const ALL_OPERATIONS: [BulkOperation; 4] = [
    BulkOperation::CaptureSnapshotsFromAllCameras,
    BulkOperation::EnableMotionDetectionForAll,
    BulkOperation::DisableMotionDetectionForAll,
    BulkOperation::RefreshAll,
];

fn camera(device_id: &str) -> Device {
    Device::new(device_id, format!("Camera {}", device_id), DeviceCategory::Camera)
}

fn succeeded_set(result: &BulkOperationResult) -> HashSet<String> {
    result.succeeded.iter().cloned().collect()
}

fn failed_set(result: &BulkOperationResult) -> HashSet<String> {
    result
        .failed
        .iter()
        .map(|failure| failure.device_id.clone())
        .collect()
}

fn set_of(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn snapshots_with_one_offline_camera() {
    let transport = Arc::new(ScriptedTransport::new().with_script(
        "cam-3",
        DeviceScript::failing(DeviceError::Unreachable("timeout".to_string())),
    ));
    let coordinator = FleetCoordinator::with_devices(
        vec![
            camera("cam-1").with_status(DeviceStatus::Online),
            camera("cam-2").with_status(DeviceStatus::Online),
            camera("cam-3").with_status(DeviceStatus::Offline),
        ],
        transport,
        CoordinatorConfig::default(),
    );

    let result = coordinator
        .perform_bulk_operation(BulkOperation::CaptureSnapshotsFromAllCameras)
        .await;
    assert_eq!(result.succeeded.len(), 2);
    assert_eq!(succeeded_set(&result), set_of(&["cam-1", "cam-2"]));
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].device_id, "cam-3");
    assert_eq!(
        result.failed[0].error,
        DeviceError::Unreachable("timeout".to_string())
    );
    assert_eq!(
        coordinator.device("cam-3").expect("device").status,
        DeviceStatus::Offline
    );
}

#[tokio::test]
async fn empty_registry_returns_empty_result() {
    let transport = Arc::new(ScriptedTransport::new());
    let coordinator = FleetCoordinator::new(transport.clone(), CoordinatorConfig::default());
    for operation in ALL_OPERATIONS {
        let result = coordinator.perform_bulk_operation(operation).await;
        assert!(result.succeeded.is_empty());
        assert!(result.failed.is_empty());
        assert_eq!(result.operation, operation);
        assert_eq!(result.target_count(), 0);
    }
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn default_targets_follow_category() {
    let transport = Arc::new(ScriptedTransport::new());
    let coordinator = FleetCoordinator::with_devices(
        vec![
            camera("cam-1"),
            Device::new("bell-1", "Front", DeviceCategory::Doorbell),
            Device::new("sensor-1", "Hall", DeviceCategory::MotionSensor),
            Device::new("flood-1", "Drive", DeviceCategory::Floodlight),
            Device::new("chime-1", "Kitchen", DeviceCategory::Chime),
        ],
        transport.clone(),
        CoordinatorConfig::default(),
    );

    let snapshots = coordinator
        .perform_bulk_operation(BulkOperation::CaptureSnapshotsFromAllCameras)
        .await;
    assert_eq!(succeeded_set(&snapshots), set_of(&["cam-1", "bell-1"]));

    let disable = coordinator
        .perform_bulk_operation(BulkOperation::DisableMotionDetectionForAll)
        .await;
    assert_eq!(
        succeeded_set(&disable),
        set_of(&["cam-1", "bell-1", "sensor-1", "flood-1"])
    );
    assert_eq!(transport.calls("chime-1"), 0);

    let refresh = coordinator
        .perform_bulk_operation(BulkOperation::RefreshAll)
        .await;
    assert_eq!(refresh.target_count(), 5);
    assert_eq!(transport.calls("chime-1"), 1);
}

#[tokio::test]
async fn failed_devices_keep_their_fields() {
    let transport = Arc::new(ScriptedTransport::new().with_script(
        "cam-2",
        DeviceScript::failing(DeviceError::Rejected("firmware update".to_string())),
    ));
    let coordinator = FleetCoordinator::with_devices(
        vec![camera("cam-1"), camera("cam-2"), camera("cam-3")],
        transport,
        CoordinatorConfig::default(),
    );
    let result = coordinator
        .perform_bulk_operation(BulkOperation::DisableMotionDetectionForAll)
        .await;
    assert_eq!(succeeded_set(&result), set_of(&["cam-1", "cam-3"]));
    assert_eq!(failed_set(&result), set_of(&["cam-2"]));

    let failed = coordinator.device("cam-2").expect("device");
    assert!(failed.motion_detection_enabled);
    assert_eq!(failed.status, DeviceStatus::Unknown);
    for device_id in ["cam-1", "cam-3"] {
        let device = coordinator.device(device_id).expect("device");
        assert!(!device.motion_detection_enabled);
        assert_eq!(device.status, DeviceStatus::Online);
    }
    let disabled: HashSet<String> = coordinator
        .motion_disabled_devices()
        .into_iter()
        .map(|device| device.device_id)
        .collect();
    assert_eq!(disabled, set_of(&["cam-1", "cam-3"]));
}

#[tokio::test(start_paused = true)]
async fn timeout_demotes_slow_device() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_script("cam-1", DeviceScript::ok().with_delay(Duration::from_millis(100)))
            .with_script("cam-2", DeviceScript::ok().with_delay(Duration::from_millis(200)))
            .with_script("cam-slow", DeviceScript::ok().with_delay(Duration::from_secs(5))),
    );
    let coordinator = FleetCoordinator::with_devices(
        vec![camera("cam-1"), camera("cam-2"), camera("cam-slow")],
        transport,
        CoordinatorConfig {
            bulk_timeout: Some(Duration::from_secs(1)),
            ..CoordinatorConfig::default()
        },
    );

    let started = tokio::time::Instant::now();
    let result = coordinator
        .perform_bulk_operation(BulkOperation::DisableMotionDetectionForAll)
        .await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(succeeded_set(&result), set_of(&["cam-1", "cam-2"]));
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].device_id, "cam-slow");
    assert_eq!(result.failed[0].error, DeviceError::Timeout);

    // 迟到的结果不会回写注册表。
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(
        coordinator
            .device("cam-slow")
            .expect("device")
            .motion_detection_enabled
    );
}

#[tokio::test(start_paused = true)]
async fn request_timeout_overrides_config() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_script("cam-1", DeviceScript::ok().with_delay(Duration::from_secs(3))),
    );
    let coordinator = FleetCoordinator::with_devices(
        vec![camera("cam-1")],
        transport,
        CoordinatorConfig {
            bulk_timeout: Some(Duration::from_secs(10)),
            ..CoordinatorConfig::default()
        },
    );
    let result = coordinator
        .perform_bulk_operation(
            BulkRequest::new(BulkOperation::RefreshAll).with_timeout(Duration::from_secs(1)),
        )
        .await;
    assert_eq!(result.failure_for("cam-1"), Some(&DeviceError::Timeout));
}

#[tokio::test(start_paused = true)]
async fn no_timeout_waits_for_every_device() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_script("cam-slow", DeviceScript::ok().with_delay(Duration::from_secs(30))),
    );
    let coordinator = FleetCoordinator::with_devices(
        vec![camera("cam-1"), camera("cam-slow")],
        transport,
        CoordinatorConfig::default(),
    );
    let started = tokio::time::Instant::now();
    let result = coordinator
        .perform_bulk_operation(BulkOperation::RefreshAll)
        .await;
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(result.is_complete_success());
    assert_eq!(result.target_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn units_run_concurrently() {
    let mut transport = ScriptedTransport::new();
    let mut devices = Vec::new();
    for index in 0..6 {
        let device_id = format!("cam-{}", index);
        transport = transport.with_script(
            device_id.clone(),
            DeviceScript::ok().with_delay(Duration::from_secs(1)),
        );
        devices.push(camera(&device_id));
    }
    let transport = Arc::new(transport);
    let coordinator =
        FleetCoordinator::with_devices(devices, transport.clone(), CoordinatorConfig::default());

    let started = tokio::time::Instant::now();
    let result = coordinator
        .perform_bulk_operation(BulkOperation::CaptureSnapshotsFromAllCameras)
        .await;
    assert_eq!(result.succeeded.len(), 6);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(transport.max_in_flight(), 6);
}

#[tokio::test]
async fn explicit_targets_are_deduplicated_and_all_accounted() {
    let transport = Arc::new(ScriptedTransport::new());
    let coordinator = FleetCoordinator::with_devices(
        vec![
            camera("cam-1"),
            Device::new("chime-1", "Hall", DeviceCategory::Chime),
        ],
        transport.clone(),
        CoordinatorConfig::default(),
    );
    let result = coordinator
        .perform_bulk_operation(
            BulkRequest::new(BulkOperation::CaptureSnapshotsFromAllCameras)
                .with_targets(["cam-1", "cam-1", "chime-1", "ghost"]),
        )
        .await;
    assert_eq!(result.target_count(), 3);
    assert_eq!(succeeded_set(&result), set_of(&["cam-1"]));
    assert_eq!(
        result.failure_for("ghost"),
        Some(&DeviceError::NotFound("ghost".to_string()))
    );
    assert!(matches!(
        result.failure_for("chime-1"),
        Some(DeviceError::Rejected(_))
    ));
    assert_eq!(transport.calls("cam-1"), 1);
}

#[tokio::test(start_paused = true)]
async fn target_snapshot_taken_at_invocation() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_script("cam-1", DeviceScript::ok().with_delay(Duration::from_secs(1))),
    );
    let coordinator = FleetCoordinator::with_devices(
        vec![camera("cam-1")],
        transport.clone(),
        CoordinatorConfig::default(),
    );
    let late_add = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        coordinator.add_device(camera("cam-late")).expect("add");
    };
    let (result, ()) = tokio::join!(
        coordinator.perform_bulk_operation(BulkOperation::CaptureSnapshotsFromAllCameras),
        late_add
    );
    assert_eq!(result.target_count(), 1);
    assert_eq!(transport.calls("cam-late"), 0);
    assert!(coordinator.device("cam-late").is_some());
}

#[tokio::test]
async fn spawned_bulk_completion_fires_once() {
    let transport = Arc::new(ScriptedTransport::new());
    let coordinator = FleetCoordinator::with_devices(
        vec![camera("cam-1"), camera("cam-2")],
        transport,
        CoordinatorConfig::default(),
    );
    let fired = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = tokio::sync::oneshot::channel();
    let counter = fired.clone();
    let handle = coordinator.spawn_bulk_operation(
        BulkOperation::RefreshAll,
        move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        },
    );
    handle.await.expect("join");
    let result = rx.await.expect("result");
    assert_eq!(result.target_count(), 2);
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    let empty = FleetCoordinator::new(Arc::new(ScriptedTransport::new()), Default::default());
    let fired_empty = Arc::new(AtomicUsize::new(0));
    let counter = fired_empty.clone();
    empty
        .spawn_bulk_operation(BulkOperation::RefreshAll, move |result| {
            assert_eq!(result.target_count(), 0);
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .expect("join");
    assert_eq!(fired_empty.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_bulk_operations_keep_registry_consistent() {
    let mut transport = ScriptedTransport::new();
    let mut devices = Vec::new();
    for index in 0..12 {
        let device_id = format!("cam-{}", index);
        transport = transport.with_script(
            device_id.clone(),
            DeviceScript::ok().with_delay(Duration::from_millis((index % 4) * 5)),
        );
        devices.push(camera(&device_id).with_battery(50));
    }
    let coordinator =
        FleetCoordinator::with_devices(devices, Arc::new(transport), CoordinatorConfig::default());

    let (enable, disable) = tokio::join!(
        coordinator.perform_bulk_operation(BulkOperation::EnableMotionDetectionForAll),
        coordinator.perform_bulk_operation(BulkOperation::DisableMotionDetectionForAll),
    );
    assert_eq!(enable.target_count(), 12);
    assert_eq!(disable.target_count(), 12);
    assert!(enable.is_complete_success());
    assert!(disable.is_complete_success());
    assert_ne!(enable.operation_id, disable.operation_id);

    for device in coordinator.list_devices() {
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.battery_level, Some(50));
        assert_eq!(device.category, DeviceCategory::Camera);
    }
    assert_eq!(coordinator.list_devices().len(), 12);
}
