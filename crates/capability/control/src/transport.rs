//! 设备传输抽象与脚本化实现。

use async_trait::async_trait;
use domain::{DeviceError, DeviceOperation, DeviceStatus, OperationOutcome, now_epoch_ms};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 设备传输层抽象。
///
/// 具体网络协议、认证与序列化都属于实现方；调用可能挂起，结果只有成功或
/// `DeviceError` 两种。
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn send(
        &self,
        operation: DeviceOperation,
        device_id: &str,
    ) -> Result<OperationOutcome, DeviceError>;
}

/// 单台设备的脚本：延迟后成功或失败。
#[derive(Debug, Clone, Default)]
pub struct DeviceScript {
    pub delay: Duration,
    pub failure: Option<DeviceError>,
    /// `Refresh` 成功时上报的电量。
    pub battery_level: Option<u8>,
}

impl DeviceScript {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(error: DeviceError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_battery(mut self, level: u8) -> Self {
        self.battery_level = Some(level.min(100));
        self
    }
}

/// 进程内脚本化传输（演示与测试用）。
///
/// 未配置脚本的设备按 `DeviceScript::ok()` 处理。
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, DeviceScript>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, device_id: impl Into<String>, script: DeviceScript) -> Self {
        self.set_script(device_id, script);
        self
    }

    pub fn set_script(&self, device_id: impl Into<String>, script: DeviceScript) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert(device_id.into(), script);
        }
    }

    /// 指定设备被调用的次数。
    pub fn calls(&self, device_id: &str) -> usize {
        self.calls
            .lock()
            .ok()
            .and_then(|calls| calls.get(device_id).copied())
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum::<usize>())
            .unwrap_or(0)
    }

    /// 同时处于挂起状态的调用数峰值。
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn script_for(&self, device_id: &str) -> DeviceScript {
        self.scripts
            .lock()
            .ok()
            .and_then(|scripts| scripts.get(device_id).cloned())
            .unwrap_or_default()
    }

    fn record_call(&self, device_id: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(device_id.to_string()).or_insert(0) += 1;
        }
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn send(
        &self,
        operation: DeviceOperation,
        device_id: &str,
    ) -> Result<OperationOutcome, DeviceError> {
        self.record_call(device_id);
        let script = self.script_for(device_id);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        if let Some(error) = script.failure {
            return Err(error);
        }
        Ok(success_outcome(operation, script.battery_level))
    }
}

/// 调用结束（含被取消）时归还 in-flight 计数。
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn success_outcome(operation: DeviceOperation, battery_level: Option<u8>) -> OperationOutcome {
    match operation {
        DeviceOperation::CaptureSnapshot => OperationOutcome::SnapshotCaptured {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            captured_at_ms: now_epoch_ms(),
        },
        DeviceOperation::SetMotionDetection { enabled } => {
            OperationOutcome::MotionDetectionSet { enabled }
        }
        DeviceOperation::Refresh => OperationOutcome::Refreshed {
            status: DeviceStatus::Online,
            battery_level,
            last_activity_ms: None,
        },
    }
}
