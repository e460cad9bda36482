//! 设备群批量操作协调器
//!
//! 一次批量调用的流程：
//! 1. 在调用时刻从注册表取一次快照，解析出目标设备（之后新增的设备不会被纳入）
//! 2. 目标为空时立即返回空结果
//! 3. 每台设备启动一个独立任务，经网关并发执行
//! 4. 汇总循环按完成顺序逐个记录结果（单一所有者，天然串行）
//! 5. 全部任务结束，或配置的截止时间到达后，返回唯一一份汇总结果
//!
//! 截止时间到达时尚未完成的设备记为 `Timeout`，对应任务被 abort；
//! 传输层调用是否真正中断取决于实现，迟到的结果不会再进入汇总。
//!
//! 协调器不做去重：同一批量操作并发调用两次，会各自取快照、各自 fan-out。

use crate::gateway::OperationGateway;
use crate::transport::DeviceTransport;
use domain::{
    BulkFailure, BulkOperation, BulkOperationResult, Device, DeviceError, DeviceOperation,
    MotionAlert, OperationOutcome,
};
use fleet_alerts::{AlertLog, DEFAULT_ALERT_CAPACITY};
use fleet_registry::{
    DEFAULT_LOW_BATTERY_THRESHOLD, DeviceRegistry, FleetHealthSummary, RegistryError,
};
use fleet_telemetry::{
    new_operation_id, record_bulk_completed, record_bulk_started, record_bulk_unit_failure,
    record_bulk_unit_success, record_bulk_unit_timeout,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};

/// 协调器参数。
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// 批量操作默认截止时间；`None` 时等待所有设备完成。
    pub bulk_timeout: Option<Duration>,
    pub alert_log_capacity: usize,
    pub low_battery_threshold: u8,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bulk_timeout: None,
            alert_log_capacity: DEFAULT_ALERT_CAPACITY,
            low_battery_threshold: DEFAULT_LOW_BATTERY_THRESHOLD,
        }
    }
}

/// 批量操作请求。
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub operation: BulkOperation,
    /// 显式目标；`None` 时取注册表中所有适用该操作的设备。
    pub targets: Option<Vec<String>>,
    /// 本次调用的截止时间，覆盖 `CoordinatorConfig::bulk_timeout`。
    pub timeout: Option<Duration>,
}

impl BulkRequest {
    pub fn new(operation: BulkOperation) -> Self {
        Self {
            operation,
            targets: None,
            timeout: None,
        }
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<BulkOperation> for BulkRequest {
    fn from(operation: BulkOperation) -> Self {
        Self::new(operation)
    }
}

struct CoordinatorInner {
    registry: Arc<DeviceRegistry>,
    alerts: AlertLog,
    gateway: OperationGateway,
    config: CoordinatorConfig,
}

/// 设备群协调器：持有注册表与告警日志，是设备字段唯一的写入方。
#[derive(Clone)]
pub struct FleetCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl FleetCoordinator {
    pub fn new(transport: Arc<dyn DeviceTransport>, config: CoordinatorConfig) -> Self {
        Self::with_devices(Vec::new(), transport, config)
    }

    pub fn with_devices(
        devices: impl IntoIterator<Item = Device>,
        transport: Arc<dyn DeviceTransport>,
        config: CoordinatorConfig,
    ) -> Self {
        let registry = Arc::new(DeviceRegistry::with_devices(devices));
        let gateway = OperationGateway::new(registry.clone(), transport);
        let inner = CoordinatorInner {
            registry,
            alerts: AlertLog::new(config.alert_log_capacity),
            gateway,
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ---- 设备查询 ----

    pub fn list_devices(&self) -> Vec<Device> {
        self.inner.registry.list_devices()
    }

    pub fn device(&self, device_id: &str) -> Option<Device> {
        self.inner.registry.get(device_id)
    }

    pub fn devices_where<F>(&self, predicate: F) -> Vec<Device>
    where
        F: Fn(&Device) -> bool,
    {
        self.inner.registry.devices_where(predicate)
    }

    pub fn low_battery_devices(&self) -> Vec<Device> {
        self.inner
            .registry
            .low_battery_devices(self.inner.config.low_battery_threshold)
    }

    pub fn offline_devices(&self) -> Vec<Device> {
        self.inner.registry.offline_devices()
    }

    pub fn motion_disabled_devices(&self) -> Vec<Device> {
        self.inner.registry.motion_disabled_devices()
    }

    pub fn health_summary(&self) -> FleetHealthSummary {
        self.inner
            .registry
            .health_summary(self.inner.config.low_battery_threshold)
    }

    // ---- 设备生命周期（由发现/添加流程调用） ----

    pub fn add_device(&self, device: Device) -> Result<Device, RegistryError> {
        self.inner.registry.add_device(device)
    }

    pub fn remove_device(&self, device_id: &str) -> Result<Device, RegistryError> {
        self.inner.registry.remove_device(device_id)
    }

    pub fn rename_device(
        &self,
        device_id: &str,
        name: impl Into<String>,
    ) -> Result<Device, RegistryError> {
        self.inner.registry.rename(device_id, name)
    }

    // ---- 单设备操作 ----

    /// 单设备操作，错误直接返回给调用方。
    pub async fn perform_single_device_operation(
        &self,
        operation: DeviceOperation,
        device_id: &str,
    ) -> Result<OperationOutcome, DeviceError> {
        self.inner.gateway.perform(operation, device_id).await
    }

    /// 回调形式的单设备操作；`completion` 恰好被调用一次。
    pub fn spawn_single_device_operation<F>(
        &self,
        operation: DeviceOperation,
        device_id: impl Into<String>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<OperationOutcome, DeviceError>) + Send + 'static,
    {
        let gateway = self.inner.gateway.clone();
        let device_id = device_id.into();
        tokio::spawn(async move {
            let result = gateway.perform(operation, &device_id).await;
            completion(result);
        })
    }

    // ---- 批量操作 ----

    /// 批量操作：所有目标设备结束（或截止时间到达）后返回唯一的汇总结果。
    pub async fn perform_bulk_operation(
        &self,
        request: impl Into<BulkRequest>,
    ) -> BulkOperationResult {
        let request = request.into();
        let operation_id = new_operation_id();
        let started_at = Instant::now();
        record_bulk_started();

        let targets = self.resolve_targets(&request);
        let timeout = request.timeout.or(self.inner.config.bulk_timeout);
        info!(
            target: "fleet.control",
            operation_id = %operation_id,
            operation = request.operation.name(),
            target_count = targets.len(),
            timeout_ms = ?timeout.map(|value| value.as_millis()),
            "bulk_operation_started"
        );

        let mut result = BulkOperationResult::empty(operation_id.clone(), request.operation);
        if !targets.is_empty() {
            self.fan_out(&request, &targets, timeout, &mut result).await;
        }

        record_bulk_completed(started_at.elapsed().as_millis() as u64);
        info!(
            target: "fleet.control",
            operation_id = %operation_id,
            operation = request.operation.name(),
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "bulk_operation_completed"
        );
        result
    }

    /// 回调形式的批量操作；`completion` 恰好被调用一次。
    pub fn spawn_bulk_operation<F>(
        &self,
        request: impl Into<BulkRequest>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(BulkOperationResult) + Send + 'static,
    {
        let coordinator = self.clone();
        let request = request.into();
        tokio::spawn(async move {
            let result = coordinator.perform_bulk_operation(request).await;
            completion(result);
        })
    }

    /// 调用时刻的目标快照；显式目标去重并保持原顺序。
    fn resolve_targets(&self, request: &BulkRequest) -> Vec<String> {
        match &request.targets {
            Some(targets) => {
                let mut seen = HashSet::new();
                targets
                    .iter()
                    .filter(|device_id| seen.insert(device_id.as_str()))
                    .cloned()
                    .collect()
            }
            None => self
                .inner
                .registry
                .devices_where(|device| request.operation.applies_to(device.category))
                .into_iter()
                .map(|device| device.device_id)
                .collect(),
        }
    }

    async fn fan_out(
        &self,
        request: &BulkRequest,
        targets: &[String],
        timeout: Option<Duration>,
        result: &mut BulkOperationResult,
    ) {
        let operation = request.operation.device_operation();
        let mut units = JoinSet::new();
        for device_id in targets {
            let gateway = self.inner.gateway.clone();
            let device_id = device_id.clone();
            units.spawn(async move {
                let outcome = gateway.perform(operation, &device_id).await;
                (device_id, outcome)
            });
        }

        let mut pending: HashSet<String> = targets.iter().cloned().collect();
        let deadline = timeout.map(|value| tokio::time::Instant::now() + value);
        let timed_out = collect_settled(&mut units, &mut pending, result, deadline).await;
        if timed_out {
            units.abort_all();
        }

        // 未结算的设备：超时，或任务异常退出（panic / abort）。
        for device_id in targets {
            if !pending.contains(device_id) {
                continue;
            }
            let error = if timed_out {
                record_bulk_unit_timeout();
                DeviceError::Timeout
            } else {
                record_bulk_unit_failure();
                DeviceError::Unknown("unit of work terminated abnormally".to_string())
            };
            warn!(
                target: "fleet.control",
                operation_id = %result.operation_id,
                device_id = %device_id,
                error = %error,
                "bulk_unit_unsettled"
            );
            result.failed.push(BulkFailure {
                device_id: device_id.clone(),
                error,
            });
        }
    }

    // ---- 告警 ----

    /// 追加告警；告警所属设备仍在注册表中时刷新其最近活动时间。
    pub fn append_alert(&self, alert: MotionAlert) -> Option<MotionAlert> {
        if self.inner.registry.contains(&alert.device_id) {
            let _ = self
                .inner
                .registry
                .record_activity(&alert.device_id, alert.ts_ms);
        }
        self.inner.alerts.append(alert)
    }

    pub fn recent_alerts(&self, limit: usize) -> Vec<MotionAlert> {
        self.inner.alerts.recent(limit)
    }

    pub fn alerts_for_device(&self, device_id: &str, limit: usize) -> Vec<MotionAlert> {
        self.inner.alerts.for_device(device_id, limit)
    }

    pub fn alerts_since(&self, since_ts_ms: i64, limit: usize) -> Vec<MotionAlert> {
        self.inner.alerts.since(since_ts_ms, limit)
    }

    /// 消费推送通道中的告警，直到发送端全部关闭。
    pub fn spawn_alert_listener(&self, mut receiver: mpsc::Receiver<MotionAlert>) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            while let Some(alert) = receiver.recv().await {
                info!(
                    target: "fleet.alerts",
                    alert_id = %alert.alert_id,
                    device_id = %alert.device_id,
                    alert_type = ?alert.alert_type,
                    confidence = alert.confidence,
                    "alert_received"
                );
                coordinator.append_alert(alert);
            }
            info!(target: "fleet.alerts", "alert_listener_closed");
        })
    }
}

/// 按完成顺序汇总结果，返回是否因截止时间提前结束。
async fn collect_settled(
    units: &mut JoinSet<(String, Result<OperationOutcome, DeviceError>)>,
    pending: &mut HashSet<String>,
    result: &mut BulkOperationResult,
    deadline: Option<tokio::time::Instant>,
) -> bool {
    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, units.join_next()).await {
                Ok(next) => next,
                Err(_) => return true,
            },
            None => units.join_next().await,
        };
        let Some(joined) = next else {
            return false;
        };
        match joined {
            Ok((device_id, outcome)) => {
                if !pending.remove(&device_id) {
                    continue;
                }
                match outcome {
                    Ok(_) => {
                        record_bulk_unit_success();
                        result.succeeded.push(device_id);
                    }
                    Err(error) => {
                        record_bulk_unit_failure();
                        result.failed.push(BulkFailure { device_id, error });
                    }
                }
            }
            Err(err) => {
                warn!(
                    target: "fleet.control",
                    operation_id = %result.operation_id,
                    error = %err,
                    "bulk_unit_join_failed"
                );
            }
        }
    }
}
