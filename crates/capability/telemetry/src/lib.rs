//! 追踪初始化、操作 ID 生成与基础计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bulk_operations_started: u64,
    pub bulk_operations_completed: u64,
    pub bulk_unit_success: u64,
    pub bulk_unit_failure: u64,
    pub bulk_unit_timeout: u64,
    pub bulk_latency_ms_total: u64,
    pub bulk_latency_ms_count: u64,
    pub single_operations: u64,
    pub single_operation_failure: u64,
    pub alerts_appended: u64,
    pub alerts_evicted: u64,
}

/// 进程级计数指标。
pub struct TelemetryMetrics {
    bulk_operations_started: AtomicU64,
    bulk_operations_completed: AtomicU64,
    bulk_unit_success: AtomicU64,
    bulk_unit_failure: AtomicU64,
    bulk_unit_timeout: AtomicU64,
    bulk_latency_ms_total: AtomicU64,
    bulk_latency_ms_count: AtomicU64,
    single_operations: AtomicU64,
    single_operation_failure: AtomicU64,
    alerts_appended: AtomicU64,
    alerts_evicted: AtomicU64,
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            bulk_operations_started: AtomicU64::new(0),
            bulk_operations_completed: AtomicU64::new(0),
            bulk_unit_success: AtomicU64::new(0),
            bulk_unit_failure: AtomicU64::new(0),
            bulk_unit_timeout: AtomicU64::new(0),
            bulk_latency_ms_total: AtomicU64::new(0),
            bulk_latency_ms_count: AtomicU64::new(0),
            single_operations: AtomicU64::new(0),
            single_operation_failure: AtomicU64::new(0),
            alerts_appended: AtomicU64::new(0),
            alerts_evicted: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bulk_operations_started: self.bulk_operations_started.load(Ordering::Relaxed),
            bulk_operations_completed: self.bulk_operations_completed.load(Ordering::Relaxed),
            bulk_unit_success: self.bulk_unit_success.load(Ordering::Relaxed),
            bulk_unit_failure: self.bulk_unit_failure.load(Ordering::Relaxed),
            bulk_unit_timeout: self.bulk_unit_timeout.load(Ordering::Relaxed),
            bulk_latency_ms_total: self.bulk_latency_ms_total.load(Ordering::Relaxed),
            bulk_latency_ms_count: self.bulk_latency_ms_count.load(Ordering::Relaxed),
            single_operations: self.single_operations.load(Ordering::Relaxed),
            single_operation_failure: self.single_operation_failure.load(Ordering::Relaxed),
            alerts_appended: self.alerts_appended.load(Ordering::Relaxed),
            alerts_evicted: self.alerts_evicted.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。重复调用无副作用。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成批量操作 ID，用于关联同一次 fan-out 的日志。
pub fn new_operation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录批量操作开始次数。
pub fn record_bulk_started() {
    metrics()
        .bulk_operations_started
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录批量操作完成次数及耗时（毫秒，从解析目标到汇总交付）。
pub fn record_bulk_completed(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .bulk_operations_completed
        .fetch_add(1, Ordering::Relaxed);
    metrics
        .bulk_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .bulk_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_bulk_unit_success() {
    metrics().bulk_unit_success.fetch_add(1, Ordering::Relaxed);
}

pub fn record_bulk_unit_failure() {
    metrics().bulk_unit_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录因截止时间被判定为超时的设备数。
pub fn record_bulk_unit_timeout() {
    metrics().bulk_unit_timeout.fetch_add(1, Ordering::Relaxed);
}

/// 记录单设备操作次数（含批量内的每台设备）。
pub fn record_single_operation() {
    metrics().single_operations.fetch_add(1, Ordering::Relaxed);
}

pub fn record_single_operation_failure() {
    metrics()
        .single_operation_failure
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_alert_appended() {
    metrics().alerts_appended.fetch_add(1, Ordering::Relaxed);
}

pub fn record_alert_evicted() {
    metrics().alerts_evicted.fetch_add(1, Ordering::Relaxed);
}
