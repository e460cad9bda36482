//! 运动告警日志
//!
//! 有界、按插入顺序保存的告警缓冲区：
//! - 追加在尾部，超过容量时从头部淘汰最旧的告警（按插入先后，不按时间戳）
//! - 查询按最新优先返回
//! - 单写多读，RwLock 保护

use domain::MotionAlert;
use fleet_telemetry::{record_alert_appended, record_alert_evicted};
use std::collections::VecDeque;
use std::sync::RwLock;
use tracing::debug;

/// 默认容量。
pub const DEFAULT_ALERT_CAPACITY: usize = 50;

pub struct AlertLog {
    alerts: RwLock<VecDeque<MotionAlert>>,
    capacity: usize,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}

impl AlertLog {
    /// 容量最小为 1。
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alerts: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加告警，返回被淘汰的告警（如有）。
    pub fn append(&self, alert: MotionAlert) -> Option<MotionAlert> {
        let mut alerts = match self.alerts.write() {
            Ok(alerts) => alerts,
            Err(poisoned) => poisoned.into_inner(),
        };
        alerts.push_back(alert);
        record_alert_appended();
        if alerts.len() <= self.capacity {
            return None;
        }
        let evicted = alerts.pop_front();
        if let Some(evicted) = &evicted {
            record_alert_evicted();
            debug!(
                target: "fleet.alerts",
                alert_id = %evicted.alert_id,
                device_id = %evicted.device_id,
                "alert_evicted"
            );
        }
        evicted
    }

    /// 最近 `limit` 条告警，最新优先。
    pub fn recent(&self, limit: usize) -> Vec<MotionAlert> {
        self.collect_recent(limit, |_| true)
    }

    /// 指定设备的最近告警，保持最新优先的相对顺序。
    pub fn for_device(&self, device_id: &str, limit: usize) -> Vec<MotionAlert> {
        self.collect_recent(limit, |alert| alert.device_id == device_id)
    }

    /// 时间戳不早于 `since_ts_ms` 的最近告警。
    pub fn since(&self, since_ts_ms: i64, limit: usize) -> Vec<MotionAlert> {
        self.collect_recent(limit, |alert| alert.ts_ms >= since_ts_ms)
    }

    pub fn len(&self) -> usize {
        self.alerts.read().map(|alerts| alerts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut alerts) = self.alerts.write() {
            alerts.clear();
        }
    }

    fn collect_recent<F>(&self, limit: usize, filter: F) -> Vec<MotionAlert>
    where
        F: Fn(&MotionAlert) -> bool,
    {
        self.alerts
            .read()
            .map(|alerts| {
                alerts
                    .iter()
                    .rev()
                    .filter(|alert| filter(*alert))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
