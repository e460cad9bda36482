//! # Fleet Control 模块
//!
//! 设备操作链路：
//!
//! - [`transport`]：设备传输抽象 `DeviceTransport`，以及进程内的 `ScriptedTransport`
//! - [`gateway`]：单设备请求/响应网关，确认成功后回写注册表
//! - [`coordinator`]：设备群协调器，批量操作 fan-out / fan-in、告警接入与查询
//!
//! 设备错误永远以 `DeviceError` 值返回；批量操作中单台设备失败不会中断整批。

pub mod coordinator;
pub mod gateway;
pub mod transport;

pub use coordinator::{BulkRequest, CoordinatorConfig, FleetCoordinator};
pub use gateway::OperationGateway;
pub use transport::{DeviceScript, DeviceTransport, ScriptedTransport};
