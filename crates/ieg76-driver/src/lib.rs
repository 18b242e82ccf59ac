//! 驱动层模块
//!
//! 本模块提供 Weiss IEG 76 夹爪的设备驱动功能，包括：
//! - 读线程管理（持续解析状态帧）
//! - 状态同步（Mutex + Condvar，带边沿触发信号）
//! - 命令控制（张开 / 闭合 / 抓取 / 回零 / 关闭串口）
//! - 生命周期管理（启动重试、初始化、退出清理）
//!
//! # 数据流
//!
//! ```text
//! 读线程 ──▶ DeviceState（持续更新，触发边沿信号）
//! GripperController ──▶ SerialTransport ──▶ 设备
//! GripperController ◀── DeviceState（等待信号后读取快照）
//! ```

mod builder;
pub mod config;
pub mod controller;
mod error;
mod gripper;
pub mod metrics;
pub mod pipeline;
pub mod state;

pub use builder::GripperBuilder;
pub use config::{GripperConfig, PortConfig};
pub use controller::{CommandResult, ControllerConfig, GripperController};
pub use error::DriverError;
pub use gripper::Gripper;
pub use metrics::{ReaderMetrics, ReaderMetricsSnapshot};
pub use pipeline::{ReaderConfig, reader_loop};
pub use state::{DeviceState, DeviceStatus, EdgeSignal};

// 方便上层直接使用协议层和串口层的常用类型
pub use ieg76_protocol as protocol;
pub use ieg76_serial as serial;
