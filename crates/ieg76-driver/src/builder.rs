//! Builder 模式实现
//!
//! 提供链式构造 `Gripper` 实例的便捷方式。

use crate::config::GripperConfig;
use crate::error::DriverError;
use crate::gripper::Gripper;
use ieg76_serial::{RetryPolicy, SystemSerialAdapter, open_with_retry};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Gripper Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use ieg76_driver::GripperBuilder;
///
/// // 最多尝试 5 次打开串口，每次间隔 1 秒
/// let gripper = GripperBuilder::new()
///     .port("/dev/ttyACM1")
///     .max_open_attempts(5)
///     .build()
///     .unwrap();
/// ```
pub struct GripperBuilder {
    config: GripperConfig,
    /// 外部运行标志（Ctrl-C 时清除，可中断打开重试）
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for GripperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GripperBuilder {
    pub fn new() -> Self {
        Self {
            config: GripperConfig::default(),
            shutdown_flag: None,
        }
    }

    /// 替换整份配置（之后的链式调用在其基础上覆盖）
    pub fn config(mut self, config: GripperConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置串口路径（可选，默认 `/dev/ttyACM0`）
    pub fn port(mut self, path: impl Into<String>) -> Self {
        self.config.port.path = path.into();
        self
    }

    /// 设置波特率（可选，默认 9600）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.port.baud_rate = baud_rate;
        self
    }

    /// 设置打开重试策略
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.port.retry_backoff_ms = policy.backoff.as_millis() as u64;
        self.config.port.max_open_attempts = policy.max_attempts;
        self
    }

    /// 限制打开串口的尝试次数
    pub fn max_open_attempts(mut self, attempts: u32) -> Self {
        self.config.port.max_open_attempts = Some(attempts);
        self
    }

    /// 是否在启动后发送初始化序列（默认发送）
    pub fn initialize(mut self, initialize: bool) -> Self {
        self.config.initialize = initialize;
        self
    }

    /// 共享运行标志
    ///
    /// 清除该标志会中断正在进行的打开重试，并让读线程退出。
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// 打开串口（按重试策略）并启动驱动
    ///
    /// # 错误
    /// - `DriverError::Serial`: 重试耗尽或被停止信号中断
    /// - `DriverError::IoThread`: 读线程启动失败
    pub fn build(self) -> Result<Gripper, DriverError> {
        let is_running = self.shutdown_flag.unwrap_or_else(|| Arc::new(AtomicBool::new(true)));
        let port = &self.config.port;

        let adapter = open_with_retry(&port.path, &port.retry_policy(), &is_running, || {
            SystemSerialAdapter::open(&port.path, port.baud_rate)
        })?;

        Gripper::with_running_flag(adapter, self.config, is_running)
    }

    /// 当前配置（用于检查链式调用的结果）
    pub fn current_config(&self) -> &GripperConfig {
        &self.config
    }
}
