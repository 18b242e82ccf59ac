//! 驱动配置
//!
//! 所有字段都有默认值；启用 `serde` feature 后可以从 TOML 部分覆盖：
//!
//! ```toml
//! initialize = true
//!
//! [port]
//! path = "/dev/ttyACM1"
//! max_open_attempts = 10
//!
//! [controller]
//! motion_timeout_ms = 5000
//! ```

use crate::controller::ControllerConfig;
use crate::pipeline::ReaderConfig;
use ieg76_serial::{DEFAULT_BAUD_RATE, DEFAULT_PORT_PATH, RetryPolicy};
use std::time::Duration;

/// 串口配置
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PortConfig {
    /// 设备路径
    pub path: String,
    /// 波特率
    pub baud_rate: u32,
    /// 打开失败后的重试间隔（毫秒）
    pub retry_backoff_ms: u64,
    /// 最大打开次数（`None` 表示无限重试）
    pub max_open_attempts: Option<u32>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PORT_PATH.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            retry_backoff_ms: 1000,
            max_open_attempts: None,
        }
    }
}

impl PortConfig {
    /// 转换为串口层的重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_millis(self.retry_backoff_ms),
            max_attempts: self.max_open_attempts,
        }
    }
}

/// 驱动总配置
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GripperConfig {
    pub port: PortConfig,
    pub controller: ControllerConfig,
    pub reader: ReaderConfig,
    /// 启动后是否发送初始化序列
    pub initialize: bool,
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            port: PortConfig::default(),
            controller: ControllerConfig::default(),
            reader: ReaderConfig::default(),
            initialize: true,
        }
    }
}
