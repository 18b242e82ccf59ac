//! 串口打开重试
//!
//! 驱动离开串口无法工作，且通常无人值守地等待设备插入，
//! 因此默认策略是无限重试、固定 1 秒退避。

use crate::SerialError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 退避等待期间检查停止标志的间隔
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// 打开重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 两次尝试之间的固定退避
    pub backoff: Duration,
    /// 最大尝试次数（`None` 表示无限重试）
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// 无限重试
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }

    /// 有界重试
    pub fn bounded(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts: Some(max_attempts),
        }
    }
}

/// 按策略反复调用 `opener`，直到成功、重试耗尽或 `is_running` 被清除
///
/// # 错误
/// - `SerialError::RetriesExhausted`: 达到 `max_attempts`
/// - `SerialError::Aborted`: 等待期间收到停止信号
pub fn open_with_retry<A, F>(
    path: &str,
    policy: &RetryPolicy,
    is_running: &AtomicBool,
    mut opener: F,
) -> Result<A, SerialError>
where
    F: FnMut() -> Result<A, SerialError>,
{
    let mut attempts: u32 = 0;

    loop {
        if !is_running.load(Ordering::Acquire) {
            return Err(SerialError::Aborted);
        }

        attempts += 1;
        match opener() {
            Ok(adapter) => {
                info!("Serial port {} opened (attempt {})", path, attempts);
                return Ok(adapter);
            },
            Err(e) => {
                warn!("Error opening serial port {}: {}", path, e);

                if let Some(max) = policy.max_attempts
                    && attempts >= max
                {
                    return Err(SerialError::RetriesExhausted {
                        path: path.to_string(),
                        attempts,
                    });
                }

                info!("Retrying to open the serial port {} in {:?}...", path, policy.backoff);
                if !sleep_while_running(policy.backoff, is_running) {
                    return Err(SerialError::Aborted);
                }
            },
        }
    }
}

/// 分片睡眠，返回 `false` 表示期间收到停止信号
fn sleep_while_running(total: Duration, is_running: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !is_running.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(SHUTDOWN_CHECK_INTERVAL));
    }
}
