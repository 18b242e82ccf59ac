//! 读线程主循环
//!
//! 持续轮询串口，把完整的状态帧解析后写入 [`DeviceState`]。

use crate::metrics::ReaderMetrics;
use crate::state::DeviceState;
use ieg76_protocol::{STATUS_FRAME_LEN, decode_status};
use ieg76_serial::SerialTransport;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// 读线程配置
///
/// # Example
///
/// ```
/// use ieg76_driver::ReaderConfig;
///
/// let config = ReaderConfig {
///     poll_interval_ms: 5,
///     ..Default::default()
/// };
/// assert_eq!(config.error_backoff_ms, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// 输入缓冲区为空时的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 读取出错后的退避时间（毫秒）
    pub error_backoff_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            error_backoff_ms: 100,
        }
    }
}

/// 单次读取的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// 没有数据
    Idle,
    /// 解码成功并已写入状态
    Applied,
    /// 长度不是一个完整状态帧，已丢弃
    Discarded,
    /// 长度正确但内容非法，已丢弃
    Malformed,
}

/// 连续丢弃读取的计数
///
/// 串口持续拆帧时只在每段连续丢弃开始时告警一次，总数由 `reads_discarded` 记录。
#[derive(Debug, Default)]
struct DiscardRun {
    len: u64,
}

impl DiscardRun {
    /// 记录一次读取结果，返回 `true` 表示一段新的连续丢弃刚开始
    fn record(&mut self, outcome: ReadOutcome) -> bool {
        match outcome {
            ReadOutcome::Discarded => {
                self.len += 1;
                self.len == 1
            },
            ReadOutcome::Applied => {
                if self.len > 0 {
                    debug!("Resynchronized after {} discarded reads", self.len);
                }
                self.len = 0;
                false
            },
            ReadOutcome::Idle | ReadOutcome::Malformed => false,
        }
    }
}

/// 处理一次读取得到的字节
///
/// 只有恰好一个完整帧长度的读取会被解码；其余读取整体丢弃，不做跨读取拼接。
/// 解码失败只计数，不向上传播。
pub fn process_read(bytes: &[u8], state: &DeviceState, metrics: &ReaderMetrics) -> ReadOutcome {
    if bytes.is_empty() {
        return ReadOutcome::Idle;
    }
    metrics.reads_total.fetch_add(1, Ordering::Relaxed);

    if bytes.len() != STATUS_FRAME_LEN {
        metrics.reads_discarded.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Discarding {} bytes read from the serial port (expected {})",
            bytes.len(),
            STATUS_FRAME_LEN
        );
        return ReadOutcome::Discarded;
    }

    match decode_status(bytes) {
        Ok(frame) => {
            trace!("RX {:?}", String::from_utf8_lossy(bytes));
            let fired = state.apply(frame);
            metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);
            if !fired.is_empty() {
                metrics.signals_fired.fetch_add(fired.len() as u64, Ordering::Relaxed);
                trace!("Signals fired: {:?}", fired);
            }
            ReadOutcome::Applied
        },
        Err(e) => {
            metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
            warn!("Discarding malformed status frame: {}", e);
            ReadOutcome::Malformed
        },
    }
}

/// 读线程主循环
///
/// 每次迭代只在传输层锁内做一次非阻塞读取，锁从不跨越睡眠。
/// 读取错误记录后继续轮询，只有 `is_running` 被清除才会退出。
///
/// # 参数
/// - `transport`: 共享串口传输层
/// - `state`: 共享设备状态
/// - `config`: 读线程配置
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 读线程指标
pub fn reader_loop(
    transport: Arc<SerialTransport>,
    state: Arc<DeviceState>,
    config: ReaderConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<ReaderMetrics>,
) {
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let error_backoff = Duration::from_millis(config.error_backoff_ms);
    let mut discard_run = DiscardRun::default();

    loop {
        // Acquire: 看到 false 时必须同时看到其他线程的清理写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Reader thread: is_running flag is false, exiting");
            break;
        }

        match transport.try_read_available() {
            Ok(bytes) => {
                let outcome = process_read(&bytes, &state, &metrics);
                if discard_run.record(outcome) {
                    warn!(
                        "Discarding unaligned serial reads ({} bytes) until resynchronized",
                        bytes.len()
                    );
                }
                if outcome == ReadOutcome::Idle {
                    std::thread::sleep(poll_interval);
                }
            },
            Err(e) => {
                metrics.io_errors.fetch_add(1, Ordering::Relaxed);
                error!("Error reading from the serial port {}: {}", transport.port_name(), e);
                std::thread::sleep(error_backoff);
            },
        }
    }
}
