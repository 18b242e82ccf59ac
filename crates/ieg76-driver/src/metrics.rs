//! 读线程指标
//!
//! 原子计数器，读线程更新，任意线程读取快照，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 读线程实时指标
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    /// 返回非空数据的读取次数
    pub reads_total: AtomicU64,

    /// 成功解码并写入状态的帧数
    pub frames_decoded: AtomicU64,

    /// 因长度不是一个完整状态帧而丢弃的读取次数
    ///
    /// 如果这个值快速增长，说明读取粒度与设备发送节奏不匹配。
    pub reads_discarded: AtomicU64,

    /// 长度正确但内容校验失败的帧数
    pub decode_errors: AtomicU64,

    /// 串口读取错误次数
    pub io_errors: AtomicU64,

    /// 触发的边沿信号总数
    pub signals_fired: AtomicU64,
}

impl ReaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取所有计数器的当前值
    ///
    /// 不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> ReaderMetricsSnapshot {
        ReaderMetricsSnapshot {
            reads_total: self.reads_total.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            reads_discarded: self.reads_discarded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
            signals_fired: self.signals_fired.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReaderMetricsSnapshot {
    pub reads_total: u64,
    pub frames_decoded: u64,
    pub reads_discarded: u64,
    pub decode_errors: u64,
    pub io_errors: u64,
    pub signals_fired: u64,
}

impl ReaderMetricsSnapshot {
    /// 有效帧率（百分比），`reads_total` 为 0 时返回 0.0
    pub fn valid_frame_rate(&self) -> f64 {
        if self.reads_total == 0 {
            return 0.0;
        }
        (self.frames_decoded as f64 / self.reads_total as f64) * 100.0
    }
}
