//! 设备状态与边沿触发信号
//!
//! `DeviceState` 是读线程与命令路径之间唯一的共享对象：
//! - 读线程调用 [`DeviceState::apply`] 写入最新状态帧
//! - 命令路径调用 [`DeviceState::arm`] / [`DeviceState::wait`] 等待目标状态
//!
//! 状态、信号和帧计数放在同一把锁内，配合一个 `Condvar`。
//! 状态更新与唤醒在同一个临界区内完成，等待者不会看到"状态已变但信号未置位"的中间态。

use ieg76_protocol::DecodedFrame;
use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use std::time::{Duration, Instant};

/// 边沿触发信号
///
/// 对应标志位从 `false` 变为 `true` 时置位，需要在发出依赖它的命令前显式复位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeSignal {
    /// 夹爪张开（`open` 0→1）
    Opened,
    /// 夹爪完全闭合（`closed` 0→1）
    Closed,
    /// 夹持住物体（`holding` 0→1）
    Grasped,
}

impl EdgeSignal {
    pub const ALL: [EdgeSignal; 3] = [EdgeSignal::Opened, EdgeSignal::Closed, EdgeSignal::Grasped];

    fn index(self) -> usize {
        match self {
            EdgeSignal::Opened => 0,
            EdgeSignal::Closed => 1,
            EdgeSignal::Grasped => 2,
        }
    }
}

/// 本次 `apply` 触发的信号（最多 3 个，不分配堆内存）
pub type FiredSignals = SmallVec<[EdgeSignal; 3]>;

/// 设备状态快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceStatus {
    /// 位置编码器原始读数
    pub position: u16,
    pub idle: bool,
    pub open: bool,
    pub closed: bool,
    pub holding: bool,
    pub fault: bool,
    pub temp_fault: bool,
    pub temp_warning: bool,
    pub maintenance: bool,
}

impl DeviceStatus {
    /// 信号对应的标志位当前电平
    pub fn level(&self, signal: EdgeSignal) -> bool {
        match signal {
            EdgeSignal::Opened => self.open,
            EdgeSignal::Closed => self.closed,
            EdgeSignal::Grasped => self.holding,
        }
    }
}

impl From<DecodedFrame> for DeviceStatus {
    fn from(frame: DecodedFrame) -> Self {
        let flags = frame.flags;
        Self {
            position: frame.position,
            idle: flags.idle,
            open: flags.open,
            closed: flags.closed,
            holding: flags.holding,
            fault: flags.fault,
            temp_fault: flags.temp_fault,
            temp_warning: flags.temp_warning,
            maintenance: flags.maintenance,
        }
    }
}

#[derive(Default)]
struct Inner {
    status: DeviceStatus,
    signals: [bool; 3],
    frames_applied: u64,
}

/// 共享设备状态
#[derive(Default)]
pub struct DeviceState {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原子地写入新状态帧，并对 open/closed/holding 做边沿检测
    ///
    /// 只有 0→1 跳变会置位对应信号；1→1、1→0、0→0 都不会。
    /// 返回本次触发的信号。
    pub fn apply(&self, frame: DecodedFrame) -> FiredSignals {
        let next = DeviceStatus::from(frame);
        let mut fired = FiredSignals::new();

        let mut inner = self.inner.lock();
        for signal in EdgeSignal::ALL {
            if !inner.status.level(signal) && next.level(signal) {
                inner.signals[signal.index()] = true;
                fired.push(signal);
            }
        }
        inner.status = next;
        inner.frames_applied += 1;
        self.changed.notify_all();

        fired
    }

    /// 当前状态的一致性快照
    pub fn read_snapshot(&self) -> DeviceStatus {
        self.inner.lock().status
    }

    /// 复位信号
    pub fn reset(&self, signal: EdgeSignal) {
        self.inner.lock().signals[signal.index()] = false;
    }

    /// 在同一个临界区内复位信号并返回当前快照
    ///
    /// 命令路径用它代替 "先读快照、再复位"，中间不会漏掉一次跳变。
    pub fn arm(&self, signal: EdgeSignal) -> DeviceStatus {
        let mut inner = self.inner.lock();
        inner.signals[signal.index()] = false;
        inner.status
    }

    /// 信号当前是否置位（不等待）
    pub fn is_set(&self, signal: EdgeSignal) -> bool {
        self.inner.lock().signals[signal.index()]
    }

    /// 等待信号置位，最多等待 `timeout`
    ///
    /// 返回信号在窗口内是否置位。
    pub fn wait(&self, signal: EdgeSignal, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while !inner.signals[signal.index()] {
            if self.changed.wait_until(&mut inner, deadline).timed_out() {
                return inner.signals[signal.index()];
            }
        }
        true
    }

    /// 已写入的状态帧总数
    pub fn frames_applied(&self) -> u64 {
        self.inner.lock().frames_applied
    }

    /// 等待帧计数超过 `after`，最多等待 `timeout`
    pub fn wait_for_frame(&self, after: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.frames_applied <= after {
            if self.changed.wait_until(&mut inner, deadline).timed_out() {
                return inner.frames_applied > after;
            }
        }
        true
    }
}
