//! Gripper API 模块
//!
//! 提供对外的 `Gripper` 结构体，封装读线程、状态同步与命令控制。

use crate::config::GripperConfig;
use crate::controller::{CommandResult, GripperController};
use crate::error::DriverError;
use crate::metrics::{ReaderMetrics, ReaderMetricsSnapshot};
use crate::pipeline::reader_loop;
use crate::state::{DeviceState, DeviceStatus};
use ieg76_serial::{SerialAdapter, SerialTransport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Drop 时等待读线程退出的上限
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 在限定时间内等待读线程退出
///
/// 由一个看门狗线程代为 join；超时后看门狗线程被遗留，随进程退出回收。
fn join_reader(handle: JoinHandle<()>, timeout: Duration) -> Result<(), DriverError> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("ieg76-reader-join".into())
        .spawn(move || {
            let _ = tx.send(handle.join().is_ok());
        })
        .map_err(|e| DriverError::IoThread(format!("Failed to spawn join watchdog: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(true) => Ok(()),
        Ok(false) => Err(DriverError::IoThread("Reader thread panicked".into())),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(DriverError::IoThread(format!(
            "Reader thread did not exit within {:?}",
            timeout
        ))),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(DriverError::IoThread("Join watchdog exited unexpectedly".into()))
        },
    }
}

/// IEG 76 夹爪驱动（对外 API）
///
/// 持有串口期间后台运行一个读线程；Drop 时停止读线程并关闭串口。
///
/// # Example
///
/// ```no_run
/// use ieg76_driver::GripperBuilder;
///
/// let gripper = GripperBuilder::new().port("/dev/ttyACM0").build()?;
/// let result = gripper.open_jaws();
/// println!("{}", result);
/// # Ok::<(), ieg76_driver::DriverError>(())
/// ```
pub struct Gripper {
    controller: GripperController,
    transport: Arc<SerialTransport>,
    state: Arc<DeviceState>,
    metrics: Arc<ReaderMetrics>,
    /// 运行标志，清除后读线程退出
    is_running: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
}

impl Gripper {
    /// 接管一个已打开的适配器并启动读线程
    ///
    /// `config.initialize` 为真时发送初始化序列；初始化失败只记录日志，不影响后续命令。
    ///
    /// # 错误
    /// - `DriverError::IoThread`: 读线程启动失败
    pub fn new(
        adapter: impl SerialAdapter + Send + 'static,
        config: GripperConfig,
    ) -> Result<Self, DriverError> {
        Self::with_running_flag(adapter, config, Arc::new(AtomicBool::new(true)))
    }

    /// 与 [`Gripper::new`] 相同，但使用外部提供的运行标志
    ///
    /// 外部清除标志（例如 Ctrl-C）会让读线程退出，`is_healthy` 随之变为 `false`。
    pub fn with_running_flag(
        adapter: impl SerialAdapter + Send + 'static,
        config: GripperConfig,
        is_running: Arc<AtomicBool>,
    ) -> Result<Self, DriverError> {
        let transport = Arc::new(SerialTransport::new(adapter));
        let state = Arc::new(DeviceState::new());
        let metrics = Arc::new(ReaderMetrics::new());

        let reader_thread = {
            let transport = transport.clone();
            let state = state.clone();
            let metrics = metrics.clone();
            let is_running = is_running.clone();
            let reader_config = config.reader.clone();
            thread::Builder::new()
                .name("ieg76-reader".to_string())
                .spawn(move || reader_loop(transport, state, reader_config, is_running, metrics))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        let controller =
            GripperController::new(transport.clone(), state.clone(), config.controller);

        let gripper = Self {
            controller,
            transport,
            state,
            metrics,
            is_running,
            reader_thread: Some(reader_thread),
        };

        if config.initialize
            && let Err(e) = gripper.controller.initialize()
        {
            warn!("Gripper initialization incomplete: {}", e);
        }

        info!("Ready to receive requests.");
        Ok(gripper)
    }

    /// 回参考点（只写不等）
    pub fn reference(&self) -> Result<(), DriverError> {
        self.controller.reference()
    }

    /// 张开夹爪
    pub fn open_jaws(&self) -> CommandResult {
        self.controller.open_jaws()
    }

    /// 完全闭合夹爪
    pub fn close_jaws(&self) -> CommandResult {
        self.controller.close_jaws()
    }

    /// 抓取物体
    pub fn grasp_object(&self) -> CommandResult {
        self.controller.grasp_object()
    }

    /// 关闭串口（幂等）
    pub fn close_port(&self) -> CommandResult {
        self.controller.close_port()
    }

    /// 当前设备状态快照
    pub fn status(&self) -> DeviceStatus {
        self.state.read_snapshot()
    }

    /// 读线程指标快照
    pub fn metrics(&self) -> ReaderMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 读线程是否仍在运行
    pub fn is_healthy(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
            && self.reader_thread.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// 等待收到至少一帧有效状态
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时仍未收到
    pub fn wait_for_feedback(&self, timeout: Duration) -> Result<(), DriverError> {
        if self.state.wait_for_frame(0, timeout) {
            Ok(())
        } else {
            Err(DriverError::Timeout)
        }
    }

    /// 命令控制器句柄（可克隆，供其他线程使用）
    pub fn controller(&self) -> &GripperController {
        &self.controller
    }

    pub fn port_name(&self) -> &str {
        self.transport.port_name()
    }
}

impl Drop for Gripper {
    fn drop(&mut self) {
        // Release: 之前的写入对读线程可见
        self.is_running.store(false, Ordering::Release);

        if let Some(handle) = self.reader_thread.take()
            && let Err(e) = join_reader(handle, READER_JOIN_TIMEOUT)
        {
            error!("Failed to stop the reader thread: {}", e);
        }

        if let Err(e) = self.transport.close() {
            error!("Error closing the serial port {}: {}", self.transport.port_name(), e);
        }
    }
}
