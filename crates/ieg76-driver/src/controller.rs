//! 夹爪命令控制
//!
//! 每个运动命令遵循同一个状态机：
//! 1. 目标条件已满足时直接返回成功，不访问串口
//! 2. 复位对应的边沿信号，写入命令帧
//! 3. 在超时窗口内等待信号；超时时根据其他标志位附加诊断信息
//!
//! 写入失败直接返回失败结果，不进入等待。
//! 传输层锁只在写入期间持有，等待只使用状态锁，两者从不嵌套。

use crate::error::DriverError;
use crate::state::{DeviceState, DeviceStatus, EdgeSignal};
use ieg76_protocol::{CommandCode, encode_activate, encode_command, encode_operate, encode_query};
use ieg76_serial::SerialTransport;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 命令控制配置
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// 运动命令等待目标状态的超时（毫秒）
    pub motion_timeout_ms: u64,
    /// 初始化帧之间的间隔（毫秒）
    pub settle_delay_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            motion_timeout_ms: 3000,
            settle_delay_ms: 500,
        }
    }
}

/// 命令执行结果
///
/// 超时与写入失败都以 `success == false` 返回，不作为错误传播。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.success { "OK" } else { "FAILED" };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// 运动命令描述
struct Motion {
    name: &'static str,
    code: CommandCode,
    signal: EdgeSignal,
    already: &'static str,
    reached: &'static str,
    timed_out: &'static str,
    /// 超时时根据快照给出的诊断
    hint: fn(&DeviceStatus) -> Option<&'static str>,
}

const OPEN: Motion = Motion {
    name: "open",
    code: CommandCode::OPEN,
    signal: EdgeSignal::Opened,
    already: "The jaws are already opened.",
    reached: "Jaws opened.",
    timed_out: "Timed out while trying to open the jaws.",
    hint: no_hint,
};

const CLOSE: Motion = Motion {
    name: "close",
    code: CommandCode::CLOSE,
    signal: EdgeSignal::Closed,
    already: "The jaws are already completely closed.",
    reached: "Jaws completely closed.",
    timed_out: "Timed out while trying to completely close the jaws.",
    hint: blocked_hint,
};

const GRASP: Motion = Motion {
    name: "grasp",
    code: CommandCode::CLOSE,
    signal: EdgeSignal::Grasped,
    already: "The jaws are already holding an object.",
    reached: "Grasped an object.",
    timed_out: "Timed out while trying to grasp an object.",
    hint: nothing_to_grasp_hint,
};

fn no_hint(_: &DeviceStatus) -> Option<&'static str> {
    None
}

/// 闭合超时但已夹持：有物体阻挡
fn blocked_hint(status: &DeviceStatus) -> Option<&'static str> {
    status.holding.then_some(
        " Jaws blocked by object: remove the object which is blocking the jaws \
         from completely closing and try again.",
    )
}

/// 抓取超时但已完全闭合：没有物体
fn nothing_to_grasp_hint(status: &DeviceStatus) -> Option<&'static str> {
    status
        .closed
        .then_some(" Nothing to grasp: the jaws closed without detecting an object.")
}

/// 夹爪命令控制器
///
/// 克隆代价很低（两个 `Arc`），可以在多个调用方之间共享。
#[derive(Clone)]
pub struct GripperController {
    transport: Arc<SerialTransport>,
    state: Arc<DeviceState>,
    config: ControllerConfig,
}

impl GripperController {
    pub fn new(
        transport: Arc<SerialTransport>,
        state: Arc<DeviceState>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            transport,
            state,
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// 当前设备状态快照
    pub fn status(&self) -> DeviceStatus {
        self.state.read_snapshot()
    }

    /// 回参考点（只写不等）
    ///
    /// # 错误
    /// - `DriverError::Serial`: 写入失败或串口已关闭
    pub fn reference(&self) -> Result<(), DriverError> {
        self.transport.write(&encode_command(CommandCode::REFERENCE)).map_err(|e| {
            error!("Error writing to the serial port: {}", e);
            DriverError::from(e)
        })?;
        info!("Reference command sent");
        Ok(())
    }

    /// 张开夹爪
    pub fn open_jaws(&self) -> CommandResult {
        self.execute(&OPEN)
    }

    /// 完全闭合夹爪
    pub fn close_jaws(&self) -> CommandResult {
        self.execute(&CLOSE)
    }

    /// 抓取物体
    pub fn grasp_object(&self) -> CommandResult {
        self.execute(&GRASP)
    }

    /// 关闭串口（幂等）
    pub fn close_port(&self) -> CommandResult {
        let name = self.transport.port_name();
        match self.transport.close() {
            Ok(true) => CommandResult::ok(format!("Closed the serial port {}", name)),
            Ok(false) => CommandResult::ok(format!("The serial port {} is already closed", name)),
            Err(e) => {
                error!("Error closing the serial port {}: {}", name, e);
                CommandResult::failed(format!("Error closing the serial port {}: {}", name, e))
            },
        }
    }

    /// 启动序列：查询、激活、进入运行状态
    ///
    /// 三帧依次写入，每帧之后等待 `settle_delay_ms`。
    /// 单帧写入失败只记录日志，后续帧照常发送；返回最后一个错误。
    pub fn initialize(&self) -> Result<(), DriverError> {
        let settle = Duration::from_millis(self.config.settle_delay_ms);
        let frames = [
            ("query", encode_query()),
            ("activate", encode_activate()),
            ("operate", encode_operate()),
        ];

        let mut last_error = None;
        for (name, frame) in frames {
            match self.transport.write(&frame) {
                Ok(()) => debug!("Initialization frame '{}' sent", name),
                Err(e) => {
                    error!("Error writing initialization frame '{}': {}", name, e);
                    last_error = Some(e);
                },
            }
            std::thread::sleep(settle);
        }

        match last_error {
            None => {
                info!("Gripper initialized");
                Ok(())
            },
            Some(e) => Err(e.into()),
        }
    }

    fn execute(&self, motion: &Motion) -> CommandResult {
        // 复位与快照在同一个临界区内完成
        let before = self.state.arm(motion.signal);
        debug!("[{}] flags before: {}", motion.name, format_flags(&before));

        if before.level(motion.signal) {
            info!("{}", motion.already);
            return CommandResult::ok(motion.already);
        }

        if let Err(e) = self.transport.write(&encode_command(motion.code)) {
            error!("Error writing to the serial port: {}", e);
            return CommandResult::failed(format!("Error writing to the serial port: {}", e));
        }

        let timeout = Duration::from_millis(self.config.motion_timeout_ms);
        let reached = self.state.wait(motion.signal, timeout);

        let after = self.state.read_snapshot();
        debug!("[{}] flags after: {}", motion.name, format_flags(&after));

        if reached {
            info!("{}", motion.reached);
            return CommandResult::ok(motion.reached);
        }

        let mut message = motion.timed_out.to_string();
        if let Some(hint) = (motion.hint)(&after) {
            message.push_str(hint);
        }
        warn!("{}", message);
        CommandResult::failed(message)
    }
}

fn format_flags(status: &DeviceStatus) -> String {
    format!(
        "position={} idle={} open={} closed={} holding={} fault={} temp_fault={} \
         temp_warning={} maintenance={}",
        status.position,
        status.idle as u8,
        status.open as u8,
        status.closed as u8,
        status.holding as u8,
        status.fault as u8,
        status.temp_fault as u8,
        status.temp_warning as u8,
        status.maintenance as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ieg76_protocol::{DecodedFrame, StatusFlags};
    use ieg76_serial::MockSerialAdapter;
    use std::time::Instant;

    fn fast_config() -> ControllerConfig {
        ControllerConfig {
            motion_timeout_ms: 100,
            settle_delay_ms: 1,
        }
    }

    fn setup() -> (MockSerialAdapter, Arc<DeviceState>, GripperController) {
        let mock = MockSerialAdapter::new("mock0");
        let transport = Arc::new(SerialTransport::new(mock.clone()));
        let state = Arc::new(DeviceState::new());
        let controller = GripperController::new(transport, state.clone(), fast_config());
        (mock, state, controller)
    }

    fn apply(state: &DeviceState, flags: StatusFlags) {
        state.apply(DecodedFrame { position: 0, flags });
    }

    #[test]
    fn test_controller_config_default() {
        let config = ControllerConfig::default();
        assert_eq!(config.motion_timeout_ms, 3000);
        assert_eq!(config.settle_delay_ms, 500);
    }

    #[test]
    fn test_command_result_display() {
        assert_eq!(CommandResult::ok("Jaws opened.").to_string(), "[OK] Jaws opened.");
        assert_eq!(CommandResult::failed("x").to_string(), "[FAILED] x");
    }

    #[test]
    fn test_open_short_circuits_when_already_open() {
        let (mock, state, controller) = setup();
        apply(
            &state,
            StatusFlags {
                open: true,
                ..Default::default()
            },
        );

        let result = controller.open_jaws();
        assert_eq!(result, CommandResult::ok("The jaws are already opened."));
        assert_eq!(mock.write_count(), 0);
    }

    #[test]
    fn test_grasp_and_close_short_circuit() {
        let (mock, state, controller) = setup();
        apply(
            &state,
            StatusFlags {
                closed: true,
                holding: true,
                ..Default::default()
            },
        );

        assert_eq!(
            controller.close_jaws().message,
            "The jaws are already completely closed."
        );
        assert_eq!(
            controller.grasp_object().message,
            "The jaws are already holding an object."
        );
        assert_eq!(mock.write_count(), 0);
    }

    #[test]
    fn test_open_writes_frame_and_times_out() {
        let (mock, _state, controller) = setup();

        let start = Instant::now();
        let result = controller.open_jaws();
        assert!(start.elapsed() >= Duration::from_millis(100));

        assert_eq!(result, CommandResult::failed("Timed out while trying to open the jaws."));
        assert_eq!(mock.written(), vec![b"PDOUT=[02,00]\n".to_vec()]);
    }

    #[test]
    fn test_close_timeout_reports_blocking_object() {
        let (mock, state, controller) = setup();
        apply(
            &state,
            StatusFlags {
                holding: true,
                ..Default::default()
            },
        );

        let result = controller.close_jaws();
        assert!(!result.success);
        assert!(result.message.starts_with("Timed out while trying to completely close the jaws."));
        assert!(result.message.contains("Jaws blocked by object"));
        assert_eq!(mock.written(), vec![b"PDOUT=[03,00]\n".to_vec()]);
    }

    #[test]
    fn test_grasp_timeout_reports_nothing_to_grasp() {
        let (_mock, state, controller) = setup();
        apply(
            &state,
            StatusFlags {
                closed: true,
                ..Default::default()
            },
        );

        let result = controller.grasp_object();
        assert!(!result.success);
        assert!(result.message.contains("Nothing to grasp"));
    }

    #[test]
    fn test_write_failure_returns_without_waiting() {
        let (mock, _state, controller) = setup();
        mock.set_fail_writes(true);

        let start = Instant::now();
        let result = controller.open_jaws();
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(!result.success);
        assert!(result.message.starts_with("Error writing to the serial port"));
    }

    #[test]
    fn test_reference_writes_frame() {
        let (mock, _state, controller) = setup();
        controller.reference().unwrap();
        assert_eq!(mock.written(), vec![b"PDOUT=[07,00]\n".to_vec()]);

        mock.set_fail_writes(true);
        assert!(matches!(controller.reference(), Err(DriverError::Serial(_))));
    }

    #[test]
    fn test_close_port_is_idempotent() {
        let (mock, _state, controller) = setup();

        let first = controller.close_port();
        assert_eq!(first, CommandResult::ok("Closed the serial port mock0"));
        assert!(mock.is_closed());

        let second = controller.close_port();
        assert_eq!(second, CommandResult::ok("The serial port mock0 is already closed"));
    }

    #[test]
    fn test_close_port_failure() {
        let (mock, _state, controller) = setup();
        mock.set_fail_close(true);

        let result = controller.close_port();
        assert!(!result.success);
        assert!(result.message.starts_with("Error closing the serial port mock0"));
    }

    #[test]
    fn test_initialize_sends_all_frames_in_order() {
        let (mock, _state, controller) = setup();
        controller.initialize().unwrap();
        assert_eq!(
            mock.written(),
            vec![b"ID=?\n".to_vec(), b"PDOUT=[03,00]\n".to_vec(), b"OPERATE()\n".to_vec()]
        );
    }

    #[test]
    fn test_initialize_reports_write_failure() {
        let (mock, _state, controller) = setup();
        mock.set_fail_writes(true);
        assert!(controller.initialize().is_err());
    }

    #[test]
    fn test_commands_after_close_port_fail() {
        let (_mock, _state, controller) = setup();
        controller.close_port();

        let result = controller.open_jaws();
        assert!(!result.success);
        assert!(result.message.contains("Serial port is closed"));
    }
}
