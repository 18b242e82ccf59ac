//! # IEG76 Protocol
//!
//! Weiss IEG 76 夹爪串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 下行命令帧构建（`PDOUT=[CC,00]\n` 等 ASCII 帧）
//! - `status`: 上行状态帧解析（`@PDIN=[XX,XX,XX,XX]`，固定 22 字节）
//!
//! ## 帧格式
//!
//! 协议是 "二进制过程数据 + ASCII 表示"：每个过程数据字节用两位十六进制字符表示，
//! 字节之间用逗号分隔，整组数据包在方括号内，帧以 `\n` 结尾。
//!
//! ```rust
//! use ieg76_protocol::{CommandCode, decode_status, encode_command};
//!
//! assert_eq!(encode_command(CommandCode::OPEN), b"PDOUT=[02,00]\n".to_vec());
//!
//! let frame = decode_status(b"@PDIN=[01,2C,00,02]\r\r\n").unwrap();
//! assert_eq!(frame.position, 0x012C);
//! assert!(frame.flags.open);
//! ```

pub mod command;
pub mod status;

// 重新导出常用类型
pub use command::*;
pub use status::*;

use thiserror::Error;

/// 协议解析错误类型
///
/// 只会在解析上行状态帧时出现；构建命令帧不会失败。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unexpected byte 0x{found:02X} at index {index}, expected '{expected}'")]
    UnexpectedByte {
        index: usize,
        expected: char,
        found: u8,
    },

    #[error("Invalid hex digit 0x{found:02X} at index {index}")]
    InvalidHex { index: usize, found: u8 },
}
