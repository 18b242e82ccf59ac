//! 驱动层错误类型定义

use ieg76_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
///
/// 状态帧解析错误只在读线程内部处理，不会出现在这里。
/// 运动命令超时以 `CommandResult { success: false }` 形式返回，也不经过这里。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口错误（打开失败、读写失败、已关闭）
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 读线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}
