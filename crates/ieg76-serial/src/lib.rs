//! # IEG76 Serial Layer
//!
//! 串口硬件抽象层：
//! - [`SerialAdapter`]：统一的字节流接口（真实串口 / Mock）
//! - [`SerialTransport`]：单把锁串行化所有读写，保证帧边界不被交错的读写破坏
//! - [`open_with_retry`]：启动阶段的串口打开重试

pub mod port;
pub mod retry;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use port::{DEFAULT_BAUD_RATE, DEFAULT_PORT_PATH, SystemSerialAdapter, available_ports};
pub use retry::{RetryPolicy, open_with_retry};
pub use transport::SerialTransport;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockSerialAdapter;

use thiserror::Error;

/// 串口层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    /// 打开串口失败（启动阶段会重试）
    #[error("Failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// 已打开串口上的读写失败（不重试）
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 串口驱动错误（查询缓冲区等）
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),

    /// 串口已关闭
    #[error("Serial port is closed")]
    Closed,

    /// 有界重试耗尽
    #[error("Gave up opening serial port {path} after {attempts} attempts")]
    RetriesExhausted { path: String, attempts: u32 },

    /// 重试过程中收到停止信号
    #[error("Opening serial port aborted by shutdown")]
    Aborted,
}

/// 串口适配器
///
/// 由 [`SerialTransport`] 独占持有，所有调用都发生在传输层锁内。
pub trait SerialAdapter {
    /// 设备名称（如 `/dev/ttyACM0`）
    fn name(&self) -> &str;

    /// 写入全部字节
    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError>;

    /// 输入缓冲区中等待读取的字节数
    fn bytes_to_read(&mut self) -> Result<usize, SerialError>;

    /// 读取当前可用的字节（不阻塞等待新数据），返回实际读取的字节数
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// 关闭底层句柄
    fn close(&mut self) -> Result<(), SerialError> {
        Ok(())
    }
}

impl<T: SerialAdapter + ?Sized> SerialAdapter for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        (**self).write_all(data)
    }

    fn bytes_to_read(&mut self) -> Result<usize, SerialError> {
        (**self).bytes_to_read()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        (**self).read(buf)
    }

    fn close(&mut self) -> Result<(), SerialError> {
        (**self).close()
    }
}
