//! 共享串口传输层
//!
//! 读线程与命令路径共用同一把锁。锁只在单次读/写期间持有，
//! 从不跨越等待，因此命令的多秒等待不会阻塞读线程。

use crate::{SerialAdapter, SerialError};
use parking_lot::Mutex;
use tracing::{info, trace};

/// 串口传输层
pub struct SerialTransport {
    /// `None` 表示串口已关闭
    port: Mutex<Option<Box<dyn SerialAdapter + Send>>>,
    name: String,
}

impl SerialTransport {
    /// 接管一个已打开的适配器
    pub fn new(adapter: impl SerialAdapter + Send + 'static) -> Self {
        let name = adapter.name().to_string();
        Self {
            port: Mutex::new(Some(Box::new(adapter))),
            name,
        }
    }

    /// 串口名称（关闭后仍可用）
    pub fn port_name(&self) -> &str {
        &self.name
    }

    /// 串口是否仍处于打开状态
    pub fn is_open(&self) -> bool {
        self.port.lock().is_some()
    }

    /// 写入完整帧
    ///
    /// # 错误
    /// - `SerialError::Closed`: 串口已关闭
    /// - `SerialError::Io`: 写入失败（不重试，由调用方决定如何上报）
    pub fn write(&self, data: &[u8]) -> Result<(), SerialError> {
        let mut guard = self.port.lock();
        let port = guard.as_mut().ok_or(SerialError::Closed)?;
        port.write_all(data)?;
        trace!("TX {:?}", String::from_utf8_lossy(data));
        Ok(())
    }

    /// 读取当前输入缓冲区中的全部字节（非阻塞）
    ///
    /// 没有待读数据或串口已关闭时返回空。
    pub fn try_read_available(&self) -> Result<Vec<u8>, SerialError> {
        let mut guard = self.port.lock();
        let Some(port) = guard.as_mut() else {
            return Ok(Vec::new());
        };

        let pending = port.bytes_to_read()?;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; pending];
        let mut filled = 0;
        while filled < pending {
            match port.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// 关闭串口（幂等）
    ///
    /// 返回 `true` 表示本次调用真正关闭了串口，`false` 表示之前已关闭。
    /// 即使底层 `close` 报错，句柄也已释放。
    pub fn close(&self) -> Result<bool, SerialError> {
        let mut guard = self.port.lock();
        match guard.take() {
            None => Ok(false),
            Some(mut port) => {
                let result = port.close();
                drop(port);
                info!("Serial port {} closed", self.name);
                result.map(|_| true)
            },
        }
    }
}
