//! 系统串口适配器（基于 `serialport`）

use crate::{SerialAdapter, SerialError};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::debug;

/// 默认串口设备
pub const DEFAULT_PORT_PATH: &str = "/dev/ttyACM0";

/// 默认波特率（USB CDC 设备实际忽略该值）
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// 读超时：只作为兜底，正常读取前总会先查询可读字节数
const READ_TIMEOUT_MS: u64 = 10;

/// 基于 `serialport` 的真实串口
pub struct SystemSerialAdapter {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SystemSerialAdapter {
    /// 打开串口（8N1，无流控）
    ///
    /// # 错误
    /// - `SerialError::Open`: 设备不存在、无权限或被占用
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(|source| SerialError::Open {
                path: path.to_string(),
                source,
            })?;

        debug!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self {
            port,
            name: path.to_string(),
        })
    }
}

impl SerialAdapter for SystemSerialAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn bytes_to_read(&mut self) -> Result<usize, SerialError> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<(), SerialError> {
        // 句柄在 drop 时释放，这里只丢弃未读/未发的数据
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

/// 列出系统中可用的串口名称
///
/// `ttyACM*` 排在最前（IEG 76 枚举为 CDC-ACM 设备），其余按名称排序。
pub fn available_ports() -> Vec<String> {
    let mut names: Vec<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    names.sort_by_key(|name| port_sort_key(name));
    names.dedup();
    names
}

fn port_sort_key(name: &str) -> (u8, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let rank = if basename.starts_with("ttyACM") {
        0
    } else if basename.starts_with("ttyUSB") {
        1
    } else {
        2
    };
    (rank, basename.to_string())
}
