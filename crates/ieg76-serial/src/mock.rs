//! Mock 串口适配器
//!
//! 无硬件依赖，用于测试和设备模拟：
//! - 记录所有写入的帧
//! - 入站数据按"到达"为单位排队，每次读取交付一个完整到达块
//! - 可注入写/读/关闭错误
//! - 可设置应答器，把写入的命令转换为入站状态帧（模拟设备）
//!
//! 克隆出的句柄共享同一份内部状态，测试代码可以在驱动持有适配器的同时继续操作它。

use crate::{SerialAdapter, SerialError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;

/// 应答器：输入写入的帧，返回需要排入输入缓冲区的数据块
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    fail_writes: bool,
    fail_reads: bool,
    fail_close: bool,
    closed: bool,
    responder: Option<Responder>,
}

/// Mock 串口
#[derive(Clone)]
pub struct MockSerialAdapter {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockSerialAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// 排入一次入站到达
    pub fn push_inbound(&self, chunk: impl Into<Vec<u8>>) {
        self.state.lock().inbound.push_back(chunk.into());
    }

    /// 尚未被读取的到达块数量
    pub fn pending_inbound(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// 所有成功写入的帧
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// 成功写入的次数
    pub fn write_count(&self) -> usize {
        self.state.lock().written.len()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.state.lock().fail_close = fail;
    }

    /// 设置应答器（替换之前的应答器）
    pub fn set_responder(&self, responder: impl FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static) {
        self.state.lock().responder = Some(Box::new(responder));
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl SerialAdapter for MockSerialAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.fail_writes {
            return Err(IoError::new(ErrorKind::BrokenPipe, "mock write failure").into());
        }
        state.written.push(data.to_vec());

        if let Some(responder) = state.responder.as_mut() {
            let replies = responder(data);
            state.inbound.extend(replies);
        }
        Ok(())
    }

    fn bytes_to_read(&mut self) -> Result<usize, SerialError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(IoError::new(ErrorKind::Other, "mock device busy").into());
        }
        Ok(state.inbound.front().map_or(0, Vec::len))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let mut state = self.state.lock();
        if state.fail_reads {
            return Err(IoError::new(ErrorKind::Other, "mock device busy").into());
        }
        let Some(mut chunk) = state.inbound.pop_front() else {
            return Ok(0);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // 剩余部分放回队首
            state.inbound.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn close(&mut self) -> Result<(), SerialError> {
        let mut state = self.state.lock();
        state.closed = true;
        if state.fail_close {
            return Err(IoError::new(ErrorKind::Other, "mock close failure").into());
        }
        Ok(())
    }
}
