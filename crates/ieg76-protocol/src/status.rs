//! 状态帧解析
//!
//! 夹爪以固定 22 字节的 ASCII 帧上报过程输入数据（PDIN）：
//!
//! ```text
//! 偏移:  0      7  9 10 12 13 15 16 18 19   21
//!        @PDIN=[ B0 ,  B1 ,  B2 ,  B3 ]  <ws> \n
//! ```
//!
//! - `B0 B1`：位置编码器读数（大端 16 位）
//! - `B2`：保留（不解析）
//! - `B3`：状态标志位（见 [`StatusByte`]）
//! - 尾部 3 字节：行结束符，最后一个字节必须是 `\n`，其余必须是 ASCII 空白

use crate::ProtocolError;
use bilge::prelude::*;

/// 状态帧固定长度（字节）
pub const STATUS_FRAME_LEN: usize = 22;

/// 状态帧前缀
pub const STATUS_PREFIX: &[u8] = b"@PDIN=[";

/// 四个数据字节在帧内的起始偏移
const BYTE_OFFSETS: [usize; 4] = [7, 10, 13, 16];

/// 字节之间的逗号偏移
const COMMA_OFFSETS: [usize; 3] = [9, 12, 15];

/// 右方括号偏移
const CLOSE_BRACKET_OFFSET: usize = 18;

/// 状态标志字节（Byte 3）
///
/// 协议定义（Bit 0 为最低位）：
/// - Bit 0: 空闲（idle）
/// - Bit 1: 夹爪已张开（open）
/// - Bit 2: 夹爪已闭合（closed）
/// - Bit 3: 夹持住物体（holding）
/// - Bit 4: 故障（fault）
/// - Bit 5: 温度故障（temp_fault）
/// - Bit 6: 温度警告（temp_warning）
/// - Bit 7: 需要维护（maintenance）
///
/// bilge 默认使用 LSB first 位序，与协议要求一致。
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusByte {
    pub idle: bool,         // Bit 0
    pub open: bool,         // Bit 1
    pub closed: bool,       // Bit 2
    pub holding: bool,      // Bit 3
    pub fault: bool,        // Bit 4
    pub temp_fault: bool,   // Bit 5
    pub temp_warning: bool, // Bit 6
    pub maintenance: bool,  // Bit 7
}

/// 状态标志（展开后的布尔值）
///
/// 解码器只如实反映设备上报的位，不做互斥校验
/// （正常工作时 `open` 与 `closed` 不会同时为真）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFlags {
    pub idle: bool,
    pub open: bool,
    pub closed: bool,
    pub holding: bool,
    pub fault: bool,
    pub temp_fault: bool,
    pub temp_warning: bool,
    pub maintenance: bool,
}

impl StatusFlags {
    /// 从原始标志字节构建
    pub fn from_byte(byte: u8) -> Self {
        let bits = StatusByte::from(u8::new(byte));
        Self {
            idle: bits.idle(),
            open: bits.open(),
            closed: bits.closed(),
            holding: bits.holding(),
            fault: bits.fault(),
            temp_fault: bits.temp_fault(),
            temp_warning: bits.temp_warning(),
            maintenance: bits.maintenance(),
        }
    }

    /// 打包回原始标志字节
    pub fn to_byte(self) -> u8 {
        let bits = StatusByte::new(
            self.idle,
            self.open,
            self.closed,
            self.holding,
            self.fault,
            self.temp_fault,
            self.temp_warning,
            self.maintenance,
        );
        u8::from(bits)
    }
}

/// 解码后的状态帧
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedFrame {
    /// 位置编码器原始读数（Byte 0 ‖ Byte 1，大端）
    pub position: u16,
    /// 状态标志（Byte 3）
    pub flags: StatusFlags,
}

/// 解析一个状态帧
///
/// 帧长度必须恰好为 [`STATUS_FRAME_LEN`]，所有分隔符与十六进制字符都会被校验。
/// 任何格式错误都返回 [`ProtocolError`]，不会产生部分解析的结果。
///
/// 尾部校验比设备文档更严格：Byte 19-20 必须是 ASCII 空白（设备发送 `\r\r`），
/// Byte 21 必须是 `\n`。若真实设备在尾部填充其他字节，会表现为 `decode_errors` 持续增长。
///
/// # Example
///
/// ```
/// use ieg76_protocol::decode_status;
///
/// let frame = decode_status(b"@PDIN=[00,64,00,05]\r\r\n").unwrap();
/// assert_eq!(frame.position, 100);
/// assert!(frame.flags.idle && frame.flags.closed);
/// ```
pub fn decode_status(frame: &[u8]) -> Result<DecodedFrame, ProtocolError> {
    if frame.len() != STATUS_FRAME_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: STATUS_FRAME_LEN,
            actual: frame.len(),
        });
    }

    for (index, &expected) in STATUS_PREFIX.iter().enumerate() {
        expect_byte(frame, index, expected)?;
    }
    for index in COMMA_OFFSETS {
        expect_byte(frame, index, b',')?;
    }
    expect_byte(frame, CLOSE_BRACKET_OFFSET, b']')?;

    // 尾部：最后一个字节必须是 '\n'，中间填充必须是空白
    let last = STATUS_FRAME_LEN - 1;
    for index in CLOSE_BRACKET_OFFSET + 1..last {
        if !frame[index].is_ascii_whitespace() {
            return Err(ProtocolError::UnexpectedByte {
                index,
                expected: '\r',
                found: frame[index],
            });
        }
    }
    expect_byte(frame, last, b'\n')?;

    let mut bytes = [0u8; 4];
    for (slot, offset) in bytes.iter_mut().zip(BYTE_OFFSETS) {
        *slot = hex_pair(frame, offset)?;
    }

    Ok(DecodedFrame {
        position: u16::from_be_bytes([bytes[0], bytes[1]]),
        flags: StatusFlags::from_byte(bytes[3]),
    })
}

/// 构建一个状态帧（`decode_status` 的逆操作）
///
/// Byte 2 固定写 `00`，尾部使用 `\r\r\n`。用于设备模拟和测试。
pub fn encode_status(position: u16, flags: StatusFlags) -> [u8; STATUS_FRAME_LEN] {
    let [hi, lo] = position.to_be_bytes();
    let text = format!(
        "@PDIN=[{:02X},{:02X},{:02X},{:02X}]\r\r\n",
        hi,
        lo,
        0u8,
        flags.to_byte()
    );

    let mut frame = [0u8; STATUS_FRAME_LEN];
    frame.copy_from_slice(text.as_bytes());
    frame
}

fn expect_byte(frame: &[u8], index: usize, expected: u8) -> Result<(), ProtocolError> {
    if frame[index] == expected {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedByte {
            index,
            expected: expected as char,
            found: frame[index],
        })
    }
}

fn hex_pair(frame: &[u8], offset: usize) -> Result<u8, ProtocolError> {
    let hi = hex_digit(frame, offset)?;
    let lo = hex_digit(frame, offset + 1)?;
    Ok((hi << 4) | lo)
}

fn hex_digit(frame: &[u8], index: usize) -> Result<u8, ProtocolError> {
    let found = frame[index];
    match found {
        b'0'..=b'9' => Ok(found - b'0'),
        b'a'..=b'f' => Ok(found - b'a' + 10),
        b'A'..=b'F' => Ok(found - b'A' + 10),
        _ => Err(ProtocolError::InvalidHex { index, found }),
    }
}
