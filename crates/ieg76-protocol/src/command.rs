//! 命令帧构建
//!
//! 所有下行帧都是以 `\n` 结尾的 ASCII 文本，构建过程无副作用且不会失败。

/// 查询帧（`ID=?`）
pub const QUERY_FRAME: &[u8] = b"ID=?\n";

/// 进入运行状态帧（`OPERATE()`）
pub const OPERATE_FRAME: &[u8] = b"OPERATE()\n";

/// 过程输出命令码（PDOUT 第一个字节）
///
/// 以两位大写十六进制字符写入帧中，例如 `CommandCode::OPEN` → `PDOUT=[02,00]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode(pub u8);

impl CommandCode {
    /// 张开夹爪
    pub const OPEN: Self = Self(0x02);
    /// 闭合 / 抓取
    pub const CLOSE: Self = Self(0x03);
    /// 激活（与闭合共用 0x03，仅在初始化时发送）
    pub const ACTIVATE: Self = Self(0x03);
    /// 回参考点（回零）
    pub const REFERENCE: Self = Self(0x07);

    /// 原始命令字节
    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for CommandCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// 构建 `PDOUT=[CC,00]\n` 命令帧
pub fn encode_command(code: CommandCode) -> Vec<u8> {
    format!("PDOUT=[{},00]\n", code).into_bytes()
}

/// 构建查询帧 `ID=?\n`
pub fn encode_query() -> Vec<u8> {
    QUERY_FRAME.to_vec()
}

/// 构建激活帧 `PDOUT=[03,00]\n`
pub fn encode_activate() -> Vec<u8> {
    encode_command(CommandCode::ACTIVATE)
}

/// 构建运行帧 `OPERATE()\n`
pub fn encode_operate() -> Vec<u8> {
    OPERATE_FRAME.to_vec()
}
