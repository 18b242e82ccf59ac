//! 命令执行与输出
//!
//! One-shot 模式与 REPL 共用同一套命令分发。

use anyhow::Result;
use ieg76_driver::{CommandResult, DeviceStatus, Gripper};
use std::str::FromStr;
use std::time::Duration;

/// 夹爪命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperCommand {
    Reference,
    Open,
    Close,
    Grasp,
    ClosePort,
    Status,
}

impl FromStr for GripperCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reference" | "home" => Ok(Self::Reference),
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "grasp" => Ok(Self::Grasp),
            "close-port" => Ok(Self::ClosePort),
            "status" => Ok(Self::Status),
            other => anyhow::bail!("Unknown command: {}", other),
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

/// 执行命令并打印结果，返回命令是否成功
pub fn execute(gripper: &Gripper, command: GripperCommand, output: Output) -> Result<bool> {
    let result = match command {
        GripperCommand::Reference => match gripper.reference() {
            Ok(()) => CommandResult::ok("Reference command sent."),
            Err(e) => CommandResult::failed(e.to_string()),
        },
        GripperCommand::Open => gripper.open_jaws(),
        GripperCommand::Close => gripper.close_jaws(),
        GripperCommand::Grasp => gripper.grasp_object(),
        GripperCommand::ClosePort => gripper.close_port(),
        GripperCommand::Status => {
            print_status(gripper, output)?;
            return Ok(true);
        },
    };

    match output {
        Output::Text => println!("{}", result),
        Output::Json => println!("{}", serde_json::to_string(&result)?),
    }
    Ok(result.success)
}

/// 等待第一帧状态后打印
///
/// 刚连接时读线程可能尚未收到任何帧，最多等待 1 秒。
pub fn print_status(gripper: &Gripper, output: Output) -> Result<()> {
    if gripper.metrics().frames_decoded == 0
        && gripper.wait_for_feedback(Duration::from_secs(1)).is_err()
    {
        tracing::warn!("No status frame received yet; showing default state");
    }

    let status = gripper.status();
    match output {
        Output::Text => println!("{}", format_status(&status)),
        Output::Json => {
            let value = serde_json::json!({
                "port": gripper.port_name(),
                "status": status,
                "metrics": gripper.metrics(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
    }
    Ok(())
}

fn format_status(status: &DeviceStatus) -> String {
    let flag = |on: bool| if on { "yes" } else { "no" };
    format!(
        "position:     {}\n\
         idle:         {}\n\
         open:         {}\n\
         closed:       {}\n\
         holding:      {}\n\
         fault:        {}\n\
         temp fault:   {}\n\
         temp warning: {}\n\
         maintenance:  {}",
        status.position,
        flag(status.idle),
        flag(status.open),
        flag(status.closed),
        flag(status.holding),
        flag(status.fault),
        flag(status.temp_fault),
        flag(status.temp_warning),
        flag(status.maintenance),
    )
}
