//! # IEG 76 CLI
//!
//! Command-line interface for the Weiss IEG 76 gripper.
//!
//! ## One-shot 模式（适合脚本）
//!
//! ```bash
//! # 连接 -> 初始化 -> 执行命令 -> 断开
//! ieg76-cli --port /dev/ttyACM0 open
//! ieg76-cli grasp --json
//! ```
//!
//! ## REPL 模式（适合调试）
//!
//! ```bash
//! $ ieg76-cli shell
//! ieg76> reference
//! ieg76> grasp
//! ieg76> status
//! ieg76> exit
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ieg76_driver::serial::available_ports;
use ieg76_driver::{Gripper, GripperBuilder};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod commands;
mod config;
mod repl;

use commands::{GripperCommand, Output};

/// IEG 76 CLI - 夹爪命令行工具
#[derive(Parser, Debug)]
#[command(name = "ieg76-cli")]
#[command(about = "Command-line interface for the Weiss IEG 76 gripper", long_about = None)]
#[command(version)]
struct Cli {
    /// 串口路径（覆盖配置文件）
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// 波特率（覆盖配置文件）
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// 配置文件（默认 <config_dir>/ieg76/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 打开串口的最大尝试次数（默认无限重试）
    #[arg(long, global = true)]
    max_open_attempts: Option<u32>,

    /// 以 JSON 输出结果
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 回参考点（不等待完成）
    Reference,

    /// 张开夹爪
    Open,

    /// 完全闭合夹爪
    Close,

    /// 抓取物体
    Grasp,

    /// 显示设备状态
    Status,

    /// 列出可用串口
    Ports,

    /// 启动交互式 Shell（REPL 模式）
    Shell,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ieg76=info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<bool> {
    let output = if cli.json { Output::Json } else { Output::Text };

    // `None` 表示进入 REPL
    let command = match cli.command {
        Commands::Ports => {
            list_ports(output)?;
            return Ok(true);
        },
        Commands::Shell => None,
        Commands::Reference => Some(GripperCommand::Reference),
        Commands::Open => Some(GripperCommand::Open),
        Commands::Close => Some(GripperCommand::Close),
        Commands::Grasp => Some(GripperCommand::Grasp),
        Commands::Status => Some(GripperCommand::Status),
    };

    // Ctrl-C 清除运行标志：中断打开重试，并让读线程退出
    let is_running = Arc::new(AtomicBool::new(true));
    {
        let is_running = is_running.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Shutting down...");
            is_running.store(false, Ordering::Release);
        })
        .context("Failed to set signal handler")?;
    }

    let gripper = connect(&cli, is_running.clone())?;

    match command {
        Some(command) => commands::execute(&gripper, command, output),
        None => {
            repl::run_repl(&gripper, output, is_running)?;
            Ok(true)
        },
    }
}

fn connect(cli: &Cli, is_running: Arc<AtomicBool>) -> Result<Gripper> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(port) = &cli.port {
        config.port.path = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.port.baud_rate = baud;
    }
    if let Some(attempts) = cli.max_open_attempts {
        config.port.max_open_attempts = Some(attempts);
    }

    let path = config.port.path.clone();
    GripperBuilder::new()
        .config(config)
        .shutdown_flag(is_running)
        .build()
        .with_context(|| format!("Failed to connect to the gripper on {}", path))
}

fn list_ports(output: Output) -> Result<()> {
    let ports = available_ports();
    match output {
        Output::Json => println!("{}", serde_json::to_string(&ports)?),
        Output::Text if ports.is_empty() => println!("No serial ports found"),
        Output::Text => {
            for port in ports {
                println!("{}", port);
            }
        },
    }
    Ok(())
}
