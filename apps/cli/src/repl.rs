//! REPL 模式（交互式 Shell）
//!
//! 整个会话持有同一个 `Gripper`，读线程持续运行，命令之间共享设备状态。

use crate::commands::{self, GripperCommand, Output};
use anyhow::Result;
use ieg76_driver::Gripper;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const HISTORY_FILE: &str = ".ieg76_history";

/// 运行 REPL，直到 `exit`、Ctrl-D 或运行标志被清除
pub fn run_repl(gripper: &Gripper, output: Output, is_running: Arc<AtomicBool>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    rl.load_history(HISTORY_FILE).ok(); // 首次运行没有历史文件

    println!(
        "IEG 76 CLI v{} - interactive shell on {}",
        env!("CARGO_PKG_VERSION"),
        gripper.port_name()
    );
    println!("Type 'help' for a list of commands, 'exit' to quit");
    println!();

    while is_running.load(Ordering::Acquire) {
        let line = match rl.readline("ieg76> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            },
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {:?}", e);
                break;
            },
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        match line {
            "exit" | "quit" => break,
            "help" => print_help(),
            _ => match line.parse::<GripperCommand>() {
                Ok(command) => {
                    if let Err(e) = commands::execute(gripper, command, output) {
                        eprintln!("Error: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("{}", e);
                    println!("Type 'help' for a list of commands");
                },
            },
        }
    }

    rl.save_history(HISTORY_FILE).ok();
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  reference    Move the jaws to the reference position (no wait)");
    println!("  open         Open the jaws");
    println!("  close        Close the jaws completely");
    println!("  grasp        Grasp an object");
    println!("  close-port   Close the serial port");
    println!("  status       Show the latest device status");
    println!("  help         Show this help");
    println!("  exit         Leave the shell");
}
