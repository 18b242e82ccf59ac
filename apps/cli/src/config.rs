//! CLI 配置加载
//!
//! 优先级从低到高：默认值 → TOML 配置文件 → 命令行参数。

use anyhow::{Context, Result};
use ieg76_driver::GripperConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径：`<config_dir>/ieg76/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("ieg76");
    path.push("config.toml");
    Some(path)
}

/// 加载配置
///
/// 显式指定的文件必须存在；默认路径下的文件不存在时使用默认配置。
pub fn load(explicit: Option<&Path>) -> Result<GripperConfig> {
    match explicit {
        Some(path) => parse_file(path),
        None => match default_config_file() {
            Some(path) if path.exists() => parse_file(&path),
            _ => Ok(GripperConfig::default()),
        },
    }
}

fn parse_file(path: &Path) -> Result<GripperConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse(content: &str) -> Result<GripperConfig> {
    Ok(toml::from_str(content)?)
}
