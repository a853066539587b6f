//! Blind accumulator toolkit
//!
//! 将各个子 crate 组合在一起，并提供配置文件读写与日志初始化。

pub use acc_crypto;
pub use acc_log;
pub use common;
pub use validator;

use common::{Result, ToolkitConfig};
use std::path::Path;

/// Load toolkit configuration from a JSON file
pub fn load_config(path: impl AsRef<Path>) -> Result<ToolkitConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ToolkitConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save toolkit configuration to a JSON file
pub fn save_config(config: &ToolkitConfig, path: impl AsRef<Path>) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// 安装 env_logger
///
/// `RUST_LOG` 优先；否则使用配置中的过滤器，`verbose` 时提升到 debug。
pub fn init_logging(config: &ToolkitConfig, verbose: bool) {
    let filter = if verbose {
        "debug"
    } else {
        config.log_filter.as_str()
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init();
    log::debug!("logging initialized (filter: {})", filter);
}
