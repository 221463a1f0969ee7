//! 日志初始化
//!
//! 默认级别为 `info`，可以通过 `RUST_LOG` 覆盖，例如 `RUST_LOG=agentic_comic=debug`。

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化全局日志订阅器
///
/// 重复调用是安全的（测试中经常会多次调用），后续调用会被忽略。
pub fn init() {
    init_with_verbose(false);
}

/// 同 [`init`]，`verbose` 为真且未设置 `RUST_LOG` 时默认级别为 `debug`
pub fn init_with_verbose(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
