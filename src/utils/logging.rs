/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{AppError, AppResult};

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n漫画生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `topic`: 漫画主题
/// - `style`: 画风
/// - `workers`: 并发渲染数
pub fn log_startup(topic: &str, style: &str, workers: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多智能体漫画生成模式");
    info!("📚 主题: {}", topic);
    info!("🎨 画风: {}", style);
    info!("📊 最大并发渲染数: {}", workers);
    info!("{}", "=".repeat(60));
}

/// 记录工作流步骤
///
/// # 参数
/// - `step`: 当前步骤（从 1 开始）
/// - `total`: 步骤总数
/// - `message`: 步骤描述
pub fn log_step(step: usize, total: usize, message: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📦 Step {}/{}: {}", step, total, message);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `pages`: PDF 页数
/// - `elapsed_secs`: 总耗时
/// - `output_path`: 输出文件路径
pub fn print_final_stats(pages: usize, elapsed_secs: u64, output_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 漫画生成完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 页数: {}", pages);
    info!("⏱️ 总耗时: {} 秒", elapsed_secs);
    info!("{}", "=".repeat(60));
    info!("\nPDF 已保存至: {}", output_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 按字符数截断，不追加省略号（用于落库的快照）
pub fn truncate_chars(text: &str, max_len: usize) -> String {
    text.chars().take(max_len).collect()
}
