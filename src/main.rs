use std::path::PathBuf;

use agentic_comic::config::{language_name, Config};
use agentic_comic::models::GenerationRequest;
use agentic_comic::{logger, App};
use anyhow::{bail, Context, Result};
use clap::Parser;

/// 多智能体教学漫画生成器
#[derive(Debug, Parser)]
#[command(name = "agentic-comic", version, about)]
struct Cli {
    /// 教学主题，例如 "Solar System and Planets"
    topic: String,

    /// 画风
    #[arg(short, long, default_value = "superhero")]
    style: String,

    /// 目标年龄段，默认取配置中的值
    #[arg(short, long)]
    age_group: Option<String>,

    /// 语言代码，默认取配置中的值
    #[arg(short, long)]
    language: Option<String>,

    /// PDF 输出路径，默认根据主题生成
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML 配置文件，不指定时从环境变量读取
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env（不存在时忽略）
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
        None => Config::from_env().context("加载环境变量配置失败")?,
    };

    // 初始化日志
    logger::init_with_verbose(config.verbose_logging);

    let request = GenerationRequest::new(&cli.topic, &cli.style)
        .with_age_group(
            cli.age_group
                .clone()
                .unwrap_or_else(|| config.default_age_group.clone()),
        )
        .with_language(
            cli.language
                .clone()
                .unwrap_or_else(|| config.language.clone()),
        );

    if language_name(&request.language).is_none() {
        bail!("不支持的语言代码: {}", request.language);
    }

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    app.run(request, cli.output.as_deref()).await?;

    Ok(())
}
