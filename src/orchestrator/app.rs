//! 应用入口 - 编排层
//!
//! ## 职责
//! - 初始化：创建目录和日志文件，构建文本/图像客户端、数据库连接和画面合成器
//! - 运行：执行多智能体工作流，渲染画面，组装 PDF，回写生成记录
//! - 输出最终统计信息
//!
//! 图像客户端或字体不可用不会阻止启动，渲染时会自动降级。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::clients::{GeminiImageClient, ImageGenerator, LlmClient, TextGenerator};
use crate::config::Config;
use crate::infrastructure::{ContentStore, SqliteStore, StatusUpdate};
use crate::models::{GenerationRequest, GenerationStatus};
use crate::orchestrator::panel_renderer::{RenderOutcome, RenderingDriver};
use crate::services::{LlmService, PanelComposer};
use crate::utils::logging::{init_log_file, log_startup, log_step, print_final_stats};
use crate::workflow::{LogProgress, ProgressReporter, WorkflowOrchestrator, WorkflowResult};

/// 一次完整运行的产物
#[derive(Debug)]
pub struct ComicArtifact {
    pub generation_id: Option<i64>,
    pub workflow: WorkflowResult,
    pub render: RenderOutcome,
}

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<dyn ContentStore>,
    workflow: WorkflowOrchestrator,
    renderer: RenderingDriver,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config
            .create_directories()
            .context("创建输出目录失败")?;
        init_log_file(&config.output_log_file).context("初始化日志文件失败")?;

        let text: Arc<dyn TextGenerator> = Arc::new(LlmClient::new(&config));

        let images: Option<Arc<dyn ImageGenerator>> = match GeminiImageClient::new(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("⚠️ 图像客户端初始化失败: {}，所有画面将使用占位图", e);
                None
            }
        };

        let store = SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("连接数据库失败: {}", config.database_url))?;

        let composer = match PanelComposer::load(&config.font_path()) {
            Ok(composer) => composer,
            Err(e) => {
                warn!("⚠️ 字体加载失败: {}，对白将不会绘制", e);
                PanelComposer::without_font()
            }
        };

        Ok(Self::from_parts(
            config,
            text,
            images,
            Arc::new(store),
            composer,
        ))
    }

    /// 使用现成的组件组装应用
    ///
    /// # 参数
    /// - `config`: 配置
    /// - `text`: 文本生成后端
    /// - `images`: 图像生成后端，`None` 时全部使用占位图
    /// - `store`: 数据存储
    /// - `composer`: 画面合成器
    pub fn from_parts(
        config: Config,
        text: Arc<dyn TextGenerator>,
        images: Option<Arc<dyn ImageGenerator>>,
        store: Arc<dyn ContentStore>,
        composer: PanelComposer,
    ) -> Self {
        let workflow = WorkflowOrchestrator::new(LlmService::new(text), store.clone());
        let renderer = RenderingDriver::new(
            images,
            Arc::new(composer),
            config.image_output_folder(),
            config.parallel_workers,
        );

        Self {
            config,
            store,
            workflow,
            renderer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 生成一本漫画
    ///
    /// # 参数
    /// - `request`: 生成请求
    /// - `output_path`: PDF 输出路径，`None` 时根据主题生成
    pub async fn run(
        &self,
        request: GenerationRequest,
        output_path: Option<&Path>,
    ) -> Result<ComicArtifact> {
        self.run_with_progress(request, output_path, &LogProgress)
            .await
    }

    /// 同 [`App::run`]，进度消息交给 `progress`
    pub async fn run_with_progress(
        &self,
        request: GenerationRequest,
        output_path: Option<&Path>,
        progress: &dyn ProgressReporter,
    ) -> Result<ComicArtifact> {
        let started = Instant::now();
        log_startup(
            &request.topic,
            &request.visual_style,
            self.config.parallel_workers,
        );

        let output_path: PathBuf = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.default_output_path(&request.topic));
        let visual_style = request.visual_style.clone();

        log_step(1, 2, "多智能体工作流");
        let workflow = self.workflow.execute_workflow(request, progress).await;
        if let Some(error) = &workflow.error {
            return Err(anyhow!("工作流失败: {}", error));
        }

        let scenes = workflow
            .content_intelligence
            .as_ref()
            .map(|c| c.scenes.as_slice())
            .context("工作流未返回剧本内容")?;
        let prompts = workflow
            .visual_generation
            .as_ref()
            .map(|v| v.visual_prompts.as_slice())
            .context("工作流未返回视觉提示词")?;

        log_step(2, 2, "渲染画面并生成 PDF");
        let render = self
            .renderer
            .render(prompts, scenes, &visual_style, &output_path)
            .await
            .context("漫画渲染失败")?;

        let elapsed_secs = started.elapsed().as_secs();
        if let Some(generation_id) = workflow.generation_id {
            let update = StatusUpdate::new(GenerationStatus::Completed)
                .with_output_path(output_path.display().to_string())
                .with_generation_time(elapsed_secs as i64);
            match self.store.update_status(generation_id, update).await {
                Ok(()) => info!("[生成 #{}] 💾 已记录输出路径", generation_id),
                Err(e) => warn!("[生成 #{}] ⚠️ 输出路径回写失败: {}", generation_id, e),
            }
        }

        print_final_stats(render.page_count, elapsed_secs, &render.output_path);

        Ok(ComicArtifact {
            generation_id: workflow.generation_id,
            workflow,
            render,
        })
    }
}
