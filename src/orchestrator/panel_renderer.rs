//! 画面渲染驱动
//!
//! ## 职责
//! - 封面：同步渲染
//! - 分镜：每个场景一个任务，Semaphore 限制并发，全部完成后再汇总
//! - 每张图走三级降级链：专用接口 → 通用接口 → 本地占位图
//! - 分镜图加对白留白和边框
//! - 按场景号升序（封面为 0）组装 PDF
//!
//! 单个场景失败只会让该场景缺页，只有一张图都没有时才报错。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::clients::ImageGenerator;
use crate::error::RenderError;
use crate::models::{PromptKind, RenderedPanel, Scene, VisualPrompt};
use crate::services::panel_composer::{add_line_breaks, random_image_name};
use crate::services::{assemble_pdf, PanelComposer};

/// 渲染结果
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    /// 按场景号升序，封面在最前
    pub panels: Vec<RenderedPanel>,
    pub output_path: PathBuf,
    pub page_count: usize,
}

/// 单张图片的渲染器（可在任务间克隆）
#[derive(Clone)]
struct PanelRenderer {
    images: Option<Arc<dyn ImageGenerator>>,
    composer: Arc<PanelComposer>,
    image_folder: PathBuf,
}

impl PanelRenderer {
    /// 三级降级链
    async fn render_image(
        &self,
        kind: PromptKind,
        prompt: &str,
        image_name: &str,
        visual_style: &str,
    ) -> Result<PathBuf, RenderError> {
        if let Some(images) = &self.images {
            let specialised = match kind {
                PromptKind::Poster => images.generate_comic_poster(prompt, image_name).await,
                PromptKind::Scene => {
                    images
                        .generate_comic_panel(prompt, image_name, visual_style)
                        .await
                }
            };
            match specialised {
                Ok(path) => return Ok(path),
                Err(e) => warn!("⚠️ 专用图像接口失败 ({}): {}，尝试通用接口", image_name, e),
            }

            match images.generate_image(prompt, image_name).await {
                Ok(path) => return Ok(path),
                Err(e) => warn!("⚠️ 通用图像接口失败 ({}): {}，改用占位图", image_name, e),
            }
        } else {
            warn!("⚠️ 图像客户端不可用，直接生成占位图 ({})", image_name);
        }

        let composer = self.composer.clone();
        let folder = self.image_folder.clone();
        let name = image_name.to_string();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || composer.create_placeholder(&folder, &name, &prompt))
            .await
            .map_err(|e| RenderError::TaskPanicked {
                reason: e.to_string(),
            })?
    }

    /// 渲染一个场景：出图后叠加对白
    async fn render_scene(
        &self,
        prompt: VisualPrompt,
        scene: Option<Scene>,
        visual_style: String,
    ) -> Result<RenderedPanel, RenderError> {
        let image_name = random_image_name();
        let path = self
            .render_image(PromptKind::Scene, &prompt.prompt, &image_name, &visual_style)
            .await?;

        let dialogue = scene.map(|s| s.combined_dialogue()).unwrap_or_default();
        if !dialogue.is_empty() {
            let text = add_line_breaks(&dialogue);
            let composer = self.composer.clone();
            let target = path.clone();
            let overlay =
                tokio::task::spawn_blocking(move || composer.overlay_dialogue(&target, &text))
                    .await
                    .map_err(|e| RenderError::TaskPanicked {
                        reason: e.to_string(),
                    })
                    .and_then(|r| r);
            if let Err(e) = overlay {
                warn!(
                    "⚠️ 场景 {} 对白叠加失败，保留原图: {}",
                    prompt.scene_number, e
                );
            }
        }

        Ok(RenderedPanel {
            scene_number: prompt.scene_number,
            file_path: path,
        })
    }
}

/// 渲染驱动
pub struct RenderingDriver {
    renderer: PanelRenderer,
    workers: usize,
}

impl RenderingDriver {
    /// # 参数
    /// - `images`: 图像后端，`None` 时所有画面直接使用占位图
    /// - `composer`: 画面合成器
    /// - `image_folder`: 占位图输出目录
    /// - `workers`: 分镜并发数
    pub fn new(
        images: Option<Arc<dyn ImageGenerator>>,
        composer: Arc<PanelComposer>,
        image_folder: impl Into<PathBuf>,
        workers: usize,
    ) -> Self {
        Self {
            renderer: PanelRenderer {
                images,
                composer,
                image_folder: image_folder.into(),
            },
            workers: workers.max(1),
        }
    }

    /// 渲染所有画面并组装 PDF
    pub async fn render(
        &self,
        prompts: &[VisualPrompt],
        scenes: &[Scene],
        visual_style: &str,
        output_path: &Path,
    ) -> Result<RenderOutcome, RenderError> {
        let mut rendered: BTreeMap<u32, PathBuf> = BTreeMap::new();

        if let Some(poster) = self.render_poster(prompts, visual_style).await {
            rendered.insert(0, poster);
        }

        for panel in self.render_scenes(prompts, scenes, visual_style).await {
            rendered.insert(panel.scene_number, panel.file_path);
        }

        let panels: Vec<RenderedPanel> = rendered
            .into_iter()
            .map(|(scene_number, file_path)| RenderedPanel {
                scene_number,
                file_path,
            })
            .collect();

        if panels.is_empty() {
            error!("❌ 没有任何图片生成成功");
            return Err(RenderError::NoImagesGenerated);
        }

        let ordered: Vec<PathBuf> = panels.iter().map(|p| p.file_path.clone()).collect();
        let target = output_path.to_path_buf();
        let page_count = tokio::task::spawn_blocking(move || assemble_pdf(&ordered, &target))
            .await
            .map_err(|e| RenderError::TaskPanicked {
                reason: e.to_string(),
            })??;

        Ok(RenderOutcome {
            panels,
            output_path: output_path.to_path_buf(),
            page_count,
        })
    }

    async fn render_poster(&self, prompts: &[VisualPrompt], visual_style: &str) -> Option<PathBuf> {
        let poster = prompts.iter().find(|p| p.kind == PromptKind::Poster)?;
        info!("🎨 正在生成封面...");

        match self
            .renderer
            .render_image(
                PromptKind::Poster,
                &poster.prompt,
                &random_image_name(),
                visual_style,
            )
            .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                error!("❌ 封面生成失败: {}", e);
                None
            }
        }
    }

    /// 每个场景取第一个提示词，并发渲染
    async fn render_scenes(
        &self,
        prompts: &[VisualPrompt],
        scenes: &[Scene],
        visual_style: &str,
    ) -> Vec<RenderedPanel> {
        let mut first_prompts: BTreeMap<u32, &VisualPrompt> = BTreeMap::new();
        for prompt in prompts.iter().filter(|p| p.kind == PromptKind::Scene) {
            if prompt.scene_number == 0 {
                warn!("⚠️ 场景号 0 保留给封面，已忽略该提示词");
                continue;
            }
            first_prompts.entry(prompt.scene_number).or_insert(prompt);
        }

        if first_prompts.is_empty() {
            return Vec::new();
        }

        info!(
            "🖼️ 开始渲染 {} 个场景 (并发数: {})",
            first_prompts.len(),
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(first_prompts.len());

        for (scene_number, prompt) in first_prompts {
            let renderer = self.renderer.clone();
            let prompt = prompt.clone();
            let scene = scenes.iter().find(|s| s.scene_number == scene_number).cloned();
            let style = visual_style.to_string();
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| RenderError::TaskPanicked {
                        reason: e.to_string(),
                    })?;
                debug!("场景 {} 开始渲染", scene_number);
                renderer.render_scene(prompt, scene, style).await
            });
            handles.push((scene_number, handle));
        }

        let (scene_numbers, handles): (Vec<u32>, Vec<_>) = handles.into_iter().unzip();
        let mut slots: Vec<Option<RenderedPanel>> = vec![None; scene_numbers.len()];

        for (idx, joined) in join_all(handles).await.into_iter().enumerate() {
            let scene_number = scene_numbers[idx];
            match joined {
                Ok(Ok(panel)) => {
                    info!("✅ 场景 {} 渲染完成", scene_number);
                    slots[idx] = Some(panel);
                }
                Ok(Err(e)) => error!("❌ 场景 {} 渲染失败: {}", scene_number, e),
                Err(e) => error!("❌ 场景 {} 任务异常退出: {}", scene_number, e),
            }
        }

        slots.into_iter().flatten().collect()
    }
}
