//! 视觉生成 Agent（步骤 3）
//!
//! 先生成一个封面提示词，再为每个场景的每一句对白生成一个分镜提示词。
//! 渲染时每个场景只取第一个提示词，其余的保留在输出中供排查。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agents::{advisory_count, Agent, AgentInput, AgentOutput};
use crate::error::AgentError;
use crate::infrastructure::ContentStore;
use crate::models::{PromptKind, VisualPrompt};
use crate::services::LlmService;

pub const AGENT_NAME: &str = "VisualGenerationAgent";

/// 角色表为空时封面使用的默认角色
const DEFAULT_CHARACTERS: [&str; 2] = ["protagonist", "supporting character"];

/// 视觉生成 Agent 输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualOutput {
    /// 第一个总是封面，其后按场景、对白顺序排列
    pub visual_prompts: Vec<VisualPrompt>,
    pub total_prompts: usize,
    pub poster_prompt: String,
    pub characters_processed: usize,
    pub scenes_processed: usize,
}

impl VisualOutput {
    /// 封面提示词
    pub fn poster(&self) -> Option<&VisualPrompt> {
        self.visual_prompts
            .iter()
            .find(|p| p.kind == PromptKind::Poster)
    }

    /// 全部分镜提示词
    pub fn scene_prompts(&self) -> impl Iterator<Item = &VisualPrompt> {
        self.visual_prompts
            .iter()
            .filter(|p| p.kind == PromptKind::Scene)
    }
}

pub struct VisualGenerationAgent {
    llm: LlmService,
    store: Arc<dyn ContentStore>,
}

impl VisualGenerationAgent {
    pub fn new(llm: LlmService, store: Arc<dyn ContentStore>) -> Self {
        Self { llm, store }
    }
}

#[async_trait]
impl Agent for VisualGenerationAgent {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    async fn run(&self, input: &AgentInput) -> Result<AgentOutput, AgentError> {
        let request = &input.request;
        let content = input.content()?;
        let style = &request.visual_style;

        let character_names: Vec<String> = if content.character_registry.is_empty() {
            DEFAULT_CHARACTERS.iter().map(|s| s.to_string()).collect()
        } else {
            content.character_registry.keys().cloned().collect()
        };

        let poster_prompt = self
            .llm
            .generate_comic_poster_prompt(&request.topic, style, &character_names)
            .await?;

        let mut visual_prompts = Vec::with_capacity(1 + content.dialogue_count());
        visual_prompts.push(VisualPrompt::poster(poster_prompt.clone()));

        for scene in &content.scenes {
            let scene_context = format!(
                "Scene {} of educational comic about {}",
                scene.scene_number, request.topic
            );

            for line in &scene.dialogues {
                let similar_templates = advisory_count(
                    "角色模板",
                    self.store
                        .search_templates(
                            &format!("{} {}", line.character, line.dialogue),
                            Some(style.as_str()),
                            2,
                        )
                        .await,
                );

                let prompt = self
                    .llm
                    .generate_visual_prompt(&line.character, &line.dialogue, &scene_context, style)
                    .await?;
                debug!("场景 {} / {} 提示词已生成", scene.scene_number, line.character);

                visual_prompts.push(VisualPrompt::scene(
                    scene.scene_number,
                    line.character.clone(),
                    line.dialogue.clone(),
                    prompt,
                    similar_templates,
                ));
            }
        }

        Ok(AgentOutput::Visual(VisualOutput {
            total_prompts: visual_prompts.len(),
            visual_prompts,
            poster_prompt,
            characters_processed: content.character_registry.len(),
            scenes_processed: content.scenes.len(),
        }))
    }
}
