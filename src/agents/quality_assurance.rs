//! 质量保证 Agent（步骤 4）
//!
//! 对整部剧本评估一次，再逐句评估对白。
//! 未通过只会产生改进建议，不会中断流程。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::{Agent, AgentInput, AgentOutput};
use crate::error::AgentError;
use crate::infrastructure::ContentStore;
use crate::services::script_parser::{extract_improvements, is_approved};
use crate::services::LlmService;

pub const AGENT_NAME: &str = "QualityAssuranceAgent";

/// 单句对白的评估
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneValidation {
    pub scene_number: u32,
    pub character: String,
    pub dialogue: String,
    pub analysis: String,
}

/// 评估摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSummary {
    pub content_approved: bool,
    pub scenes_checked: usize,
    pub improvement_count: usize,
}

/// 质量保证 Agent 输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityOutput {
    /// 整部剧本的评估报告
    pub quality_analysis: String,
    pub scene_validations: Vec<SceneValidation>,
    pub approval_status: bool,
    pub improvements_needed: Vec<String>,
    pub total_scenes_validated: usize,
    pub validation_summary: ValidationSummary,
}

pub struct QualityAssuranceAgent {
    llm: LlmService,
    store: Arc<dyn ContentStore>,
}

impl QualityAssuranceAgent {
    pub fn new(llm: LlmService, store: Arc<dyn ContentStore>) -> Self {
        Self { llm, store }
    }
}

#[async_trait]
impl Agent for QualityAssuranceAgent {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    async fn run(&self, input: &AgentInput) -> Result<AgentOutput, AgentError> {
        let request = &input.request;
        let content = input.content()?;

        let quality_analysis = self
            .llm
            .analyze_content_quality(&content.script_text, &request.topic, &request.age_group)
            .await?;

        let mut scene_validations = Vec::with_capacity(content.dialogue_count());
        for scene in &content.scenes {
            for line in &scene.dialogues {
                let analysis = self
                    .llm
                    .analyze_content_quality(
                        &format!("Character {}: {}", line.character, line.dialogue),
                        &request.topic,
                        &request.age_group,
                    )
                    .await?;

                scene_validations.push(SceneValidation {
                    scene_number: scene.scene_number,
                    character: line.character.clone(),
                    dialogue: line.dialogue.clone(),
                    analysis,
                });
            }
        }

        let approval_status = is_approved(&quality_analysis);
        let improvements_needed = if approval_status {
            Vec::new()
        } else {
            extract_improvements(&quality_analysis)
        };
        info!(
            "🔎 质量评估: {}，改进建议 {} 条",
            if approval_status { "通过" } else { "未通过" },
            improvements_needed.len()
        );

        let validation_summary = ValidationSummary {
            content_approved: approval_status,
            scenes_checked: scene_validations.len(),
            improvement_count: improvements_needed.len(),
        };

        Ok(AgentOutput::Quality(QualityOutput {
            quality_analysis,
            scene_validations,
            approval_status,
            improvements_needed,
            total_scenes_validated: content.scenes.len(),
            validation_summary,
        }))
    }
}
