//! 内容智能 Agent（步骤 1）
//!
//! 生成教学剧本，拆分为场景，并抽取角色表。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agents::{advisory_count, Agent, AgentInput, AgentOutput};
use crate::error::AgentError;
use crate::infrastructure::{ContentStore, ContentType};
use crate::models::{CharacterRegistry, Scene};
use crate::services::script_parser::parse_scenes;
use crate::services::LlmService;

pub const AGENT_NAME: &str = "ContentIntelligenceAgent";

/// 内容分析摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentAnalysis {
    pub topic: String,
    pub age_group: String,
    pub language: String,
    pub scene_count: usize,
    pub character_count: usize,
}

/// 内容智能 Agent 输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentOutput {
    /// 模型生成的原始剧本
    pub script_text: String,
    pub character_registry: CharacterRegistry,
    pub scenes: Vec<Scene>,
    /// 相似历史内容数量（仅供参考）
    pub similar_content_found: usize,
    /// 历史成功生成数量（仅供参考）
    pub successful_patterns: usize,
    pub content_analysis: ContentAnalysis,
}

impl ContentOutput {
    /// 全部对白行数
    pub fn dialogue_count(&self) -> usize {
        self.scenes.iter().map(|s| s.dialogues.len()).sum()
    }
}

pub struct ContentIntelligenceAgent {
    llm: LlmService,
    store: Arc<dyn ContentStore>,
}

impl ContentIntelligenceAgent {
    pub fn new(llm: LlmService, store: Arc<dyn ContentStore>) -> Self {
        Self { llm, store }
    }
}

#[async_trait]
impl Agent for ContentIntelligenceAgent {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    async fn run(&self, input: &AgentInput) -> Result<AgentOutput, AgentError> {
        let request = &input.request;

        let similar_content_found = advisory_count(
            "相似内容",
            self.store
                .search_similar(&request.topic, Some(ContentType::Comic), 3)
                .await,
        );
        let successful_patterns =
            advisory_count("历史成功记录", self.store.successful_patterns(5).await);
        debug!(
            "相似内容 {} 条，历史成功记录 {} 条",
            similar_content_found, successful_patterns
        );

        let script_text = self
            .llm
            .generate_educational_content(&request.topic, &request.age_group, &request.language)
            .await?;

        let character_registry = self.llm.extract_character_info(&script_text).await?;
        let scenes = parse_scenes(&script_text);
        info!(
            "📝 剧本解析完成: {} 个场景, {} 个角色",
            scenes.len(),
            character_registry.len()
        );

        if let Err(e) = self
            .store
            .store_content(
                &request.topic,
                &script_text,
                ContentType::Comic,
                &request.age_group,
            )
            .await
        {
            warn!("⚠️ 剧本保存失败，已忽略: {}", e);
        }

        let content_analysis = ContentAnalysis {
            topic: request.topic.clone(),
            age_group: request.age_group.clone(),
            language: request.language.clone(),
            scene_count: scenes.len(),
            character_count: character_registry.len(),
        };

        Ok(AgentOutput::Content(ContentOutput {
            script_text,
            character_registry,
            scenes,
            similar_content_found,
            successful_patterns,
            content_analysis,
        }))
    }
}
