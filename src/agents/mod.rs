//! Agent 层
//!
//! ## 职责
//! - 定义所有 Agent 的统一契约 [`Agent`]
//! - `execute` 负责计时、捕获错误、写执行日志，永远不会把错误抛给编排器
//! - 各 Agent 只实现 `run`，输出类型化的 [`AgentOutput`]
//!
//! ## Agent 列表（按执行顺序）
//! 1. [`ContentIntelligenceAgent`]：生成剧本、拆分场景、抽取角色
//! 2. [`EducationalPlanningAgent`]：学习目标与课程对齐（仅供参考）
//! 3. [`VisualGenerationAgent`]：封面与分镜提示词
//! 4. [`QualityAssuranceAgent`]：质量评估与改进建议（仅供参考）

pub mod content_intelligence;
pub mod educational_planning;
pub mod quality_assurance;
pub mod visual_generation;

use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::AgentError;
use crate::infrastructure::ContentStore;
use crate::models::{AgentLogEntry, AgentLogStatus, GenerationRequest};

pub use content_intelligence::{ContentAnalysis, ContentIntelligenceAgent, ContentOutput};
pub use educational_planning::{
    CurriculumAlignment, EducationalPlanningAgent, PlanningOutput, PlanningSummary,
};
pub use quality_assurance::{
    QualityAssuranceAgent, QualityOutput, SceneValidation, ValidationSummary,
};
pub use visual_generation::{VisualGenerationAgent, VisualOutput};

/// Agent 输入
///
/// 原始请求 + 上游内容 Agent 的输出。序列化后作为执行日志的输入快照。
#[derive(Debug, Clone, Serialize)]
pub struct AgentInput {
    #[serde(flatten)]
    pub request: GenerationRequest,
    #[serde(flatten)]
    pub content: Option<ContentOutput>,
}

impl AgentInput {
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            request,
            content: None,
        }
    }

    pub fn with_content(mut self, content: ContentOutput) -> Self {
        self.content = Some(content);
        self
    }

    /// 上游内容输出，缺失时报错
    pub fn content(&self) -> Result<&ContentOutput, AgentError> {
        self.content
            .as_ref()
            .ok_or(AgentError::MissingUpstream(content_intelligence::AGENT_NAME))
    }
}

/// Agent 输出
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AgentOutput {
    Content(ContentOutput),
    Planning(PlanningOutput),
    Visual(VisualOutput),
    Quality(QualityOutput),
}

/// Agent 执行结果
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub success: bool,
    pub data: Option<AgentOutput>,
    pub execution_time_ms: i64,
    pub error_message: Option<String>,
    pub step_number: u32,
}

impl AgentResult {
    fn success(data: AgentOutput, execution_time_ms: i64, step_number: u32) -> Self {
        Self {
            success: true,
            data: Some(data),
            execution_time_ms,
            error_message: None,
            step_number,
        }
    }

    fn failure(message: String, execution_time_ms: i64, step_number: u32) -> Self {
        Self {
            success: false,
            data: None,
            execution_time_ms,
            error_message: Some(message),
            step_number,
        }
    }
}

/// Agent 契约
#[async_trait]
pub trait Agent: Send + Sync {
    /// 写入执行日志的 Agent 名称
    fn name(&self) -> &'static str;

    /// 执行日志写入的存储
    fn store(&self) -> &dyn ContentStore;

    /// Agent 本身的逻辑
    async fn run(&self, input: &AgentInput) -> Result<AgentOutput, AgentError>;

    /// 执行 Agent：计时、捕获错误、写一条执行日志
    ///
    /// # 参数
    /// - `input`: Agent 输入
    /// - `generation_id`: 所属生成记录
    /// - `step_number`: 流程中的步骤号（从 1 开始）
    ///
    /// # 返回
    /// 永远返回 [`AgentResult`]，失败信息在 `error_message` 中
    async fn execute(&self, input: &AgentInput, generation_id: i64, step_number: u32) -> AgentResult {
        let started = Instant::now();
        let outcome = self.run(input).await;
        let elapsed_ms = started.elapsed().as_millis() as i64;

        let result = match outcome {
            Ok(data) => {
                info!(
                    "[生成 #{}] ✅ {} 完成 ({} ms)",
                    generation_id,
                    self.name(),
                    elapsed_ms
                );
                AgentResult::success(data, elapsed_ms, step_number)
            }
            Err(e) => {
                error!("[生成 #{}] ❌ {} 失败: {}", generation_id, self.name(), e);
                AgentResult::failure(e.to_string(), elapsed_ms, step_number)
            }
        };

        let entry = log_entry(self.name(), generation_id, input, &result);
        if let Err(e) = self.store().log_agent_execution(&entry).await {
            warn!(
                "[生成 #{}] ⚠️ {} 执行日志写入失败: {}",
                generation_id,
                self.name(),
                e
            );
        }

        result
    }
}

fn log_entry(
    agent_name: &str,
    generation_id: i64,
    input: &AgentInput,
    result: &AgentResult,
) -> AgentLogEntry {
    AgentLogEntry {
        generation_id,
        agent_name: agent_name.to_string(),
        step_number: result.step_number,
        input_data: serde_json::to_string(input).ok(),
        output_data: result
            .data
            .as_ref()
            .and_then(|data| serde_json::to_string(data).ok()),
        execution_time_ms: result.execution_time_ms,
        status: if result.success {
            AgentLogStatus::Success
        } else {
            AgentLogStatus::Error
        },
        error_message: result.error_message.clone(),
    }
}

/// 参考性查询：失败时记录警告并按 0 计数
pub(crate) fn advisory_count<T, E: std::fmt::Display>(
    what: &str,
    result: Result<Vec<T>, E>,
) -> usize {
    match result {
        Ok(items) => items.len(),
        Err(e) => {
            warn!("⚠️ {}查询失败，按 0 处理: {}", what, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::infrastructure::SqliteStore;

    /// 根据开关成功或失败的测试 Agent
    struct Probe {
        store: SqliteStore,
        fail: bool,
    }

    #[async_trait]
    impl Agent for Probe {
        fn name(&self) -> &'static str {
            "ProbeAgent"
        }

        fn store(&self) -> &dyn ContentStore {
            &self.store
        }

        async fn run(&self, input: &AgentInput) -> Result<AgentOutput, AgentError> {
            if self.fail {
                input.content()?;
            }
            Ok(AgentOutput::Planning(PlanningOutput::default()))
        }
    }

    async fn probe(fail: bool) -> (Probe, i64) {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store
            .log_generation(&GenerationRequest::new("Fractions", "manga"))
            .await
            .unwrap();
        (Probe { store, fail }, id)
    }

    #[tokio::test]
    async fn test_execute_logs_success() {
        let (agent, id) = probe(false).await;
        let input = AgentInput::new(GenerationRequest::new("Fractions", "manga"));

        let result = agent.execute(&input, id, 2).await;
        assert!(result.success);
        assert_eq!(result.step_number, 2);
        assert!(result.error_message.is_none());

        let logs = agent.store.agent_logs(id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].agent_name, "ProbeAgent");
        assert_eq!(logs[0].status, AgentLogStatus::Success);
        assert!(logs[0].input_data.as_deref().unwrap().contains("Fractions"));
    }

    #[tokio::test]
    async fn test_execute_captures_failure() {
        let (agent, id) = probe(true).await;
        let input = AgentInput::new(GenerationRequest::new("Fractions", "manga"));

        let result = agent.execute(&input, id, 3).await;
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result
            .error_message
            .as_deref()
            .unwrap()
            .contains("ContentIntelligenceAgent"));

        let logs = agent.store.agent_logs(id).await.unwrap();
        assert_eq!(logs[0].status, AgentLogStatus::Error);
        assert!(logs[0].output_data.is_none());
    }

    #[test]
    fn test_advisory_count_degrades_to_zero() {
        assert_eq!(advisory_count::<u8, StoreError>("测试", Ok(vec![1, 2, 3])), 3);
        let err = StoreError::EmbeddingFailed {
            reason: "empty".to_string(),
        };
        assert_eq!(advisory_count::<u8, _>("测试", Err(err)), 0);
    }
}
