//! 漫画生成工作流 - 流程层
//!
//! 核心职责：按固定顺序串行执行四个 Agent
//!
//! 流程顺序：
//! 1. 内容智能 → 2. 教学规划 → 3. 视觉生成 → 4. 质量保证 → 5. 完成
//!
//! 任一 Agent 失败立即终止，生成记录标记为 failed，返回带 `error` 的结果；
//! 质量评估未通过只附加 `quality_warning`，不影响流程。

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::agents::{
    Agent, AgentInput, AgentOutput, ContentIntelligenceAgent, ContentOutput,
    EducationalPlanningAgent, PlanningOutput, QualityAssuranceAgent, QualityOutput,
    VisualGenerationAgent, VisualOutput,
};
use crate::infrastructure::{ContentStore, StatusUpdate};
use crate::models::{GenerationRequest, GenerationStatus};
use crate::services::LlmService;
use crate::workflow::stage::{ProgressReporter, WorkflowStage};

/// 成功路径上的 Agent 数量
const AGENT_COUNT: u32 = 4;
/// 进度消息中的总步数（含最终汇总）
const TOTAL_STEPS: u32 = 5;

/// 执行摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub total_time_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents_executed: Option<u32>,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// 工作流结果
///
/// 序列化后各 Agent 的输出位于各自的键下，另有 `execution_summary`；
/// 失败时带 `error` 字段。
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub generation_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_intelligence: Option<ContentOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub educational_planning: Option<PlanningOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_generation: Option<VisualOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_assurance: Option<QualityOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_warning: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_summary: ExecutionSummary,
    #[serde(skip)]
    pub stage: WorkflowStage,
}

impl WorkflowResult {
    fn started(generation_id: Option<i64>) -> Self {
        Self {
            generation_id,
            content_intelligence: None,
            educational_planning: None,
            visual_generation: None,
            quality_assurance: None,
            quality_warning: None,
            error: None,
            execution_summary: ExecutionSummary {
                total_time_seconds: 0,
                steps_completed: None,
                agents_executed: None,
                status: GenerationStatus::Processing,
                error_message: None,
            },
            stage: WorkflowStage::Created,
        }
    }

    fn advance(&mut self) {
        self.stage = self.stage.next();
    }

    fn fail(&mut self, message: String, started: Instant) {
        self.stage = WorkflowStage::Failed;
        self.error = Some(message.clone());
        self.execution_summary = ExecutionSummary {
            total_time_seconds: started.elapsed().as_secs(),
            steps_completed: None,
            agents_executed: None,
            status: GenerationStatus::Failed,
            error_message: Some(message),
        };
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.stage == WorkflowStage::Completed
    }
}

/// 漫画生成工作流编排器
///
/// - 持有四个 Agent 和存储句柄
/// - 一次调用处理一个请求，Agent 之间严格串行
pub struct WorkflowOrchestrator {
    store: Arc<dyn ContentStore>,
    content_agent: Box<dyn Agent>,
    planning_agent: Box<dyn Agent>,
    visual_agent: Box<dyn Agent>,
    qa_agent: Box<dyn Agent>,
}

impl WorkflowOrchestrator {
    /// 使用默认的四个 Agent 创建编排器
    pub fn new(llm: LlmService, store: Arc<dyn ContentStore>) -> Self {
        Self::with_agents(
            store.clone(),
            Box::new(ContentIntelligenceAgent::new(llm.clone(), store.clone())),
            Box::new(EducationalPlanningAgent::new(llm.clone(), store.clone())),
            Box::new(VisualGenerationAgent::new(llm.clone(), store.clone())),
            Box::new(QualityAssuranceAgent::new(llm, store)),
        )
    }

    /// 使用自定义 Agent 创建编排器
    pub fn with_agents(
        store: Arc<dyn ContentStore>,
        content_agent: Box<dyn Agent>,
        planning_agent: Box<dyn Agent>,
        visual_agent: Box<dyn Agent>,
        qa_agent: Box<dyn Agent>,
    ) -> Self {
        Self {
            store,
            content_agent,
            planning_agent,
            visual_agent,
            qa_agent,
        }
    }

    /// 执行完整工作流
    ///
    /// # 参数
    /// - `request`: 生成请求
    /// - `progress`: 进度回调
    ///
    /// # 返回
    /// 永远返回 [`WorkflowResult`]，失败时 `error` 字段非空
    pub async fn execute_workflow(
        &self,
        request: GenerationRequest,
        progress: &dyn ProgressReporter,
    ) -> WorkflowResult {
        let started = Instant::now();

        let generation_id = match self.store.log_generation(&request).await {
            Ok(id) => id,
            Err(e) => {
                error!("❌ 无法创建生成记录: {}", e);
                let mut result = WorkflowResult::started(None);
                result.fail(format!("无法创建生成记录: {}", e), started);
                return result;
            }
        };

        info!(
            "[生成 #{}] 🚀 开始工作流: 主题='{}', 画风='{}'",
            generation_id, request.topic, request.visual_style
        );

        let mut result = WorkflowResult::started(Some(generation_id));
        match self
            .run_agents(request, generation_id, progress, &mut result)
            .await
        {
            Ok(()) => self.complete(generation_id, started, progress, &mut result).await,
            Err(message) => {
                result.fail(message, started);
                self.persist(generation_id, StatusUpdate::new(GenerationStatus::Failed))
                    .await;
                error!(
                    "[生成 #{}] ❌ 工作流失败: {}",
                    generation_id,
                    result.error.as_deref().unwrap_or_default()
                );
            }
        }

        result
    }

    /// 依次执行四个 Agent，把输出写入 `result`
    async fn run_agents(
        &self,
        request: GenerationRequest,
        generation_id: i64,
        progress: &dyn ProgressReporter,
        result: &mut WorkflowResult,
    ) -> Result<(), String> {
        let mut input = AgentInput::new(request);

        progress.report(&step_message(1, "Analyzing educational content..."));
        let content = match self
            .run_step(self.content_agent.as_ref(), &input, generation_id, 1)
            .await?
        {
            AgentOutput::Content(content) => content,
            other => return Err(unexpected_output(self.content_agent.name(), &other)),
        };
        input = input.with_content(content.clone());
        result.content_intelligence = Some(content);
        result.advance();

        progress.report(&step_message(2, "Planning educational objectives..."));
        match self
            .run_step(self.planning_agent.as_ref(), &input, generation_id, 2)
            .await?
        {
            AgentOutput::Planning(planning) => result.educational_planning = Some(planning),
            other => return Err(unexpected_output(self.planning_agent.name(), &other)),
        }
        result.advance();

        progress.report(&step_message(3, "Generating visual prompts..."));
        match self
            .run_step(self.visual_agent.as_ref(), &input, generation_id, 3)
            .await?
        {
            AgentOutput::Visual(visual) => result.visual_generation = Some(visual),
            other => return Err(unexpected_output(self.visual_agent.name(), &other)),
        }
        result.advance();

        progress.report(&step_message(4, "Quality assurance validation..."));
        let quality = match self
            .run_step(self.qa_agent.as_ref(), &input, generation_id, 4)
            .await?
        {
            AgentOutput::Quality(quality) => quality,
            other => return Err(unexpected_output(self.qa_agent.name(), &other)),
        };
        if !quality.approval_status {
            progress.report("Content needs refinement, continuing with quality warnings...");
            warn!(
                "[生成 #{}] ⚠️ 质量评估未通过，附加 {} 条改进建议",
                generation_id,
                quality.improvements_needed.len()
            );
            result.quality_warning = Some(quality.improvements_needed.clone());
        }
        result.quality_assurance = Some(quality);
        result.advance();

        Ok(())
    }

    async fn run_step(
        &self,
        agent: &dyn Agent,
        input: &AgentInput,
        generation_id: i64,
        step_number: u32,
    ) -> Result<AgentOutput, String> {
        let agent_result = agent.execute(input, generation_id, step_number).await;
        match (agent_result.success, agent_result.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(format!(
                "{} failed: {}",
                agent.name(),
                agent_result
                    .error_message
                    .unwrap_or_else(|| "no output".to_string())
            )),
        }
    }

    async fn complete(
        &self,
        generation_id: i64,
        started: Instant,
        progress: &dyn ProgressReporter,
        result: &mut WorkflowResult,
    ) {
        progress.report(&step_message(TOTAL_STEPS, "Finalizing comic generation..."));

        let total_time_seconds = started.elapsed().as_secs();
        self.persist(
            generation_id,
            StatusUpdate::new(GenerationStatus::Completed)
                .with_generation_time(total_time_seconds as i64),
        )
        .await;

        result.advance();
        result.execution_summary = ExecutionSummary {
            total_time_seconds,
            steps_completed: Some(AGENT_COUNT),
            agents_executed: Some(AGENT_COUNT),
            status: GenerationStatus::Completed,
            error_message: None,
        };
        info!(
            "[生成 #{}] ✅ 工作流完成，耗时 {} 秒",
            generation_id, total_time_seconds
        );
    }

    async fn persist(&self, generation_id: i64, update: StatusUpdate) {
        let status = update.status;
        if let Err(e) = self.store.update_status(generation_id, update).await {
            error!(
                "[生成 #{}] ❌ 状态更新为 {} 失败: {}",
                generation_id, status, e
            );
        }
    }
}

fn step_message(step: u32, message: &str) -> String {
    format!("Step {}/{}: {}", step, TOTAL_STEPS, message)
}

fn unexpected_output(agent_name: &str, output: &AgentOutput) -> String {
    let kind = match output {
        AgentOutput::Content(_) => "content",
        AgentOutput::Planning(_) => "planning",
        AgentOutput::Visual(_) => "visual",
        AgentOutput::Quality(_) => "quality",
    };
    format!("{} failed: unexpected {} output", agent_name, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_message() {
        assert_eq!(
            step_message(1, "Analyzing educational content..."),
            "Step 1/5: Analyzing educational content..."
        );
    }

    #[test]
    fn test_failed_result_serialization() {
        let mut result = WorkflowResult::started(Some(7));
        result.fail("ContentIntelligenceAgent failed: boom".to_string(), Instant::now());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["generation_id"], 7);
        assert_eq!(json["error"], "ContentIntelligenceAgent failed: boom");
        assert_eq!(json["execution_summary"]["status"], "failed");
        assert!(json["execution_summary"].get("steps_completed").is_none());
        assert!(json.get("content_intelligence").is_none());
        assert!(!result.is_success());
    }
}
