//! 教学规划 Agent（步骤 2）
//!
//! 生成学习目标并给出课程对齐摘要。结果仅供参考，不影响后续流程。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::{advisory_count, Agent, AgentInput, AgentOutput};
use crate::error::AgentError;
use crate::infrastructure::{ContentStore, ContentType};
use crate::services::LlmService;

pub const AGENT_NAME: &str = "EducationalPlanningAgent";

/// 固定的课程对齐评分（满分 10）
const ALIGNMENT_SCORE: f64 = 8.5;

const COVERAGE_AREAS: [&str; 3] = [
    "comprehension",
    "critical thinking",
    "knowledge application",
];

/// 课程对齐分析
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumAlignment {
    pub score: f64,
    pub aligned_standards: usize,
    pub coverage_areas: Vec<String>,
    pub gaps: Vec<String>,
}

impl CurriculumAlignment {
    fn with_references(reference_count: usize) -> Self {
        Self {
            score: ALIGNMENT_SCORE,
            aligned_standards: reference_count,
            coverage_areas: COVERAGE_AREAS.iter().map(|s| s.to_string()).collect(),
            gaps: Vec::new(),
        }
    }
}

/// 规划摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningSummary {
    pub topic: String,
    pub age_group: String,
    pub alignment_score: f64,
    pub objectives_count: usize,
}

/// 教学规划 Agent 输出
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningOutput {
    pub learning_objectives: Vec<String>,
    pub curriculum_alignment: CurriculumAlignment,
    pub curriculum_references: usize,
    pub educational_planning: PlanningSummary,
}

pub struct EducationalPlanningAgent {
    llm: LlmService,
    store: Arc<dyn ContentStore>,
}

impl EducationalPlanningAgent {
    pub fn new(llm: LlmService, store: Arc<dyn ContentStore>) -> Self {
        Self { llm, store }
    }
}

#[async_trait]
impl Agent for EducationalPlanningAgent {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    async fn run(&self, input: &AgentInput) -> Result<AgentOutput, AgentError> {
        let request = &input.request;
        // 依赖内容 Agent 的输出
        input.content()?;

        let curriculum_references = advisory_count(
            "课程标准",
            self.store
                .search_similar(
                    &format!("{} curriculum {}", request.topic, request.age_group),
                    Some(ContentType::Curriculum),
                    3,
                )
                .await,
        );

        let learning_objectives = self
            .llm
            .generate_learning_objectives(&request.topic, &request.age_group)
            .await?;

        let curriculum_alignment = CurriculumAlignment::with_references(curriculum_references);
        let educational_planning = PlanningSummary {
            topic: request.topic.clone(),
            age_group: request.age_group.clone(),
            alignment_score: curriculum_alignment.score,
            objectives_count: learning_objectives.len(),
        };

        Ok(AgentOutput::Planning(PlanningOutput {
            learning_objectives,
            curriculum_alignment,
            curriculum_references,
            educational_planning,
        }))
    }
}
