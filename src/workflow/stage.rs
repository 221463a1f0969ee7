//! 工作流状态与进度回调

use std::fmt::Display;

use serde::Serialize;
use tracing::info;

/// 工作流状态
///
/// `Created → ContentDone → PlanningDone → VisualDone → QaDone → Completed`，
/// 任一步骤失败进入 `Failed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    #[default]
    Created,
    ContentDone,
    PlanningDone,
    VisualDone,
    QaDone,
    Completed,
    Failed,
}

impl WorkflowStage {
    /// 成功路径上的下一个状态；终止状态返回自身
    pub fn next(self) -> Self {
        match self {
            WorkflowStage::Created => WorkflowStage::ContentDone,
            WorkflowStage::ContentDone => WorkflowStage::PlanningDone,
            WorkflowStage::PlanningDone => WorkflowStage::VisualDone,
            WorkflowStage::VisualDone => WorkflowStage::QaDone,
            WorkflowStage::QaDone => WorkflowStage::Completed,
            WorkflowStage::Completed => WorkflowStage::Completed,
            WorkflowStage::Failed => WorkflowStage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStage::Completed | WorkflowStage::Failed)
    }
}

impl Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStage::Created => "created",
            WorkflowStage::ContentDone => "content_done",
            WorkflowStage::PlanningDone => "planning_done",
            WorkflowStage::VisualDone => "visual_done",
            WorkflowStage::QaDone => "qa_done",
            WorkflowStage::Completed => "completed",
            WorkflowStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 进度回调
pub trait ProgressReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// 默认进度回调：写到 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, message: &str) {
        info!("⏳ {}", message);
    }
}

impl<F> ProgressReporter for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}
