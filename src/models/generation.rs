use std::fmt;

use serde::{Deserialize, Serialize};

/// 生成记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    /// 数据库中的存储值
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    /// 从数据库存储值解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GenerationStatus::Pending),
            "processing" => Some(GenerationStatus::Processing),
            "completed" => Some(GenerationStatus::Completed),
            "failed" => Some(GenerationStatus::Failed),
            _ => None,
        }
    }

    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次生成的持久化记录
///
/// 编排开始时以 `processing` 状态创建，只在终止时（成功或失败）更新一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: i64,
    pub user_id: String,
    pub topic: String,
    pub style: String,
    pub language: String,
    pub status: GenerationStatus,
    pub output_path: Option<String>,
    pub generation_time_seconds: Option<i64>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Agent 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentLogStatus {
    Success,
    Error,
}

impl AgentLogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentLogStatus::Success => "success",
            AgentLogStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(AgentLogStatus::Success),
            "error" => Some(AgentLogStatus::Error),
            _ => None,
        }
    }
}

/// Agent 执行日志（每次 Agent 调用一行，只追加）
///
/// 输入输出快照是截断过的，仅用于排查问题。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLogEntry {
    pub generation_id: i64,
    pub agent_name: String,
    pub step_number: u32,
    pub input_data: Option<String>,
    pub output_data: Option<String>,
    pub execution_time_ms: i64,
    pub status: AgentLogStatus,
    pub error_message: Option<String>,
}
