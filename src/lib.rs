//! # Agentic Comic
//!
//! 一个多智能体协作的教学漫画生成器：输入主题，输出一本多页 PDF 漫画
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `clients/` - 文本生成（OpenAI 兼容接口，带重试）与图像生成（Gemini）
//! - `infrastructure/` - `ContentStore`：生成记录、执行日志、向量相似检索（SQLite）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `LlmService` - 各类提示词与结构化解析
//! - `script_parser` - 剧本 / 角色表 / 评估结果解析
//! - `PanelComposer` - 占位图、对白留白、边框
//! - `assemble_pdf` - 多页 PDF 组装
//!
//! ### ③ Agent 层（Agents）
//! - `agents/` - 统一的 `Agent` 契约 + 四个 Agent
//! - 内容智能 → 教学规划 → 视觉生成 → 质量保证
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 状态机：四个 Agent 严格串行，任一失败即终止
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/panel_renderer` - 并发渲染分镜，三级降级，组装 PDF
//! - `orchestrator/app` - 一次完整生成：工作流 → 渲染 → 回写记录
//!
//! ## 模块结构

pub mod agents;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{GenerationRequest, GenerationStatus};
pub use orchestrator::{App, ComicArtifact, RenderingDriver};
pub use workflow::{WorkflowOrchestrator, WorkflowResult};
