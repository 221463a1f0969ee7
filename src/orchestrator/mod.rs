//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次完整的漫画生成，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 持有客户端、数据库和合成器等资源
//! - 串起工作流和渲染，回写生成记录
//! - 输出全局统计信息
//!
//! ### `panel_renderer` - 渲染驱动
//! - 封面同步渲染
//! - 分镜并发渲染（Semaphore 限制并发数）
//! - 图像生成三级降级
//! - 按场景号组装 PDF
//!
//! ## 层次关系
//!
//! ```text
//! app (一次生成请求)
//!     ↓
//! workflow::WorkflowOrchestrator (四个 Agent 串行)      panel_renderer (封面 + 分镜)
//!     ↓                                                     ↓
//! agents → services (能力层：llm / script_parser)        services (panel_composer / pdf_assembler)
//!     ↓                                                     ↓
//! infrastructure (ContentStore)                          clients (ImageGenerator)
//! ```

pub mod app;
pub mod panel_renderer;

// 重新导出主要类型
pub use app::{App, ComicArtifact};
pub use panel_renderer::{RenderOutcome, RenderingDriver};
