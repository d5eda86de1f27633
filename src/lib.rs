//! # Answer Sheet Grading
//!
//! 答题卡自动评分库：OCR 识别 → 作答归属 → 规则 / AI 评分 → 幂等落库
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有进程级资源，只暴露能力
//! - `Sleeper` - 可注入的等待能力（测试中不真正等待）
//! - `MockTaskStore` - 离线 OCR 任务表
//! - `KeyedLocks` - 按提交 ID 串行化写入
//! - `SubmissionStore` / `ScoreStore` - 外部存储契约
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `OcrService` - 上传、轮询、下载识别结果
//! - `attribute` - 文字片段 → 每道题的作答
//! - `grade_objective` - 客观题规则评分
//! - `AiGrader` - 主观题 AI 评分（mock → vision → text）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整评分流程
//! - `QuestionCtx` - 上下文封装（submission_id + question_index）
//! - `GradingFlow` - 流程编排（未作答 / 规则 / AI）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量答题卡处理器，管理并发
//! - `orchestrator/submission_processor` - 单份提交处理器，负责落库和成绩发布
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{AiMode, Config, OcrMode};
pub use error::{AdapterError, AppError, AppResult, ConfigError, OcrError, StoreError};
pub use models::{
    GradingInput, GradingResult, GradingSummary, PaperTemplate, QuestionDefinition, QuestionRoi,
};
pub use orchestrator::{BatchProcessor, BatchSummary, PaperJob, PaperOutcome, SubmissionOrchestrator};
pub use workflow::{GradingFlow, QuestionCtx};
