//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量评分和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量答题卡处理器
//! - 控制并发数量（Semaphore）
//! - 单份失败不影响其他答题卡
//! - 输出全局统计信息
//!
//! ### `submission_processor` - 单份提交处理器
//! - OCR → 归属 → 逐题评分
//! - 按提交 ID 串行落库，重复评分返回已有结果
//! - 成绩发布
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PaperJob>)
//!     ↓
//! submission_processor (处理单份提交)
//!     ↓
//! workflow::GradingFlow (处理单道题)
//!     ↓
//! services (能力层：ocr / attribution / rule / ai)
//!     ↓
//! infrastructure (基础设施：store / locks / sleeper)
//! ```

pub mod batch_processor;
pub mod submission_processor;

// 重新导出主要类型
pub use batch_processor::{BatchProcessor, BatchSummary, PaperJob, PaperOutcome};
pub use submission_processor::SubmissionOrchestrator;
