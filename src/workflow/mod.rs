pub mod question_ctx;
pub mod question_flow;

pub use question_ctx::QuestionCtx;
pub use question_flow::{GradeMethod, GradingFlow, PaperGrading, PaperStats};
