pub mod ai_grader;
pub mod attribution;
pub mod ocr_service;
pub mod rule_grader;

pub use ai_grader::{AiGrader, AiVerdict};
pub use attribution::attribute;
pub use ocr_service::OcrService;
pub use rule_grader::grade_objective;
