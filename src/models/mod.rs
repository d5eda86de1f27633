pub mod loaders;
pub mod ocr;
pub mod question;
pub mod roi;
pub mod submission;
pub mod template;

pub use loaders::{load_all_templates, load_toml_to_template};
pub use ocr::{OcrPage, OcrSpan, OcrTask, OcrTaskState, OcrTaskStatus, PageSize, TaskInfo};
pub use question::{QuestionDefinition, QuestionType};
pub use roi::QuestionRoi;
pub use submission::{
    Assignment, AttributedAnswers, GradingInput, GradingResult, GradingSummary, ScoreRecordKey,
    Submission, SubmissionStatus,
};
pub use template::PaperTemplate;
