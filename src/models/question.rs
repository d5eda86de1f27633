use serde::{Deserialize, Serialize};

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// 单选题
    SingleChoice,
    /// 判断题
    TrueFalse,
    /// 主观题
    Subjective,
}

impl QuestionType {
    /// 客观题走规则匹配，不调用模型
    pub fn is_objective(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::TrueFalse)
    }
}

/// 题目定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// 客观题为标准答案；主观题作为评分细则
    #[serde(default)]
    pub correct_answer: String,
    pub max_points: f64,
    /// 题干文字（提供给 AI 评分）
    #[serde(default)]
    pub content: String,
}

impl QuestionDefinition {
    pub fn new(
        id: impl Into<String>,
        question_type: QuestionType,
        correct_answer: impl Into<String>,
        max_points: f64,
    ) -> Self {
        Self {
            id: id.into(),
            question_type,
            correct_answer: correct_answer.into(),
            max_points,
            content: String::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// 把分数限制在 [0, max_points]，NaN 记为 0
    pub fn clamp_score(&self, score: f64) -> f64 {
        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, self.max_points.max(0.0))
    }
}
