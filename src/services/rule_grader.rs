//! 客观题规则评分 - 业务能力层
//!
//! 单选 / 判断题按标准答案精确匹配，不调用任何模型

use crate::models::{GradingResult, QuestionDefinition};

pub const FEEDBACK_CORRECT: &str = "correct";

/// 规范化作答：去首尾空白、转小写
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

pub fn answers_match(answer: &str, correct: &str) -> bool {
    normalize_answer(answer) == normalize_answer(correct)
}

/// 客观题评分：相等得满分，否则 0 分，反馈为标准答案
pub fn grade_objective(question: &QuestionDefinition, answer: &str) -> GradingResult {
    let correct = answers_match(answer, &question.correct_answer);

    GradingResult {
        question_id: question.id.clone(),
        student_answer: answer.to_string(),
        score: if correct {
            question.clamp_score(question.max_points)
        } else {
            0.0
        },
        feedback: if correct {
            FEEDBACK_CORRECT.to_string()
        } else {
            question.correct_answer.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionType;

    fn choice() -> QuestionDefinition {
        QuestionDefinition::new("q1", QuestionType::SingleChoice, "B", 5.0)
    }

    #[test]
    fn test_case_insensitive_match() {
        let result = grade_objective(&choice(), "b");
        assert_eq!(result.score, 5.0);
        assert_eq!(result.feedback, FEEDBACK_CORRECT);
        assert_eq!(result.student_answer, "b");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(grade_objective(&choice(), " b ").score, 5.0);
        assert_eq!(grade_objective(&choice(), "\tB\n").score, 5.0);
    }

    #[test]
    fn test_wrong_answer_reports_correct_literal() {
        let result = grade_objective(&choice(), "C");
        assert_eq!(result.score, 0.0);
        assert_eq!(result.feedback, "B");
    }

    #[test]
    fn test_true_false_requires_same_literal() {
        let question = QuestionDefinition::new("q2", QuestionType::TrueFalse, "对", 2.0);
        assert_eq!(grade_objective(&question, " 对 ").score, 2.0);
        assert_eq!(grade_objective(&question, "T").score, 0.0);
        assert_eq!(grade_objective(&question, "√").score, 0.0);
        assert_eq!(grade_objective(&question, "T").feedback, "对");

        let question = QuestionDefinition::new("q3", QuestionType::TrueFalse, "True", 2.0);
        assert_eq!(grade_objective(&question, "true").score, 2.0);
        assert_eq!(grade_objective(&question, "T").score, 0.0);
    }

    #[test]
    fn test_zero_point_question() {
        let question = QuestionDefinition::new("q3", QuestionType::SingleChoice, "A", 0.0);
        let result = grade_objective(&question, "A");
        assert_eq!(result.score, 0.0);
        assert_eq!(result.feedback, FEEDBACK_CORRECT);
    }
}
