//! 题目评分上下文
//!
//! 封装"我正在评哪份提交的第几题"这一信息

use std::fmt::Display;

/// 题目评分上下文
#[derive(Debug, Clone)]
pub struct QuestionCtx {
    /// 提交ID
    pub submission_id: String,

    /// 答题卡索引（仅用于日志显示）
    pub paper_index: usize,

    /// 题目在试卷中的索引（从1开始）
    pub question_index: usize,

    /// 题目ID
    pub question_id: String,
}

impl QuestionCtx {
    pub fn new(
        submission_id: String,
        paper_index: usize,
        question_index: usize,
        question_id: String,
    ) -> Self {
        Self {
            submission_id,
            paper_index,
            question_index,
            question_id,
        }
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[提交 #{} 题目#{} ({})]",
            self.submission_id, self.question_index, self.question_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = QuestionCtx::new("s1".to_string(), 1, 3, "q3".to_string());
        assert_eq!(ctx.to_string(), "[提交 #s1 题目#3 (q3)]");
    }
}
