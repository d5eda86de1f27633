//! 题目评分流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整评分流程
//!
//! 流程顺序：
//! 1. 未作答 → 0 分（不调用模型）
//! 2. 客观题 → 规则匹配
//! 3. 主观题 → AI 评分（vision → text），全部失败记 0 分

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AdapterError, GradingTier};
use crate::models::{AttributedAnswers, GradingResult, QuestionDefinition};
use crate::services::{grade_objective, AiGrader};
use crate::utils::logging::truncate_text;
use crate::workflow::question_ctx::QuestionCtx;

pub const FEEDBACK_UNANSWERED: &str = "unanswered";

/// 题目评分方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeMethod {
    /// 未作答
    Unanswered,
    /// 规则匹配
    Rule,
    /// 某一层 AI 评分成功
    Ai(GradingTier),
    /// AI 评分全部失败，记 0 分
    AiFailed,
}

/// 单份答题卡的评分统计
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PaperStats {
    pub rule: usize,
    pub ai: usize,
    pub unanswered: usize,
    pub ai_failed: usize,
}

impl PaperStats {
    fn record(&mut self, method: GradeMethod) {
        match method {
            GradeMethod::Unanswered => self.unanswered += 1,
            GradeMethod::Rule => self.rule += 1,
            GradeMethod::Ai(_) => self.ai += 1,
            GradeMethod::AiFailed => self.ai_failed += 1,
        }
    }
}

/// 单份答题卡的评分结果
#[derive(Debug, Clone, PartialEq)]
pub struct PaperGrading {
    pub results: Vec<GradingResult>,
    pub total_score: f64,
    pub stats: PaperStats,
}

/// 题目评分流程
///
/// - 决定每道题用哪种方式评分
/// - 单题失败不影响其他题
/// - 不持有任何存储资源
pub struct GradingFlow {
    ai_grader: AiGrader,
    verbose_logging: bool,
}

impl GradingFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            ai_grader: AiGrader::from_config(config),
            verbose_logging: config.verbose_logging,
        }
    }

    pub fn with_ai_grader(ai_grader: AiGrader, verbose_logging: bool) -> Self {
        Self {
            ai_grader,
            verbose_logging,
        }
    }

    /// 评一道题，结果分数保证在 [0, max_points]
    pub async fn grade_question(
        &self,
        question: &QuestionDefinition,
        answer: &str,
        page_image: Option<&[u8]>,
        ctx: &QuestionCtx,
    ) -> (GradingResult, GradeMethod) {
        if self.verbose_logging {
            info!("[答题卡 {}] {} 作答: {}", ctx.paper_index, ctx, truncate_text(answer, 40));
        }

        if answer.trim().is_empty() {
            return (
                GradingResult {
                    question_id: question.id.clone(),
                    student_answer: String::new(),
                    score: 0.0,
                    feedback: FEEDBACK_UNANSWERED.to_string(),
                },
                GradeMethod::Unanswered,
            );
        }

        if question.question_type.is_objective() {
            return (grade_objective(question, answer), GradeMethod::Rule);
        }

        match self.ai_grader.grade(question, answer, page_image).await {
            Ok(verdict) => (
                GradingResult {
                    question_id: question.id.clone(),
                    student_answer: if verdict.student_answer.is_empty() {
                        answer.to_string()
                    } else {
                        verdict.student_answer
                    },
                    score: question.clamp_score(verdict.score),
                    feedback: verdict.feedback,
                },
                GradeMethod::Ai(verdict.tier),
            ),
            Err(e) => {
                let AdapterError::AdapterFailed { reason, .. } = e;
                warn!("[答题卡 {}] {} AI 评分失败，记 0 分: {}", ctx.paper_index, ctx, reason);
                (
                    GradingResult {
                        question_id: question.id.clone(),
                        student_answer: answer.to_string(),
                        score: 0.0,
                        feedback: format!("AI grading failed: {}", reason),
                    },
                    GradeMethod::AiFailed,
                )
            }
        }
    }

    /// 按题目定义顺序评完整张答题卡
    pub async fn grade_paper(
        &self,
        submission_id: &str,
        paper_index: usize,
        questions: &[QuestionDefinition],
        answers: &AttributedAnswers,
        page_image: Option<&[u8]>,
    ) -> PaperGrading {
        let mut results = Vec::with_capacity(questions.len());
        let mut stats = PaperStats::default();
        let mut total_score = 0.0;

        for (index, question) in questions.iter().enumerate() {
            let ctx = QuestionCtx::new(
                submission_id.to_string(),
                paper_index,
                index + 1,
                question.id.clone(),
            );
            let answer = answers.get(&question.id).map(String::as_str).unwrap_or("");

            let (result, method) = self
                .grade_question(question, answer, page_image, &ctx)
                .await;

            stats.record(method);
            total_score += result.score;
            results.push(result);
        }

        PaperGrading {
            results,
            total_score,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ChatModel, ChatRequest};
    use crate::config::AiMode;
    use crate::models::QuestionType;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FailingChat;

    #[async_trait]
    impl ChatModel for FailingChat {
        async fn complete(&self, _request: &ChatRequest) -> anyhow::Result<String> {
            anyhow::bail!("provider outage")
        }
    }

    struct GreedyChat;

    #[async_trait]
    impl ChatModel for GreedyChat {
        async fn complete(&self, _request: &ChatRequest) -> anyhow::Result<String> {
            Ok(r#"{"studentAnswer": "", "score": 999, "feedback": "perfect"}"#.to_string())
        }
    }

    fn questions() -> Vec<QuestionDefinition> {
        vec![
            QuestionDefinition::new("q1", QuestionType::SingleChoice, "B", 5.0),
            QuestionDefinition::new("q2", QuestionType::TrueFalse, "对", 2.0),
            QuestionDefinition::new("q3", QuestionType::Subjective, "勾股定理", 10.0),
        ]
    }

    fn answers(pairs: &[(&str, &str)]) -> AttributedAnswers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn real_flow(chat: Arc<dyn ChatModel>) -> GradingFlow {
        let config = Config {
            ai_mode: AiMode::Real,
            ..Config::default()
        };
        GradingFlow::with_ai_grader(AiGrader::with_chat_model(&config, chat), false)
    }

    #[tokio::test]
    async fn test_mock_paper_total() {
        let flow = GradingFlow::with_ai_grader(AiGrader::mock(), false);
        let grading = flow
            .grade_paper(
                "s1",
                1,
                &questions(),
                &answers(&[("q1", "b"), ("q2", "错"), ("q3", "两直角边平方和等于斜边平方")]),
                None,
            )
            .await;

        assert_eq!(grading.results.len(), 3);
        assert_eq!(grading.results[0].score, 5.0);
        assert_eq!(grading.results[1].score, 0.0);
        assert_eq!(grading.results[1].feedback, "对");
        assert_eq!(grading.results[2].score, 10.0);
        assert_eq!(grading.total_score, 15.0);
        assert_eq!(grading.stats.rule, 2);
        assert_eq!(grading.stats.ai, 1);
    }

    #[tokio::test]
    async fn test_unanswered_never_calls_model() {
        let flow = real_flow(Arc::new(FailingChat));
        let grading = flow
            .grade_paper("s1", 1, &questions(), &answers(&[("q1", "B")]), None)
            .await;

        assert_eq!(grading.results[2].score, 0.0);
        assert_eq!(grading.results[2].feedback, FEEDBACK_UNANSWERED);
        assert_eq!(grading.stats.unanswered, 2);
        assert_eq!(grading.stats.ai_failed, 0);
    }

    #[tokio::test]
    async fn test_ai_failure_is_isolated() {
        let flow = real_flow(Arc::new(FailingChat));
        let grading = flow
            .grade_paper(
                "s1",
                1,
                &questions(),
                &answers(&[("q1", "B"), ("q2", "对"), ("q3", "some text")]),
                Some(b"img"),
            )
            .await;

        assert_eq!(grading.results[0].score, 5.0);
        assert_eq!(grading.results[1].score, 2.0);
        assert_eq!(grading.results[2].score, 0.0);
        assert!(grading.results[2].feedback.starts_with("AI grading failed: "));
        assert!(grading.results[2].feedback.contains("provider outage"));
        assert_eq!(grading.total_score, 7.0);
        assert_eq!(grading.stats.ai_failed, 1);
    }

    #[tokio::test]
    async fn test_overflowing_ai_score_is_clamped() {
        let flow = real_flow(Arc::new(GreedyChat));
        let grading = flow
            .grade_paper("s1", 1, &questions(), &answers(&[("q3", "text")]), None)
            .await;

        assert_eq!(grading.results[2].score, 10.0);
        assert_eq!(grading.results[2].student_answer, "text");
        for (result, question) in grading.results.iter().zip(questions()) {
            assert!(result.score >= 0.0 && result.score <= question.max_points);
        }
    }
}
