//! 单份提交处理器 - 编排层
//!
//! ## 职责
//!
//! 负责一份答题卡提交从图片到落库的全过程，是提交级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **识别**：上传图片并等待 OCR 结果
//! 2. **归属**：按模板 ROI 还原每道题的作答
//! 3. **评分**：委托 `GradingFlow` 按题目顺序评分
//! 4. **落库**：同一提交串行写入，重复评分直接返回已有结果
//! 5. **成绩发布**：按需写入成绩库

use crate::config::Config;
use crate::error::{AppResult, ConfigError, StoreError};
use crate::infrastructure::{KeyedLocks, MockTaskStore, ScoreStore, SubmissionStore};
use crate::models::{
    GradingInput, GradingResult, GradingSummary, PaperTemplate, ScoreRecordKey, Submission,
};
use crate::services::{attribute, OcrService};
use crate::workflow::GradingFlow;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 单份提交处理器
///
/// 持有所有外部依赖，可在多个 tokio 任务间通过 `Arc` 共享
pub struct SubmissionOrchestrator {
    ocr: OcrService,
    flow: GradingFlow,
    templates: HashMap<String, Arc<PaperTemplate>>,
    submissions: Arc<dyn SubmissionStore>,
    scores: Option<Arc<dyn ScoreStore>>,
    locks: KeyedLocks,
    publish_score: bool,
}

impl SubmissionOrchestrator {
    pub fn new(
        ocr: OcrService,
        flow: GradingFlow,
        templates: HashMap<String, Arc<PaperTemplate>>,
        submissions: Arc<dyn SubmissionStore>,
    ) -> Self {
        Self {
            ocr,
            flow,
            templates,
            submissions,
            scores: None,
            locks: KeyedLocks::new(),
            publish_score: false,
        }
    }

    /// 按配置组装 OCR / AI 评分，模板按作业 ID 索引
    pub fn from_config(
        config: &Config,
        templates: HashMap<String, Arc<PaperTemplate>>,
        submissions: Arc<dyn SubmissionStore>,
    ) -> Result<Self> {
        let ocr = OcrService::from_config(config, Arc::new(MockTaskStore::new()))?;
        let flow = GradingFlow::new(config);

        let mut orchestrator = Self::new(ocr, flow, templates, submissions);
        orchestrator.publish_score = config.publish_score;
        Ok(orchestrator)
    }

    /// 启用成绩发布
    pub fn with_score_store(mut self, scores: Arc<dyn ScoreStore>) -> Self {
        self.scores = Some(scores);
        self.publish_score = true;
        self
    }

    /// 评一份提交
    pub async fn grade_submission(
        &self,
        submission_id: &str,
        input: GradingInput,
    ) -> AppResult<GradingSummary> {
        self.process_submission(submission_id, input, 1).await
    }

    /// 评一份提交，`paper_index` 仅用于日志
    pub async fn process_submission(
        &self,
        submission_id: &str,
        input: GradingInput,
        paper_index: usize,
    ) -> AppResult<GradingSummary> {
        // 同一提交串行执行，不同提交互不影响
        let _guard = self.locks.lock(submission_id).await;

        let submission = self.submissions.get_submission(submission_id).await?;
        if submission.is_done() {
            info!("[答题卡 {}] ♻️ 提交 {} 已评分，直接返回已有结果", paper_index, submission_id);
            return self.stored_summary(submission_id).await;
        }

        let template = self
            .templates
            .get(&submission.assignment_id)
            .cloned()
            .ok_or_else(|| ConfigError::TemplateNotFound(submission.assignment_id.clone()))?;

        log_submission_start(paper_index, &submission, &template);

        let (results, total_score) = match input {
            GradingInput::Page { file_name, image } => {
                let page = self
                    .ocr
                    .fetch_page(&file_name, &image, submission_id)
                    .await
                    .map_err(|e| {
                        error!("[答题卡 {}] ❌ OCR 失败，跳过评分: {}", paper_index, e);
                        e
                    })?;
                info!(
                    "[答题卡 {}] ✓ OCR 完成，共 {} 个文字片段",
                    paper_index,
                    page.spans.len()
                );

                let answers = attribute(&page.spans, &template.rois);
                let grading = self
                    .flow
                    .grade_paper(
                        submission_id,
                        paper_index,
                        &template.questions,
                        &answers,
                        Some(&image),
                    )
                    .await;

                info!(
                    "[答题卡 {}] 题目统计: 规则 {}, AI {}, 未作答 {}, AI 失败 {}",
                    paper_index,
                    grading.stats.rule,
                    grading.stats.ai,
                    grading.stats.unanswered,
                    grading.stats.ai_failed
                );
                (grading.results, grading.total_score)
            }
            GradingInput::Precomputed(results) => clamp_precomputed(&template, results),
        };

        match self
            .submissions
            .save_grading(submission_id, &results, total_score)
            .await
        {
            Ok(_) => {}
            Err(StoreError::PersistenceConflict { .. }) => {
                warn!(
                    "[答题卡 {}] ⚠️ 提交 {} 已有评分结果，改为读取已有结果",
                    paper_index, submission_id
                );
                return self.stored_summary(submission_id).await;
            }
            Err(e) => return Err(e.into()),
        }

        if self.publish_score {
            self.publish(&submission, total_score, paper_index).await;
        }

        info!(
            "[答题卡 {}] ✅ 评分完成: {} / {}",
            paper_index,
            total_score,
            template.max_total()
        );

        Ok(GradingSummary {
            submission_id: submission_id.to_string(),
            total_score,
            results,
            reused: false,
        })
    }

    async fn stored_summary(&self, submission_id: &str) -> AppResult<GradingSummary> {
        let submission = self.submissions.get_submission(submission_id).await?;
        let results = self
            .submissions
            .get_results(submission_id)
            .await?
            .unwrap_or_default();

        Ok(GradingSummary {
            submission_id: submission_id.to_string(),
            total_score: submission.total_score,
            results,
            reused: true,
        })
    }

    /// 写入成绩库；失败只记录日志，评分结果已落库
    async fn publish(&self, submission: &Submission, total_score: f64, paper_index: usize) {
        let Some(scores) = &self.scores else {
            warn!("[答题卡 {}] ⚠️ 未配置成绩库，跳过成绩发布", paper_index);
            return;
        };

        let assignment = match self
            .submissions
            .get_assignment(&submission.assignment_id)
            .await
        {
            Ok(assignment) => assignment,
            Err(e) => {
                error!("[答题卡 {}] 成绩发布失败: {}", paper_index, e);
                return;
            }
        };

        let key = ScoreRecordKey {
            tenant_id: assignment.tenant_id.clone(),
            exam_name: assignment.exam_label(),
            student_id: submission.student_id.clone(),
            subject: assignment.subject.clone(),
        };

        match scores.upsert_score(key, total_score).await {
            Ok(()) => info!(
                "[答题卡 {}] 📤 成绩已发布: {} ({})",
                paper_index,
                assignment.exam_label(),
                submission.student_id
            ),
            Err(e) => error!("[答题卡 {}] 成绩发布失败: {}", paper_index, e),
        }
    }
}

/// 按模板满分截断预先给定的分数；模板中不存在的题目被丢弃
fn clamp_precomputed(
    template: &PaperTemplate,
    results: Vec<GradingResult>,
) -> (Vec<GradingResult>, f64) {
    let mut clamped = Vec::with_capacity(results.len());
    let mut total_score = 0.0;

    for mut result in results {
        let Some(question) = template.question(&result.question_id) else {
            warn!("未知题目 {}，忽略该评分结果", result.question_id);
            continue;
        };
        result.score = question.clamp_score(result.score);
        total_score += result.score;
        clamped.push(result);
    }

    (clamped, total_score)
}

fn log_submission_start(paper_index: usize, submission: &Submission, template: &PaperTemplate) {
    info!("[答题卡 {}] 开始处理", paper_index);
    info!("[答题卡 {}] 提交: {}", paper_index, submission.id);
    info!("[答题卡 {}] 模板: {}", paper_index, template.name);
    info!("[答题卡 {}] 题目总数: {}", paper_index, template.questions.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::clients::MockOcrClient;
    use crate::infrastructure::{InMemoryScoreStore, InMemorySubmissionStore, InstantSleeper};
    use crate::models::{Assignment, QuestionDefinition, QuestionRoi, QuestionType};
    use crate::services::AiGrader;
    use std::time::Duration;

    fn template() -> PaperTemplate {
        let mut template = PaperTemplate::new(
            "a1",
            vec![
                QuestionRoi::new("q1", 0.0, 0.0, 100.0, 50.0),
                QuestionRoi::new("q2", 0.0, 60.0, 100.0, 50.0),
                QuestionRoi::new("q3", 0.0, 140.0, 400.0, 100.0),
            ],
            vec![
                QuestionDefinition::new("q1", QuestionType::SingleChoice, "B", 5.0),
                QuestionDefinition::new("q2", QuestionType::TrueFalse, "对", 2.0),
                QuestionDefinition::new("q3", QuestionType::Subjective, "两直角边平方和等于斜边平方", 10.0),
            ],
        );
        template.name = "勾股定理测验".to_string();
        template
    }

    async fn setup() -> (SubmissionOrchestrator, Arc<InMemorySubmissionStore>) {
        let store = Arc::new(InMemorySubmissionStore::new());
        store.insert_submission(Submission::new("s1", "a1", "stu1")).await;
        store
            .insert_assignment(Assignment {
                id: "a1".to_string(),
                tenant_id: "t1".to_string(),
                title: "第一单元".to_string(),
                subject: "数学".to_string(),
            })
            .await;

        let client = MockOcrClient::new(Arc::new(MockTaskStore::new()), 1);
        let ocr = OcrService::new(
            Arc::new(client),
            Arc::new(InstantSleeper::new()),
            5,
            Duration::from_millis(10),
        );
        let flow = GradingFlow::with_ai_grader(AiGrader::mock(), false);

        let mut templates = HashMap::new();
        templates.insert("a1".to_string(), Arc::new(template()));

        let orchestrator = SubmissionOrchestrator::new(ocr, flow, templates, store.clone());
        (orchestrator, store)
    }

    fn page() -> GradingInput {
        GradingInput::Page {
            file_name: "s1.png".to_string(),
            image: b"\x89PNG fake".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_page_path_grades_and_persists() {
        let (orchestrator, store) = setup().await;

        let summary = orchestrator.grade_submission("s1", page()).await.unwrap();
        assert!(!summary.reused);
        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.total_score, 17.0);

        let stored = store.get_submission("s1").await.unwrap();
        assert!(stored.is_done());
        assert_eq!(stored.total_score, 17.0);
        assert!(stored.graded_at.is_some());
    }

    #[tokio::test]
    async fn test_second_call_reuses_results() {
        let (orchestrator, store) = setup().await;

        let first = orchestrator.grade_submission("s1", page()).await.unwrap();
        let second = orchestrator.grade_submission("s1", page()).await.unwrap();

        assert!(second.reused);
        assert_eq!(first.results, second.results);
        assert_eq!(first.total_score, second.total_score);
        assert_eq!(store.result_set_count("s1").await, 1);
    }

    #[tokio::test]
    async fn test_precomputed_scores_are_clamped() {
        let (orchestrator, _store) = setup().await;
        let results = vec![
            GradingResult {
                question_id: "q1".to_string(),
                student_answer: "B".to_string(),
                score: 50.0,
                feedback: "manual".to_string(),
            },
            GradingResult {
                question_id: "q3".to_string(),
                student_answer: "...".to_string(),
                score: -3.0,
                feedback: "manual".to_string(),
            },
            GradingResult {
                question_id: "q99".to_string(),
                student_answer: "?".to_string(),
                score: 4.0,
                feedback: "manual".to_string(),
            },
        ];

        let summary = orchestrator
            .grade_submission("s1", GradingInput::Precomputed(results))
            .await
            .unwrap();

        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.results[0].score, 5.0);
        assert_eq!(summary.results[1].score, 0.0);
        assert_eq!(summary.total_score, 5.0);
    }

    #[tokio::test]
    async fn test_missing_template_is_config_error() {
        let (orchestrator, store) = setup().await;
        store.insert_submission(Submission::new("s2", "unknown", "stu2")).await;

        let err = orchestrator.grade_submission("s2", page()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::TemplateNotFound(_))));
    }

    #[tokio::test]
    async fn test_score_publication() {
        let (orchestrator, _store) = setup().await;
        let scores = Arc::new(InMemoryScoreStore::new());
        let orchestrator = orchestrator.with_score_store(scores.clone());

        orchestrator.grade_submission("s1", page()).await.unwrap();

        let key = ScoreRecordKey {
            tenant_id: "t1".to_string(),
            exam_name: "第一单元 作业成绩".to_string(),
            student_id: "stu1".to_string(),
            subject: "数学".to_string(),
        };
        assert_eq!(scores.get(&key).await, Some(17.0));
    }
}
