//! 批量答题卡处理器 - 编排层
//!
//! ## 职责
//!
//! 负责一批答题卡的并发评分和全局统计。
//!
//! ## 核心功能
//!
//! 1. **并发控制**：使用 Semaphore 限制同时评分的答题卡数量
//! 2. **分批处理**：将答题卡分批次处理，每批完成后再开始下一批
//! 3. **故障隔离**：单份答题卡失败只记录为 `PaperOutcome::Failed`
//! 4. **全局统计**：汇总所有答题卡的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单份答题卡的细节
//! - **向下委托**：委托 `SubmissionOrchestrator` 处理单份提交

use crate::config::Config;
use crate::models::{GradingInput, GradingSummary};
use crate::orchestrator::submission_processor::SubmissionOrchestrator;
use crate::utils::logging::RunLog;
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, warn};

/// 一份待评分的答题卡
#[derive(Debug, Clone)]
pub struct PaperJob {
    pub submission_id: String,
    pub input: GradingInput,
}

impl PaperJob {
    pub fn page(
        submission_id: impl Into<String>,
        file_name: impl Into<String>,
        image: Vec<u8>,
    ) -> Self {
        Self {
            submission_id: submission_id.into(),
            input: GradingInput::Page {
                file_name: file_name.into(),
                image,
            },
        }
    }
}

/// 单份答题卡的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum PaperOutcome {
    Graded(GradingSummary),
    Failed { reason: String },
}

impl PaperOutcome {
    pub fn is_graded(&self) -> bool {
        matches!(self, PaperOutcome::Graded(_))
    }
}

/// 批量处理统计，`outcomes` 与输入顺序一致
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    pub outcomes: Vec<(String, PaperOutcome)>,
}

impl BatchSummary {
    pub fn outcome(&self, submission_id: &str) -> Option<&PaperOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == submission_id)
            .map(|(_, outcome)| outcome)
    }
}

/// 批量答题卡处理器
pub struct BatchProcessor {
    orchestrator: Arc<SubmissionOrchestrator>,
    max_concurrent_papers: usize,
    run_log: RunLog,
}

impl BatchProcessor {
    pub fn new(orchestrator: Arc<SubmissionOrchestrator>, config: &Config) -> Self {
        Self {
            orchestrator,
            max_concurrent_papers: config.max_concurrent_papers.max(1),
            run_log: RunLog::disabled(),
        }
    }

    /// 创建 `output_log_file` 并输出启动信息，之后的批次统计会写入该文件
    pub fn initialize(orchestrator: Arc<SubmissionOrchestrator>, config: &Config) -> Result<Self> {
        let run_log = RunLog::create(&config.output_log_file)?;
        run_log.startup(config.max_concurrent_papers);
        Ok(Self {
            run_log,
            ..Self::new(orchestrator, config)
        })
    }

    /// 评完所有答题卡
    pub async fn grade_all(&self, jobs: Vec<PaperJob>) -> BatchSummary {
        let total_papers = jobs.len();
        let mut summary = BatchSummary {
            total: total_papers,
            ..Default::default()
        };

        if jobs.is_empty() {
            warn!("⚠️ 没有待评分的答题卡");
            return summary;
        }

        self.run_log
            .papers_loaded(total_papers, self.max_concurrent_papers);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_papers));
        let total_batches = total_papers.div_ceil(self.max_concurrent_papers);

        for (batch_idx, batch_jobs) in jobs.chunks(self.max_concurrent_papers).enumerate() {
            let batch_num = batch_idx + 1;
            let batch_start = batch_idx * self.max_concurrent_papers;

            self.run_log.batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch_jobs.len(),
                total_papers,
            );

            let outcomes = self
                .process_batch(batch_jobs, batch_start, semaphore.clone())
                .await;

            let batch_success = outcomes.iter().filter(|(_, o)| o.is_graded()).count();
            self.run_log
                .batch_complete(batch_num, batch_success, outcomes.len());
            for (submission_id, outcome) in &outcomes {
                if let PaperOutcome::Failed { reason } = outcome {
                    self.run_log.paper_failed(submission_id, reason);
                }
            }

            summary.succeeded += batch_success;
            summary.failed += outcomes.len() - batch_success;
            summary.outcomes.extend(outcomes);
        }

        self.run_log
            .final_stats(summary.succeeded, summary.failed, summary.total);

        summary
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch_jobs: &[PaperJob],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Vec<(String, PaperOutcome)> {
        let mut batch_handles = Vec::with_capacity(batch_jobs.len());

        for (idx, job) in batch_jobs.iter().enumerate() {
            let paper_index = batch_start + idx + 1;
            let semaphore = semaphore.clone();
            let orchestrator = self.orchestrator.clone();
            let submission_id = job.submission_id.clone();
            let job = job.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return PaperOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };

                match orchestrator
                    .process_submission(&job.submission_id, job.input, paper_index)
                    .await
                {
                    Ok(summary) => PaperOutcome::Graded(summary),
                    Err(e) => {
                        error!("[答题卡 {}] ❌ 处理过程中发生错误: {}", paper_index, e);
                        PaperOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            });
            batch_handles.push((submission_id, paper_index, handle));
        }

        // 等待本批所有任务完成
        join_all(
            batch_handles
                .into_iter()
                .map(|(submission_id, paper_index, handle)| async move {
                    let outcome = match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("[答题卡 {}] 任务执行失败: {}", paper_index, e);
                            PaperOutcome::Failed {
                                reason: e.to_string(),
                            }
                        }
                    };
                    (submission_id, outcome)
                }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemorySubmissionStore;
    use crate::models::{PaperTemplate, QuestionDefinition, QuestionRoi, QuestionType, Submission};
    use std::collections::HashMap;

    async fn processor(max_concurrent_papers: usize) -> BatchProcessor {
        let store = Arc::new(InMemorySubmissionStore::new());
        for id in ["s1", "s2", "s3"] {
            store.insert_submission(Submission::new(id, "a1", id)).await;
        }

        let template = PaperTemplate::new(
            "a1",
            vec![QuestionRoi::new("q1", 0.0, 0.0, 100.0, 50.0)],
            vec![QuestionDefinition::new("q1", QuestionType::SingleChoice, "B", 5.0)],
        );
        let mut templates = HashMap::new();
        templates.insert("a1".to_string(), Arc::new(template));

        let config = Config {
            max_concurrent_papers,
            ocr_poll_interval_ms: 1,
            ..Config::default()
        };
        let orchestrator = SubmissionOrchestrator::from_config(&config, templates, store).unwrap();
        BatchProcessor::new(Arc::new(orchestrator), &config)
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let summary = processor(2).await.grade_all(Vec::new()).await;
        assert_eq!(summary.total, 0);
        assert!(summary.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_submission_fails_alone() {
        let jobs = vec![
            PaperJob::page("s1", "s1.png", b"img".to_vec()),
            PaperJob::page("missing", "x.png", b"img".to_vec()),
            PaperJob::page("s2", "s2.png", b"img".to_vec()),
            PaperJob::page("s3", "s3.png", b"img".to_vec()),
        ];

        let summary = processor(2).await.grade_all(jobs).await;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        let ids: Vec<_> = summary.outcomes.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "missing", "s2", "s3"]);
        assert!(matches!(
            summary.outcome("missing"),
            Some(PaperOutcome::Failed { .. })
        ));
        match summary.outcome("s1") {
            Some(PaperOutcome::Graded(graded)) => assert_eq!(graded.total_score, 5.0),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
