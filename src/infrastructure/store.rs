//! 外部存储契约 - 基础设施层
//!
//! 提交 / 评分结果存储和成绩库都是外部协作方，这里只定义契约，
//! 并提供内存实现供测试和嵌入使用

use crate::error::StoreError;
use crate::models::{Assignment, GradingResult, ScoreRecordKey, Submission, SubmissionStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 提交与评分结果存储
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn get_submission(&self, submission_id: &str) -> Result<Submission, StoreError>;

    async fn get_assignment(&self, assignment_id: &str) -> Result<Assignment, StoreError>;

    /// 已保存的评分结果；尚未评分时返回 `None`
    async fn get_results(&self, submission_id: &str) -> Result<Option<Vec<GradingResult>>, StoreError>;

    /// 原子地写入全部评分结果、总分，并把提交置为完成
    ///
    /// 同一提交已有结果时返回 `PersistenceConflict`
    async fn save_grading(
        &self,
        submission_id: &str,
        results: &[GradingResult],
        total_score: f64,
    ) -> Result<Submission, StoreError>;
}

/// 成绩库（按自然键 upsert）
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn upsert_score(&self, key: ScoreRecordKey, value: f64) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct SubmissionTables {
    submissions: HashMap<String, Submission>,
    assignments: HashMap<String, Assignment>,
    results: HashMap<String, Vec<GradingResult>>,
}

/// 内存版提交存储
#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    tables: RwLock<SubmissionTables>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_submission(&self, submission: Submission) {
        self.tables
            .write()
            .await
            .submissions
            .insert(submission.id.clone(), submission);
    }

    pub async fn insert_assignment(&self, assignment: Assignment) {
        self.tables
            .write()
            .await
            .assignments
            .insert(assignment.id.clone(), assignment);
    }

    /// 某提交保存过几组评分结果（0 或 1）
    pub async fn result_set_count(&self, submission_id: &str) -> usize {
        usize::from(self.tables.read().await.results.contains_key(submission_id))
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn get_submission(&self, submission_id: &str) -> Result<Submission, StoreError> {
        self.tables
            .read()
            .await
            .submissions
            .get(submission_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "提交",
                id: submission_id.to_string(),
            })
    }

    async fn get_assignment(&self, assignment_id: &str) -> Result<Assignment, StoreError> {
        self.tables
            .read()
            .await
            .assignments
            .get(assignment_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "作业",
                id: assignment_id.to_string(),
            })
    }

    async fn get_results(&self, submission_id: &str) -> Result<Option<Vec<GradingResult>>, StoreError> {
        Ok(self.tables.read().await.results.get(submission_id).cloned())
    }

    async fn save_grading(
        &self,
        submission_id: &str,
        results: &[GradingResult],
        total_score: f64,
    ) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.results.contains_key(submission_id) {
            return Err(StoreError::PersistenceConflict {
                submission_id: submission_id.to_string(),
            });
        }

        let submission = tables
            .submissions
            .get_mut(submission_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "提交",
                id: submission_id.to_string(),
            })?;
        if submission.status == SubmissionStatus::Done {
            return Err(StoreError::PersistenceConflict {
                submission_id: submission_id.to_string(),
            });
        }

        submission.status = SubmissionStatus::Done;
        submission.total_score = total_score;
        submission.answers = Some(results.to_vec());
        submission.graded_at = Some(Utc::now());
        let updated = submission.clone();

        tables
            .results
            .insert(submission_id.to_string(), results.to_vec());

        Ok(updated)
    }
}

/// 内存版成绩库
#[derive(Debug, Default)]
pub struct InMemoryScoreStore {
    records: RwLock<HashMap<ScoreRecordKey, f64>>,
}

impl InMemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &ScoreRecordKey) -> Option<f64> {
        self.records.read().await.get(key).copied()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ScoreStore for InMemoryScoreStore {
    async fn upsert_score(&self, key: ScoreRecordKey, value: f64) -> Result<(), StoreError> {
        self.records.write().await.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, score: f64) -> GradingResult {
        GradingResult {
            question_id: id.to_string(),
            student_answer: "B".to_string(),
            score,
            feedback: "correct".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_grading_marks_done() {
        let store = InMemorySubmissionStore::new();
        store.insert_submission(Submission::new("s1", "a1", "stu1")).await;

        let saved = store
            .save_grading("s1", &[result("q1", 5.0)], 5.0)
            .await
            .unwrap();
        assert!(saved.is_done());
        assert_eq!(saved.total_score, 5.0);
        assert!(saved.graded_at.is_some());
        assert_eq!(store.get_results("s1").await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_save_is_conflict() {
        let store = InMemorySubmissionStore::new();
        store.insert_submission(Submission::new("s1", "a1", "stu1")).await;
        store.save_grading("s1", &[result("q1", 5.0)], 5.0).await.unwrap();

        let err = store
            .save_grading("s1", &[result("q1", 0.0)], 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PersistenceConflict { .. }));
        assert_eq!(store.result_set_count("s1").await, 1);
        assert_eq!(store.get_submission("s1").await.unwrap().total_score, 5.0);
    }

    #[tokio::test]
    async fn test_unknown_submission_not_found() {
        let store = InMemorySubmissionStore::new();
        let err = store.save_grading("nope", &[], 0.0).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_score_upsert_overwrites_by_key() {
        let store = InMemoryScoreStore::new();
        let key = ScoreRecordKey {
            tenant_id: "t1".to_string(),
            exam_name: "周测 作业成绩".to_string(),
            student_id: "stu1".to_string(),
            subject: "数学".to_string(),
        };
        store.upsert_score(key.clone(), 80.0).await.unwrap();
        store.upsert_score(key.clone(), 85.0).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&key).await, Some(85.0));
    }
}
