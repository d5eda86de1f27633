use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 题目 ID → 还原后的作答文本（可能为空，表示未作答）
pub type AttributedAnswers = BTreeMap<String, String>;

/// 单题评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub question_id: String,
    pub student_answer: String,
    pub score: f64,
    pub feedback: String,
}

/// 提交状态，只会 `Processing → Done` 一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Processing,
    Done,
}

/// 一份答题卡提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub status: SubmissionStatus,
    pub total_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<GradingResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new(
        id: impl Into<String>,
        assignment_id: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            assignment_id: assignment_id.into(),
            student_id: student_id.into(),
            status: SubmissionStatus::Processing,
            total_score: 0.0,
            answers: None,
            graded_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == SubmissionStatus::Done
    }
}

/// 作业信息（来自外部存储，用于成绩发布）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub subject: String,
}

impl Assignment {
    /// 成绩库中使用的考试名称
    pub fn exam_label(&self) -> String {
        format!("{} 作业成绩", self.title)
    }
}

/// 成绩库自然键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecordKey {
    pub tenant_id: String,
    pub exam_name: String,
    pub student_id: String,
    pub subject: String,
}

/// 评分入口参数
#[derive(Debug, Clone)]
pub enum GradingInput {
    /// 答题卡图片，走 OCR → 归属 → 评分
    Page { file_name: String, image: Vec<u8> },
    /// 预先给定的评分结果（例如人工录入），直接落库
    Precomputed(Vec<GradingResult>),
}

/// 一次评分的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct GradingSummary {
    pub submission_id: String,
    pub total_score: f64,
    pub results: Vec<GradingResult>,
    /// 结果是否来自已有记录（重复评分时为 true）
    pub reused: bool,
}
