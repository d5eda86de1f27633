//! 文档识别相关的数据结构
//!
//! - `OcrSpan` / `OcrPage`：识别结果
//! - `OcrTask`：识别任务，mock 与真实任务用枚举显式区分

use serde::{Deserialize, Serialize};

/// 一段识别出的文字及其包围盒 `[x_min, y_min, x_max, y_max]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSpan {
    pub content: String,
    pub bbox: [f64; 4],
}

impl OcrSpan {
    pub fn new(content: impl Into<String>, bbox: [f64; 4]) -> Self {
        Self {
            content: content.into(),
            bbox,
        }
    }

    pub fn x_min(&self) -> f64 {
        self.bbox[0]
    }

    pub fn y_min(&self) -> f64 {
        self.bbox[1]
    }

    /// 包围盒中心点
    pub fn center(&self) -> (f64, f64) {
        (
            (self.bbox[0] + self.bbox[2]) / 2.0,
            (self.bbox[1] + self.bbox[3]) / 2.0,
        )
    }
}

/// 页面尺寸
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// 单页识别结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcrPage {
    pub spans: Vec<OcrSpan>,
    pub page_size: PageSize,
}

/// 任务状态
///
/// `Queued → Processing → {Done | Error}`，终态不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrTaskStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl OcrTaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OcrTaskStatus::Done | OcrTaskStatus::Error)
    }

    /// 进度估计，仅用于展示
    pub fn progress(&self) -> u8 {
        match self {
            OcrTaskStatus::Queued => 0,
            OcrTaskStatus::Processing => 50,
            OcrTaskStatus::Done | OcrTaskStatus::Error => 100,
        }
    }

    /// 状态迁移；已处于终态时保持不变
    pub fn advance(self, next: OcrTaskStatus) -> OcrTaskStatus {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }
}

/// 一次轮询观察到的任务状态
#[derive(Debug, Clone, PartialEq)]
pub struct OcrTaskState {
    pub status: OcrTaskStatus,
    pub full_result_url: Option<String>,
    pub error: Option<String>,
}

impl OcrTaskState {
    pub fn processing() -> Self {
        Self {
            status: OcrTaskStatus::Processing,
            full_result_url: None,
            error: None,
        }
    }

    pub fn progress(&self) -> u8 {
        self.status.progress()
    }
}

/// 任务公共字段
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub id: String,
    pub status: OcrTaskStatus,
    pub full_result_url: Option<String>,
    pub error: Option<String>,
}

impl TaskInfo {
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: OcrTaskStatus::Queued,
            full_result_url: None,
            error: None,
        }
    }

    fn apply(&mut self, state: OcrTaskState) {
        if self.status.is_terminal() {
            return;
        }
        self.status = self.status.advance(state.status);
        if state.full_result_url.is_some() {
            self.full_result_url = state.full_result_url;
        }
        if state.error.is_some() {
            self.error = state.error;
        }
    }
}

/// 识别任务
#[derive(Debug, Clone, PartialEq)]
pub enum OcrTask {
    /// 离线 mock 任务，`id` 为 mock 任务表中的键
    Mock(TaskInfo),
    /// 远程任务，`id` 为服务端 batch_id
    Real(TaskInfo),
}

impl OcrTask {
    pub fn info(&self) -> &TaskInfo {
        match self {
            OcrTask::Mock(info) | OcrTask::Real(info) => info,
        }
    }

    fn info_mut(&mut self) -> &mut TaskInfo {
        match self {
            OcrTask::Mock(info) | OcrTask::Real(info) => info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn status(&self) -> OcrTaskStatus {
        self.info().status
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, OcrTask::Mock(_))
    }

    /// 提交确认后进入处理中
    pub fn mark_submitted(&mut self) {
        let info = self.info_mut();
        info.status = info.status.advance(OcrTaskStatus::Processing);
    }

    /// 合并一次轮询结果
    pub fn apply(&mut self, state: OcrTaskState) {
        self.info_mut().apply(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_center() {
        let span = OcrSpan::new("B", [10.0, 10.0, 30.0, 30.0]);
        assert_eq!(span.center(), (20.0, 20.0));
    }

    #[test]
    fn test_terminal_states_never_revert() {
        let mut task = OcrTask::Real(TaskInfo::queued("batch-1"));
        task.mark_submitted();
        assert_eq!(task.status(), OcrTaskStatus::Processing);

        task.apply(OcrTaskState {
            status: OcrTaskStatus::Done,
            full_result_url: Some("https://cdn/result.json".to_string()),
            error: None,
        });
        assert_eq!(task.status(), OcrTaskStatus::Done);

        task.apply(OcrTaskState::processing());
        task.mark_submitted();
        assert_eq!(task.status(), OcrTaskStatus::Done);
        assert_eq!(
            task.info().full_result_url.as_deref(),
            Some("https://cdn/result.json")
        );
    }

    #[test]
    fn test_progress_estimates() {
        assert_eq!(OcrTaskStatus::Queued.progress(), 0);
        assert_eq!(OcrTaskState::processing().progress(), 50);
        assert_eq!(OcrTaskStatus::Error.progress(), 100);
    }
}
