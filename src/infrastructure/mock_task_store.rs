//! Mock 识别任务表 - 基础设施层
//!
//! 离线模式下记录每个 mock 任务的状态，由调用方注入，
//! 生命周期跟随进程或单个测试

use crate::models::{OcrPage, OcrSpan, OcrTaskStatus, PageSize};
use std::collections::HashMap;
use std::sync::Mutex;

/// 单个 mock 任务
#[derive(Debug, Clone)]
pub struct MockTaskRecord {
    pub file_name: String,
    pub status: OcrTaskStatus,
    pub polls: usize,
    pub page: OcrPage,
}

/// Mock 任务表
#[derive(Debug, Default)]
pub struct MockTaskStore {
    tasks: Mutex<HashMap<String, MockTaskRecord>>,
}

impl MockTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个新任务，初始为排队状态
    pub fn insert(&self, task_id: impl Into<String>, file_name: impl Into<String>, page: OcrPage) {
        let record = MockTaskRecord {
            file_name: file_name.into(),
            status: OcrTaskStatus::Queued,
            polls: 0,
            page,
        };
        self.lock().insert(task_id.into(), record);
    }

    /// 轮询一次：计数加一，达到 `polls_to_complete` 后进入完成态
    pub fn poll(&self, task_id: &str, polls_to_complete: usize) -> Option<OcrTaskStatus> {
        let mut tasks = self.lock();
        let record = tasks.get_mut(task_id)?;
        record.polls += 1;
        let next = if record.polls >= polls_to_complete {
            OcrTaskStatus::Done
        } else {
            OcrTaskStatus::Processing
        };
        record.status = record.status.advance(next);
        Some(record.status)
    }

    /// 强制把任务置为失败（测试用）
    pub fn fail(&self, task_id: &str) -> bool {
        match self.lock().get_mut(task_id) {
            Some(record) => {
                record.status = record.status.advance(OcrTaskStatus::Error);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, task_id: &str) -> Option<MockTaskRecord> {
        self.lock().get(task_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MockTaskRecord>> {
        self.tasks.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// 离线模式返回的固定识别结果
///
/// 与 `templates/sample.toml` 的作答区域对应：q1 选择题、q2 判断题、q3 主观题（两行）
pub fn fixture_page() -> OcrPage {
    OcrPage {
        spans: vec![
            OcrSpan::new("B", [40.0, 20.0, 60.0, 40.0]),
            OcrSpan::new("对", [40.0, 80.0, 60.0, 100.0]),
            OcrSpan::new("直角三角形两直角边的平方和", [20.0, 150.0, 380.0, 180.0]),
            OcrSpan::new("等于斜边的平方", [20.0, 190.0, 220.0, 220.0]),
        ],
        page_size: PageSize {
            width: 595.0,
            height: 842.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_completes_after_configured_polls() {
        let store = MockTaskStore::new();
        store.insert("t1", "page.png", fixture_page());

        assert_eq!(store.poll("t1", 3), Some(OcrTaskStatus::Processing));
        assert_eq!(store.poll("t1", 3), Some(OcrTaskStatus::Processing));
        assert_eq!(store.poll("t1", 3), Some(OcrTaskStatus::Done));
        assert_eq!(store.poll("t1", 3), Some(OcrTaskStatus::Done));
        assert_eq!(store.poll("missing", 1), None);
    }

    #[test]
    fn test_failed_task_stays_failed() {
        let store = MockTaskStore::new();
        store.insert("t1", "page.png", fixture_page());
        assert!(store.fail("t1"));
        assert_eq!(store.poll("t1", 1), Some(OcrTaskStatus::Error));
        assert!(!store.fail("missing"));
    }

    #[test]
    fn test_fresh_stores_are_isolated() {
        let a = MockTaskStore::new();
        let b = MockTaskStore::new();
        a.insert("t1", "page.png", fixture_page());
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
