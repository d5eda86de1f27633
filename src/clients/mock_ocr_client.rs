//! 离线文档识别客户端
//!
//! 不访问网络，任务登记在注入的 `MockTaskStore` 中，结果为固定样例

use crate::clients::ocr_client::DocumentIntelligence;
use crate::error::OcrError;
use crate::infrastructure::{fixture_page, MockTaskStore};
use crate::models::{OcrPage, OcrTask, OcrTaskState, OcrTaskStatus, TaskInfo};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct MockOcrClient {
    store: Arc<MockTaskStore>,
    polls_to_complete: usize,
    page: OcrPage,
}

impl MockOcrClient {
    pub fn new(store: Arc<MockTaskStore>, polls_to_complete: usize) -> Self {
        Self {
            store,
            polls_to_complete: polls_to_complete.max(1),
            page: fixture_page(),
        }
    }

    /// 使用自定义的固定结果
    pub fn with_page(mut self, page: OcrPage) -> Self {
        self.page = page;
        self
    }

    pub fn store(&self) -> &Arc<MockTaskStore> {
        &self.store
    }
}

#[async_trait]
impl DocumentIntelligence for MockOcrClient {
    async fn submit(
        &self,
        file_name: &str,
        _image: &[u8],
        correlation_id: &str,
    ) -> Result<OcrTask, OcrError> {
        let task_id = format!("mock-{}", uuid::Uuid::new_v4());
        debug!("登记 mock 任务 {} (correlation: {})", task_id, correlation_id);

        self.store.insert(&task_id, file_name, self.page.clone());

        let mut task = OcrTask::Mock(TaskInfo::queued(task_id));
        task.mark_submitted();
        Ok(task)
    }

    async fn poll(&self, task: &OcrTask) -> Result<OcrTaskState, OcrError> {
        let OcrTask::Mock(info) = task else {
            return Err(OcrError::TaskFailed(format!("任务 {} 不是 mock 任务", task.id())));
        };

        let status = self
            .store
            .poll(&info.id, self.polls_to_complete)
            .ok_or_else(|| OcrError::TaskFailed(format!("mock 任务 {} 不存在", info.id)))?;

        Ok(OcrTaskState {
            status,
            full_result_url: None,
            error: (status == OcrTaskStatus::Error).then(|| "mock 任务被标记为失败".to_string()),
        })
    }

    async fn fetch_result(&self, task: &OcrTask) -> Result<OcrPage, OcrError> {
        let record = self
            .store
            .get(task.id())
            .ok_or_else(|| OcrError::TaskFailed(format!("mock 任务 {} 不存在", task.id())))?;

        if record.status != OcrTaskStatus::Done {
            return Err(OcrError::TaskFailed(format!(
                "mock 任务 {} 尚未完成 ({:?})",
                task.id(),
                record.status
            )));
        }
        debug!("mock 任务 {} ({}) 返回固定结果", task.id(), record.file_name);
        Ok(record.page)
    }
}
