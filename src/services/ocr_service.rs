//! 文档识别服务 - 业务能力层
//!
//! 只负责"把一页图片变成文字片段"的能力：提交 → 轮询 → 下载

use crate::clients::{DocumentIntelligence, MockOcrClient, RemoteOcrClient};
use crate::config::{Config, OcrMode};
use crate::error::OcrError;
use crate::infrastructure::{MockTaskStore, Sleeper, TokioSleeper};
use crate::models::{OcrPage, OcrTask, OcrTaskStatus};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 文档识别服务
///
/// 职责：
/// - 驱动单个识别任务走完状态机
/// - 轮询次数有上限，超出即报告超时
/// - 不关心题目和评分
pub struct OcrService {
    client: Arc<dyn DocumentIntelligence>,
    sleeper: Arc<dyn Sleeper>,
    max_poll_attempts: usize,
    poll_interval: Duration,
}

impl OcrService {
    pub fn new(
        client: Arc<dyn DocumentIntelligence>,
        sleeper: Arc<dyn Sleeper>,
        max_poll_attempts: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            sleeper,
            max_poll_attempts: max_poll_attempts.max(1),
            poll_interval,
        }
    }

    /// 按配置选择 mock 或远程客户端
    pub fn from_config(config: &Config, mock_store: Arc<MockTaskStore>) -> Result<Self> {
        let client: Arc<dyn DocumentIntelligence> = match config.ocr_mode {
            OcrMode::Mock => Arc::new(MockOcrClient::new(
                mock_store,
                config.mock_polls_to_complete,
            )),
            OcrMode::Real => Arc::new(RemoteOcrClient::new(config)?),
        };

        Ok(Self::new(
            client,
            Arc::new(TokioSleeper),
            config.ocr_max_poll_attempts,
            config.poll_interval(),
        ))
    }

    /// 轮询直到任务进入终态
    ///
    /// 非 2xx 或网络错误消耗一次机会后重试
    pub async fn poll_until_terminal(&self, mut task: OcrTask) -> Result<OcrTask, OcrError> {
        for attempt in 1..=self.max_poll_attempts {
            match self.client.poll(&task).await {
                Ok(state) => {
                    debug!(
                        "任务 {} 第 {}/{} 次查询: {:?} ({}%)",
                        task.id(),
                        attempt,
                        self.max_poll_attempts,
                        state.status,
                        state.progress()
                    );
                    task.apply(state);
                    match task.status() {
                        OcrTaskStatus::Done => return Ok(task),
                        OcrTaskStatus::Error => {
                            let reason = task
                                .info()
                                .error
                                .clone()
                                .unwrap_or_else(|| "未知原因".to_string());
                            return Err(OcrError::TaskFailed(reason));
                        }
                        OcrTaskStatus::Queued | OcrTaskStatus::Processing => {}
                    }
                }
                Err(e) => {
                    warn!(
                        "任务 {} 查询失败 (尝试 {}/{}): {}",
                        task.id(),
                        attempt,
                        self.max_poll_attempts,
                        e
                    );
                }
            }

            if attempt < self.max_poll_attempts {
                self.sleeper.sleep(self.poll_interval).await;
            }
        }

        warn!(
            "任务 {} 轮询 {} 次仍未完成，放弃",
            task.id(),
            self.max_poll_attempts
        );
        Err(OcrError::Timeout {
            batch_id: task.id().to_string(),
            attempts: self.max_poll_attempts,
        })
    }

    /// 识别一页图片
    ///
    /// # 参数
    /// - `file_name`: 上传使用的文件名
    /// - `image`: 图片字节
    /// - `correlation_id`: 关联 ID（一般是提交 ID）
    pub async fn fetch_page(
        &self,
        file_name: &str,
        image: &[u8],
        correlation_id: &str,
    ) -> Result<OcrPage, OcrError> {
        let task = self.client.submit(file_name, image, correlation_id).await?;
        info!(
            "📤 已提交识别任务 {} ({})",
            task.id(),
            if task.is_mock() { "mock" } else { "远程" }
        );

        let task = self.poll_until_terminal(task).await?;
        let page = self.client.fetch_result(&task).await?;

        info!("✓ 识别完成，共 {} 个文字片段", page.spans.len());
        Ok(page)
    }
}
