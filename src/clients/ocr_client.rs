//! 文档识别 API 客户端
//!
//! 封装远程文档解析服务的调用：申请上传地址 → 上传 → 查询批次 → 下载结果

use crate::config::Config;
use crate::error::OcrError;
use crate::models::{OcrPage, OcrSpan, OcrTask, OcrTaskState, OcrTaskStatus, PageSize, TaskInfo};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// 文档识别能力
///
/// mock 与远程实现都通过这个接口被调用，任务本身用 `OcrTask` 枚举区分来源
#[async_trait]
pub trait DocumentIntelligence: Send + Sync {
    /// 提交一页图片，返回已被服务端确认的任务（处理中）
    async fn submit(
        &self,
        file_name: &str,
        image: &[u8],
        correlation_id: &str,
    ) -> Result<OcrTask, OcrError>;

    /// 查询一次任务状态
    async fn poll(&self, task: &OcrTask) -> Result<OcrTaskState, OcrError>;

    /// 下载已完成任务的识别结果
    async fn fetch_result(&self, task: &OcrTask) -> Result<OcrPage, OcrError>;
}

/// 申请到的上传目标
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    pub batch_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadTargetRequest<'a> {
    file_name: &'a str,
    correlation_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct BatchResultResponse {
    #[serde(default)]
    results: Vec<BatchResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchResultItem {
    #[serde(default)]
    state: String,
    full_result_url: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultDocument {
    #[serde(default)]
    pages: Vec<ResultPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultPage {
    #[serde(default)]
    page_size: Option<[f64; 2]>,
    #[serde(default)]
    spans: Vec<OcrSpan>,
}

/// 把服务端状态字符串映射为三态
pub fn map_provider_state(state: &str) -> OcrTaskStatus {
    match state.trim().to_ascii_lowercase().as_str() {
        "done" | "success" | "succeeded" => OcrTaskStatus::Done,
        "failed" | "error" => OcrTaskStatus::Error,
        // pending / waiting-file / running / converting 以及未知状态都视为处理中
        _ => OcrTaskStatus::Processing,
    }
}

/// 远程文档识别客户端
pub struct RemoteOcrClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RemoteOcrClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.ocr_api_base_url.trim_end_matches('/').to_string(),
            token: config.ocr_api_token.clone(),
        })
    }

    /// 申请签名上传地址
    ///
    /// # 返回
    /// 返回上传地址和后续轮询使用的 batch_id
    pub async fn request_upload_target(
        &self,
        file_name: &str,
        correlation_id: &str,
    ) -> Result<UploadTarget, OcrError> {
        let endpoint = format!("{}/upload-targets", self.base_url);
        debug!("申请上传地址: {} (correlation: {})", file_name, correlation_id);

        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&UploadTargetRequest {
                file_name,
                correlation_id,
            })
            .send()
            .await
            .map_err(|e| OcrError::provider_unavailable(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::provider_unavailable(
                &endpoint,
                format!("HTTP {}: {}", status.as_u16(), body),
            ));
        }

        response
            .json::<UploadTarget>()
            .await
            .map_err(|e| OcrError::provider_unavailable(&endpoint, e))
    }

    /// 上传图片字节
    ///
    /// 只设置 Content-Length；签名地址会拒绝不匹配的 Content-Type，所以不能带
    pub async fn upload_bytes(&self, upload_url: &str, bytes: &[u8]) -> Result<(), OcrError> {
        debug!("上传 {} 字节", bytes.len());

        let response = self
            .http
            .put(upload_url)
            .header(CONTENT_LENGTH, bytes.len())
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| OcrError::UploadFailed {
                status: 0,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// 查询批次结果
    ///
    /// 结果列表为空说明服务端已接收但尚未调度，按处理中对待
    pub async fn query_batch(&self, batch_id: &str) -> Result<OcrTaskState, OcrError> {
        let endpoint = format!("{}/batch-results/{}", self.base_url, batch_id);

        let response = self
            .http
            .get(&endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| OcrError::provider_unavailable(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::provider_unavailable(
                &endpoint,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body: BatchResultResponse = response
            .json()
            .await
            .map_err(|e| OcrError::provider_unavailable(&endpoint, e))?;

        let Some(item) = body.results.into_iter().next() else {
            debug!("批次 {} 结果列表为空，视为处理中", batch_id);
            return Ok(OcrTaskState::processing());
        };

        let status = map_provider_state(&item.state);
        if status == OcrTaskStatus::Processing && !item.state.is_empty() {
            debug!("批次 {} 状态: {}", batch_id, item.state);
        }

        Ok(OcrTaskState {
            status,
            full_result_url: item.full_result_url,
            error: item.error_message,
        })
    }

    /// 下载并解析结果文件，取第一页
    pub async fn download_result(&self, full_result_url: &str) -> Result<OcrPage, OcrError> {
        let response = self
            .http
            .get(full_result_url)
            .send()
            .await
            .map_err(|e| OcrError::provider_unavailable(full_result_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::provider_unavailable(
                full_result_url,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| OcrError::provider_unavailable(full_result_url, e))?;

        parse_result_document(&text)
    }
}

/// 解析结果文件 `{pages: [{pageSize: [w, h], spans: [...]}]}`
pub fn parse_result_document(text: &str) -> Result<OcrPage, OcrError> {
    let document: ResultDocument =
        serde_json::from_str(text).map_err(|e| OcrError::MalformedResult(e.to_string()))?;

    let page = document
        .pages
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::MalformedResult("结果中没有页面".to_string()))?;

    let page_size = page
        .page_size
        .map(|[width, height]| PageSize { width, height })
        .unwrap_or_default();

    Ok(OcrPage {
        spans: page.spans,
        page_size,
    })
}

#[async_trait]
impl DocumentIntelligence for RemoteOcrClient {
    async fn submit(
        &self,
        file_name: &str,
        image: &[u8],
        correlation_id: &str,
    ) -> Result<OcrTask, OcrError> {
        let target = self.request_upload_target(file_name, correlation_id).await?;
        let mut task = OcrTask::Real(TaskInfo::queued(&target.batch_id));

        self.upload_bytes(&target.upload_url, image).await?;
        task.mark_submitted();

        Ok(task)
    }

    async fn poll(&self, task: &OcrTask) -> Result<OcrTaskState, OcrError> {
        match task {
            OcrTask::Real(info) => self.query_batch(&info.id).await,
            OcrTask::Mock(info) => {
                warn!("远程客户端收到 mock 任务 {}", info.id);
                Err(OcrError::TaskFailed(format!("任务 {} 不是远程任务", info.id)))
            }
        }
    }

    async fn fetch_result(&self, task: &OcrTask) -> Result<OcrPage, OcrError> {
        let OcrTask::Real(info) = task else {
            return Err(OcrError::TaskFailed(format!("任务 {} 不是远程任务", task.id())));
        };

        let url = info.full_result_url.as_deref().ok_or_else(|| {
            OcrError::MalformedResult(format!("批次 {} 缺少结果地址", info.id))
        })?;

        self.download_result(url).await
    }
}
