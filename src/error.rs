use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文档识别（OCR）错误，整张答题卡放弃评分
    #[error("OCR错误: {0}")]
    Ocr(#[from] OcrError),
    /// AI 评分错误（单层失败，会触发降级）
    #[error("AI评分错误: {0}")]
    Adapter(#[from] AdapterError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置 / 模板错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 文档识别服务错误
#[derive(Debug, Error)]
pub enum OcrError {
    /// 服务不可用（申请上传地址失败等）
    #[error("文档识别服务不可用 ({endpoint}): {message}")]
    ProviderUnavailable { endpoint: String, message: String },
    /// 上传文件失败
    #[error("上传失败 (HTTP {status}): {body}")]
    UploadFailed { status: u16, body: String },
    /// 轮询次数耗尽
    #[error("识别任务 {batch_id} 轮询 {attempts} 次仍未完成")]
    Timeout { batch_id: String, attempts: usize },
    /// 服务端报告任务失败
    #[error("识别任务失败: {0}")]
    TaskFailed(String),
    /// 结果文件无法解析
    #[error("识别结果无法解析: {0}")]
    MalformedResult(String),
}

/// 评分层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingTier {
    Vision,
    Text,
    Mock,
}

impl std::fmt::Display for GradingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradingTier::Vision => write!(f, "vision"),
            GradingTier::Text => write!(f, "text"),
            GradingTier::Mock => write!(f, "mock"),
        }
    }
}

/// AI 评分适配器错误
#[derive(Debug, Error)]
pub enum AdapterError {
    /// 某一层评分失败
    #[error("{tier} 层评分失败: {reason}")]
    AdapterFailed { tier: GradingTier, reason: String },
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 同一提交已写入过评分结果
    #[error("提交 {submission_id} 已存在评分结果")]
    PersistenceConflict { submission_id: String },
    /// 记录不存在
    #[error("{kind} 不存在: {id}")]
    NotFound { kind: &'static str, id: String },
}

/// 模板 / 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ROI 尺寸非法
    #[error("ROI {id} 尺寸非法 (w={w}, h={h})")]
    InvalidRoi { id: String, w: f64, h: f64 },
    /// 题目分值非法
    #[error("题目 {id} 分值非法: {max_points}")]
    InvalidMaxPoints { id: String, max_points: f64 },
    /// ID 重复
    #[error("{kind} ID 重复: {id}")]
    DuplicateId { kind: &'static str, id: String },
    /// 模板不存在
    #[error("找不到作业 {0} 的试卷模板")]
    TemplateNotFound(String),
}

// ========== 便捷构造函数 ==========

impl OcrError {
    pub fn provider_unavailable(endpoint: impl Into<String>, message: impl ToString) -> Self {
        OcrError::ProviderUnavailable {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

impl AdapterError {
    pub fn failed(tier: GradingTier, reason: impl ToString) -> Self {
        AdapterError::AdapterFailed {
            tier,
            reason: reason.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
