use std::time::Duration;

/// OCR 运行模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcrMode {
    /// 离线模式，返回固定的识别结果
    Mock,
    /// 调用远程文档解析服务
    Real,
}

/// AI 评分运行模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiMode {
    /// 离线模式，不调用任何模型
    Mock,
    /// 调用视觉 / 文本模型
    Real,
}

impl OcrMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Some(Self::Mock),
            "real" => Some(Self::Real),
            _ => None,
        }
    }
}

impl AiMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Some(Self::Mock),
            "real" => Some(Self::Real),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时评分的答题卡数量
    pub max_concurrent_papers: usize,
    /// 试卷模板（ROI + 题目定义）存放目录
    pub template_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 评分完成后是否默认写入成绩库
    pub publish_score: bool,
    // --- OCR 配置 ---
    pub ocr_mode: OcrMode,
    pub ocr_api_base_url: String,
    pub ocr_api_token: String,
    /// 轮询次数上限，超过后报告超时
    pub ocr_max_poll_attempts: usize,
    /// 两次轮询之间的固定间隔（毫秒）
    pub ocr_poll_interval_ms: u64,
    /// 单次 HTTP 请求超时（秒）
    pub ocr_request_timeout_secs: u64,
    /// mock 任务需要被轮询几次才完成
    pub mock_polls_to_complete: usize,
    // --- AI 评分配置 ---
    pub ai_mode: AiMode,
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub vision_enabled: bool,
    pub vision_model_name: String,
    pub text_model_name: String,
    /// 单次模型调用超时（秒）
    pub ai_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_papers: 8,
            template_folder: "templates".to_string(),
            verbose_logging: false,
            output_log_file: "grading.log".to_string(),
            publish_score: false,
            ocr_mode: OcrMode::Mock,
            ocr_api_base_url: "https://mineru.net/api/v4".to_string(),
            ocr_api_token: String::new(),
            ocr_max_poll_attempts: 30,
            ocr_poll_interval_ms: 2000,
            ocr_request_timeout_secs: 30,
            mock_polls_to_complete: 1,
            ai_mode: AiMode::Mock,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            vision_enabled: true,
            vision_model_name: "gpt-4o".to_string(),
            text_model_name: "gpt-4o-mini".to_string(),
            ai_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_papers: env_parse("MAX_CONCURRENT_PAPERS").unwrap_or(default.max_concurrent_papers),
            template_folder: std::env::var("TEMPLATE_FOLDER").unwrap_or(default.template_folder),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            publish_score: env_parse("PUBLISH_SCORE").unwrap_or(default.publish_score),
            ocr_mode: std::env::var("OCR_MODE").ok().and_then(|v| OcrMode::parse(&v)).unwrap_or(default.ocr_mode),
            ocr_api_base_url: std::env::var("OCR_API_BASE_URL").unwrap_or(default.ocr_api_base_url),
            ocr_api_token: std::env::var("OCR_API_TOKEN").unwrap_or(default.ocr_api_token),
            ocr_max_poll_attempts: env_parse("OCR_MAX_POLL_ATTEMPTS").unwrap_or(default.ocr_max_poll_attempts),
            ocr_poll_interval_ms: env_parse("OCR_POLL_INTERVAL_MS").unwrap_or(default.ocr_poll_interval_ms),
            ocr_request_timeout_secs: env_parse("OCR_REQUEST_TIMEOUT_SECS").unwrap_or(default.ocr_request_timeout_secs),
            mock_polls_to_complete: env_parse("MOCK_POLLS_TO_COMPLETE").unwrap_or(default.mock_polls_to_complete),
            ai_mode: std::env::var("AI_MODE").ok().and_then(|v| AiMode::parse(&v)).unwrap_or(default.ai_mode),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            vision_enabled: env_parse("VISION_ENABLED").unwrap_or(default.vision_enabled),
            vision_model_name: std::env::var("VISION_MODEL_NAME").unwrap_or(default.vision_model_name),
            text_model_name: std::env::var("TEXT_MODEL_NAME").unwrap_or(default.text_model_name),
            ai_timeout_secs: env_parse("AI_TIMEOUT_SECS").unwrap_or(default.ai_timeout_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ocr_poll_interval_ms)
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_offline() {
        let config = Config::default();
        assert_eq!(config.ocr_mode, OcrMode::Mock);
        assert_eq!(config.ai_mode, AiMode::Mock);
        assert_eq!(config.ocr_max_poll_attempts, 30);
        assert_eq!(config.ai_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(OcrMode::parse(" REAL "), Some(OcrMode::Real));
        assert_eq!(AiMode::parse("mock"), Some(AiMode::Mock));
        assert_eq!(AiMode::parse("vision"), None);
    }
}
