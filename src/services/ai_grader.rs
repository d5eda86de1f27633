//! AI 评分服务 - 业务能力层
//!
//! 只负责"给一道主观题打分"的能力，按层级尝试：
//! 1. mock（配置为离线模式时，优先于其他层）
//! 2. vision：整页图片 + 题干 + 评分细则
//! 3. text：已还原的作答文本 + 题干 + 评分细则
//!
//! 模型返回的分数一律限制在 `[0, max_points]`

use crate::clients::{ChatModel, ChatRequest, LlmClient};
use crate::config::{AiMode, Config};
use crate::error::{AdapterError, GradingTier};
use crate::models::QuestionDefinition;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::Rng;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_MESSAGE: &str = "你是一名严谨的阅卷老师，根据评分细则为学生的主观题作答打分。\
                              只输出一个 JSON 对象，格式为 \
                              {\"studentAnswer\": string, \"score\": number, \"feedback\": string}，不要输出其他内容。";

/// 单层评分结果
#[derive(Debug, Clone, PartialEq)]
pub struct AiVerdict {
    pub student_answer: String,
    pub score: f64,
    pub feedback: String,
    pub tier: GradingTier,
}

/// AI 评分服务
///
/// 职责：
/// - 调用视觉 / 文本模型给单道主观题评分
/// - 视觉层失败时降级到文本层，只记录警告
/// - 不出现 submission / paper
pub struct AiGrader {
    mode: AiMode,
    chat: Option<Arc<dyn ChatModel>>,
    vision_enabled: bool,
    vision_model: String,
    text_model: String,
    timeout: Duration,
}

impl AiGrader {
    /// 按配置创建；离线模式下不创建模型客户端
    pub fn from_config(config: &Config) -> Self {
        let chat: Option<Arc<dyn ChatModel>> = match config.ai_mode {
            AiMode::Mock => None,
            AiMode::Real => Some(Arc::new(LlmClient::new(config))),
        };
        Self::build(config, chat)
    }

    /// 使用指定的模型实现（真实模式）
    pub fn with_chat_model(config: &Config, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            mode: AiMode::Real,
            ..Self::build(config, Some(chat))
        }
    }

    /// 离线评分
    pub fn mock() -> Self {
        Self::build(&Config::default(), None)
    }

    fn build(config: &Config, chat: Option<Arc<dyn ChatModel>>) -> Self {
        Self {
            mode: config.ai_mode,
            chat,
            vision_enabled: config.vision_enabled,
            vision_model: config.vision_model_name.clone(),
            text_model: config.text_model_name.clone(),
            timeout: config.ai_timeout(),
        }
    }

    /// 给一道主观题评分
    ///
    /// # 参数
    /// - `question`: 题目定义，`correct_answer` 作为评分细则
    /// - `answer`: 已还原的作答文本
    /// - `page_image`: 整页图片（可选，视觉层使用）
    ///
    /// # 返回
    /// 所有层都失败时返回最后一层的错误
    pub async fn grade(
        &self,
        question: &QuestionDefinition,
        answer: &str,
        page_image: Option<&[u8]>,
    ) -> Result<AiVerdict, AdapterError> {
        let chat = match (self.mode, &self.chat) {
            (AiMode::Mock, _) => return Ok(mock_grade(question, answer)),
            (AiMode::Real, Some(chat)) => chat.clone(),
            (AiMode::Real, None) => {
                return Err(AdapterError::failed(GradingTier::Text, "未配置模型客户端"))
            }
        };

        if self.vision_enabled {
            if let Some(image) = page_image {
                match self.vision_grade(chat.as_ref(), question, image).await {
                    Ok(verdict) => return Ok(verdict),
                    Err(e) => warn!("题目 {} 视觉评分失败，降级为文本评分: {}", question.id, e),
                }
            }
        }

        self.text_grade(chat.as_ref(), question, answer).await
    }

    async fn vision_grade(
        &self,
        chat: &dyn ChatModel,
        question: &QuestionDefinition,
        image: &[u8],
    ) -> Result<AiVerdict, AdapterError> {
        let user_message = format!(
            r#"图片是学生的整页答题卡，请找到题目 {} 的作答并评分。

题目：{}
评分细则：{}
满分：{}

studentAnswer 填写你从图片中识别出的该题作答原文。"#,
            question.id,
            display_or_none(&question.content),
            display_or_none(&question.correct_answer),
            question.max_points
        );

        let request = ChatRequest {
            model: self.vision_model.clone(),
            system_message: Some(SYSTEM_MESSAGE.to_string()),
            user_message,
            image_urls: vec![image_data_url(image)],
            json_output: true,
        };

        self.call_tier(chat, GradingTier::Vision, &request, question, None)
            .await
    }

    async fn text_grade(
        &self,
        chat: &dyn ChatModel,
        question: &QuestionDefinition,
        answer: &str,
    ) -> Result<AiVerdict, AdapterError> {
        let user_message = format!(
            r#"请根据评分细则给学生的作答打分。

题目：{}
评分细则：{}
满分：{}
学生作答（OCR 识别结果，可能有少量识别错误）：{}"#,
            display_or_none(&question.content),
            display_or_none(&question.correct_answer),
            question.max_points,
            answer
        );

        let request = ChatRequest {
            model: self.text_model.clone(),
            system_message: Some(SYSTEM_MESSAGE.to_string()),
            user_message,
            image_urls: Vec::new(),
            json_output: true,
        };

        self.call_tier(chat, GradingTier::Text, &request, question, Some(answer))
            .await
    }

    async fn call_tier(
        &self,
        chat: &dyn ChatModel,
        tier: GradingTier,
        request: &ChatRequest,
        question: &QuestionDefinition,
        known_answer: Option<&str>,
    ) -> Result<AiVerdict, AdapterError> {
        debug!("题目 {} 使用 {} 层评分，模型: {}", question.id, tier, request.model);

        let response = tokio::time::timeout(self.timeout, chat.complete(request))
            .await
            .map_err(|_| AdapterError::failed(tier, format!("调用超时 ({:?})", self.timeout)))?
            .map_err(|e| AdapterError::failed(tier, e))?;

        let mut verdict = parse_verdict(&response, question)
            .map_err(|reason| AdapterError::failed(tier, reason))?;
        verdict.tier = tier;
        if let Some(answer) = known_answer {
            if verdict.student_answer.is_empty() {
                verdict.student_answer = answer.to_string();
            }
        }
        Ok(verdict)
    }
}

/// 离线评分：有评分细则给满分，没有则在 [0, max_points] 内随机
pub fn mock_grade(question: &QuestionDefinition, answer: &str) -> AiVerdict {
    let (score, feedback) = if question.correct_answer.trim().is_empty() {
        // 未经模板校验的非有限满分按 0 处理
        let max = if question.max_points.is_finite() {
            question.max_points.max(0.0)
        } else {
            0.0
        };
        let raw: f64 = rand::thread_rng().gen_range(0.0..=max);
        ((raw * 2.0).round() / 2.0, "mock: 随机评分".to_string())
    } else {
        (question.max_points, "mock: 按评分细则给满分".to_string())
    };

    AiVerdict {
        student_answer: answer.to_string(),
        score: question.clamp_score(score),
        feedback,
        tier: GradingTier::Mock,
    }
}

/// 解析模型返回的 `{studentAnswer, score, feedback}`
///
/// 允许外层包裹 markdown 代码块；score 非数值时记 0 分
pub fn parse_verdict(response: &str, question: &QuestionDefinition) -> Result<AiVerdict, String> {
    let json_text = extract_json_object(response)
        .ok_or_else(|| format!("响应中没有 JSON 对象: {}", truncate(response, 80)))?;

    let value: JsonValue =
        serde_json::from_str(json_text).map_err(|e| format!("JSON 解析失败: {}", e))?;
    let object = value
        .as_object()
        .ok_or_else(|| "响应不是 JSON 对象".to_string())?;

    let student_answer = object
        .get("studentAnswer")
        .or_else(|| object.get("student_answer"))
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let raw_score = object.get("score").map(coerce_score).unwrap_or(0.0);
    let score = question.clamp_score(raw_score);
    if score != raw_score {
        warn!(
            "题目 {} 模型返回分数 {} 超出范围，已限制为 {}",
            question.id, raw_score, score
        );
    }

    let feedback = object
        .get("feedback")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(AiVerdict {
        student_answer,
        score,
        feedback,
        tier: GradingTier::Text,
    })
}

fn coerce_score(value: &JsonValue) -> f64 {
    match value {
        JsonValue::Number(n) => n.as_f64().unwrap_or(0.0),
        JsonValue::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn extract_json_object(response: &str) -> Option<&str> {
    // 优先取代码块中的内容
    if let Ok(re) = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```") {
        if let Some(m) = re.captures(response).and_then(|c| c.get(1)) {
            return Some(m.as_str());
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

/// 图片字节转 data URL
pub fn image_data_url(image: &[u8]) -> String {
    let mime = if image.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if image.starts_with(b"RIFF") && image.get(8..12) == Some(&b"WEBP"[..]) {
        "image/webp"
    } else {
        "application/octet-stream"
    };
    format!("data:{};base64,{}", mime, STANDARD.encode(image))
}

fn display_or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "（无）"
    } else {
        text
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    crate::utils::logging::truncate_text(text, max_len)
}
