//! 大模型 API 客户端
//!
//! 封装 OpenAI 兼容的 chat-completions 调用，支持图片输入和 JSON 输出模式
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use crate::config::Config;
use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// 一次对话请求
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub system_message: Option<String>,
    pub user_message: String,
    /// 图片 URL 或 data URL，非空时走 Vision 接口
    pub image_urls: Vec<String>,
    /// 要求模型只输出 JSON 对象
    pub json_output: bool,
}

/// 对话模型能力
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 返回模型输出的文本内容
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
        }
    }

    fn build_user_message(request: &ChatRequest) -> Result<ChatCompletionRequestMessage> {
        let user_msg = if request.image_urls.is_empty() {
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_message.as_str())
                .build()?
        } else {
            // 使用 Vision API：文本在前，图片在后
            let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                Vec::with_capacity(request.image_urls.len() + 1);

            content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: request.user_message.clone(),
                },
            ));

            for url in &request.image_urls {
                content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: url.clone(),
                            detail: Some(ImageDetail::High),
                        },
                    },
                ));
            }

            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                .build()?
        };

        Ok(ChatCompletionRequestMessage::User(user_msg))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        debug!("调用 LLM API，模型: {}", request.model);
        debug!("用户消息长度: {} 字符", request.user_message.len());
        if !request.image_urls.is_empty() {
            debug!("包含 {} 张图片", request.image_urls.len());
        }

        let mut messages = Vec::new();

        if let Some(sys_msg) = &request.system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg.as_str())
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        messages.push(Self::build_user_message(request)?);

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&request.model)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(1024u32);
        if request.json_output {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let chat_request = builder.build()?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}
