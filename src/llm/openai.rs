//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（默认 OpenRouter）；Key 缺失或为占位值时
//! 不发请求，直接返回 LlmError::Configuration。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// .env 模板里的占位 Key
pub const PLACEHOLDER_API_KEY: &str = "your_openrouter_api_key";

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
    }

    /// (prompt, completion, total)
    pub fn get(&self) -> (u64, u64, u64) {
        let prompt = self.prompt_tokens.load(Ordering::Relaxed);
        let completion = self.completion_tokens.load(Ordering::Relaxed);
        (prompt, completion, prompt + completion)
    }
}

/// OpenAI 兼容客户端：持有 Client 与 model 名，complete 时转 Message 为 API 格式并取首条 content
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// None 表示未配置（或为占位值）
    api_key: Option<String>,
    key_hint: String,
    timeout: Duration,
    pub usage: TokenUsage,
}

impl OpenAiClient {
    /// `key_hint` 是配置错误提示里出现的环境变量名
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<String>,
        key_hint: &str,
        timeout_secs: u64,
    ) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY);

        let mut config = OpenAIConfig::new().with_api_base(base_url.unwrap_or(OPENROUTER_BASE_URL));
        if let Some(key) = &api_key {
            config = config.with_api_key(key.clone());
        }

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            api_key,
            key_hint: key_hint.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            usage: TokenUsage::default(),
        }
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| {
                let built = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::System),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::User),
                    Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::Assistant),
                };
                built.map_err(|e| LlmError::Transport(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn token_usage(&self) -> Option<(u64, u64, u64)> {
        Some(self.usage.get())
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if self.api_key.is_none() {
            return Err(LlmError::Configuration(format!(
                "API key is not set. Check {} in your .env file.",
                self.key_hint
            )));
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(messages)?)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Transport(format!("timed out after {:?}", self.timeout)))?
            .map_err(map_openai_error)?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        match response.choices.first().and_then(|c| c.message.content.clone()) {
            Some(content) => Ok(content),
            None => Err(LlmError::Provider(
                serde_json::to_string_pretty(&response).unwrap_or_else(|_| format!("{:#?}", response)),
            )),
        }
    }
}

/// 响应体无法解析成 chat completion（例如缺少 choices）时按 Provider 处理，保留原始响应体
fn map_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::JSONDeserialize(e, content) => {
            LlmError::Provider(format!("{}\n({})", content, e))
        }
        other => LlmError::Transport(other.to_string()),
    }
}
