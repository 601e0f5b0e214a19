//! LLM 客户端抽象
//!
//! 后端（OpenAI 兼容 / Mock）实现 LlmClient::complete：发送完整消息序列，返回首个候选的文本。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 传输层错误：配置缺失、响应不可用、请求失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// API Key 缺失或为占位值；每次调用都会同样失败，但不致命
    #[error("{0}")]
    Configuration(String),

    /// 请求成功但响应形状不可用（无候选），附原始响应便于排查
    #[error("unexpected response format\n{0}")]
    Provider(String),

    /// 网络 / HTTP / 超时
    #[error("request failed\n{0}")]
    Transport(String),
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成：messages 为完整对话（含 system）
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 模型标识，用于日志
    fn model(&self) -> &str {
        "unknown"
    }

    /// 累计 token 用量 (prompt, completion, total)；不统计的后端返回 None
    fn token_usage(&self) -> Option<(u64, u64, u64)> {
        None
    }
}
