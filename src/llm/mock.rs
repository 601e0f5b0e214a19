//! Mock LLM 客户端（用于测试，无需 API）
//!
//! - MockLlmClient：回显最后一条 User 消息，便于本地跑通会话
//! - ScriptedLlmClient：按顺序返回预设回复（或由闭包生成），并记录每次请求

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {}", last_user))
    }

    fn model(&self) -> &str {
        "mock"
    }
}

type Responder = Box<dyn Fn(&[Message]) -> Result<String, LlmError> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<String, LlmError>>>),
    Responder(Responder),
}

/// 脚本化客户端：队列耗尽后返回 Provider 错误
pub struct ScriptedLlmClient {
    script: Script,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// 预设结果中可以混入错误
    pub fn with_results(results: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(results.into_iter().collect())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 每次请求由闭包根据消息生成回复
    pub fn responder(
        f: impl Fn(&[Message]) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Script::Responder(Box::new(f)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的全部请求（每次调用的完整消息序列）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| Err(LlmError::Provider("script exhausted".to_string()))),
            Script::Responder(f) => f(messages),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order_then_exhausted() {
        let client = ScriptedLlmClient::new(["one", "two"]);
        assert_eq!(client.complete(&[]).await.unwrap(), "one");
        assert_eq!(client.complete(&[Message::user("x")]).await.unwrap(), "two");
        assert!(matches!(
            client.complete(&[]).await,
            Err(LlmError::Provider(_))
        ));
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests()[1], vec![Message::user("x")]);
    }

    #[tokio::test]
    async fn test_mock_echoes_last_user_message() {
        let reply = MockLlmClient
            .complete(&[Message::user("a"), Message::assistant("b"), Message::user("c")])
            .await
            .unwrap();
        assert_eq!(reply, "Echo from Mock: c");
    }
}
