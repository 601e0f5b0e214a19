//! 基础对话能力
//!
//! ChatAgent 独占一份 ConversationHistory：每次 respond 追加 user 消息、把完整历史发给 LLM、
//! 追加 assistant 回复并原样返回。失败时 user 消息保留，assistant 不追加。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{ConversationHistory, Message};

/// 一问一答的对话单元
#[async_trait]
pub trait Conversant: Send {
    /// 发送一条消息并返回回复；错误以类型返回
    async fn respond(&mut self, message: &str) -> Result<String, AgentError>;

    /// 清空历史（保留 system 消息）
    fn reset(&mut self);

    fn history(&self) -> &ConversationHistory;

    /// 对话边界：错误渲染成文本，调用方把每个回复都当作可能的错误报告
    async fn reply(&mut self, message: &str) -> String {
        match self.respond(message).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "exchange failed, error returned as reply text");
                e.render()
            }
        }
    }
}

/// 基础 Agent：LLM + 历史
pub struct ChatAgent {
    llm: Arc<dyn LlmClient>,
    history: ConversationHistory,
}

impl ChatAgent {
    /// 无 system prompt、无历史
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            history: ConversationHistory::new(),
        }
    }

    pub fn with_system_prompt(llm: Arc<dyn LlmClient>, prompt: impl Into<String>) -> Self {
        Self {
            llm,
            history: ConversationHistory::with_system(prompt),
        }
    }

    pub fn llm(&self) -> Arc<dyn LlmClient> {
        Arc::clone(&self.llm)
    }
}

#[async_trait]
impl Conversant for ChatAgent {
    async fn respond(&mut self, message: &str) -> Result<String, AgentError> {
        self.history.push(Message::user(message));
        tracing::debug!(
            model = self.llm.model(),
            messages = self.history.len(),
            "sending conversation"
        );
        let reply = self.llm.complete(self.history.messages()).await?;
        self.history.push(Message::assistant(reply.clone()));
        Ok(reply)
    }

    fn reset(&mut self) {
        self.history.reset();
    }

    fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::memory::Role;

    #[tokio::test]
    async fn test_sends_full_history_every_turn() {
        let llm = Arc::new(ScriptedLlmClient::new(["first", "second"]));
        let mut agent = ChatAgent::with_system_prompt(llm.clone(), "sys");

        assert_eq!(agent.respond("one").await.unwrap(), "first");
        assert_eq!(agent.respond("two").await.unwrap(), "second");

        let requests = llm.requests();
        assert_eq!(requests[0].len(), 2);
        assert_eq!(
            requests[1],
            vec![
                Message::system("sys"),
                Message::user("one"),
                Message::assistant("first"),
                Message::user("two"),
            ]
        );
        assert_eq!(agent.history().len(), 5);
    }

    #[tokio::test]
    async fn test_error_becomes_reply_text() {
        let llm = Arc::new(ScriptedLlmClient::with_results([Err(LlmError::Configuration(
            "API key is not set".to_string(),
        ))]));
        let mut agent = ChatAgent::new(llm);

        let text = agent.reply("hi").await;
        assert_eq!(text, "Error: API key is not set");
        // user 消息保留，assistant 不追加
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history().messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_reset_keeps_system() {
        let llm = Arc::new(ScriptedLlmClient::new(["a", "b"]));
        let mut agent = ChatAgent::with_system_prompt(llm, "sys");
        agent.respond("x").await.unwrap();
        agent.respond("y").await.unwrap();
        agent.reset();
        assert_eq!(agent.history().messages(), &[Message::system("sys")]);
    }
}
