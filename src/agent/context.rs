//! 带摘要上下文的 Agent
//!
//! 以组合方式包装 ChatAgent：设置摘要后，每条发出的消息都包成
//! `context summary: {summary}\n\nmessage: {message}`；cleanup 压缩历史并在成功后重置。
//! 摘要只在压缩成功后设置，之后一直保留直到下一次压缩覆盖。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{ChatAgent, CompressionEngine, CompressionOutcome, CompressionSettings, Conversant};
use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::ConversationHistory;

pub struct ContextAwareAgent {
    chat: ChatAgent,
    summary: Option<String>,
    compression: CompressionEngine,
}

impl ContextAwareAgent {
    /// system_prompt 为 None 时历史不含 system 消息
    pub fn new(
        llm: Arc<dyn LlmClient>,
        system_prompt: Option<String>,
        settings: CompressionSettings,
    ) -> Self {
        let chat = match system_prompt {
            Some(prompt) => ChatAgent::with_system_prompt(Arc::clone(&llm), prompt),
            None => ChatAgent::new(Arc::clone(&llm)),
        };
        Self {
            chat,
            summary: None,
            compression: CompressionEngine::new(llm, settings),
        }
    }

    pub fn llm(&self) -> Arc<dyn LlmClient> {
        self.chat.llm()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// 摘要包装（无摘要时原样返回）
    pub fn wrap(&self, message: &str) -> String {
        match &self.summary {
            Some(summary) => format!("context summary: {summary}\n\nmessage: {message}"),
            None => message.to_string(),
        }
    }

    /// 把历史压缩成约 target_length 字符的摘要，然后重置历史（保留 system）。
    /// 没有可摘要的对话时返回 Ok(None)；辅助 Agent 出错时历史与摘要都不变。
    pub async fn cleanup(
        &mut self,
        target_length: usize,
    ) -> Result<Option<CompressionOutcome>, AgentError> {
        if !self.chat.history().has_dialogue() {
            return Ok(None);
        }
        let transcript = self.chat.history().flatten();
        let outcome = self.compression.summarize(&transcript, target_length).await?;

        tracing::info!(
            length = outcome.length,
            target_length = outcome.target_length,
            rounds = outcome.rounds,
            converged = outcome.converged,
            "conversation compressed"
        );
        self.summary = Some(outcome.summary.clone());
        self.chat.reset();
        Ok(Some(outcome))
    }
}

#[async_trait]
impl Conversant for ContextAwareAgent {
    async fn respond(&mut self, message: &str) -> Result<String, AgentError> {
        let outgoing = self.wrap(message);
        self.chat.respond(&outgoing).await
    }

    fn reset(&mut self) {
        self.chat.reset();
    }

    fn history(&self) -> &ConversationHistory {
        self.chat.history()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::memory::Message;

    fn agent(llm: Arc<ScriptedLlmClient>) -> ContextAwareAgent {
        ContextAwareAgent::new(llm, Some("sys".to_string()), CompressionSettings::default())
    }

    #[tokio::test]
    async fn test_cleanup_with_nothing_to_summarize() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        let mut a = agent(llm.clone());
        assert_eq!(a.cleanup(100).await.unwrap(), None);
        assert_eq!(llm.call_count(), 0);
        assert_eq!(a.summary(), None);
    }

    #[tokio::test]
    async fn test_cleanup_sets_summary_and_wraps_later_messages() {
        let summary = "s".repeat(100);
        let llm = Arc::new(ScriptedLlmClient::new([
            "hello back".to_string(),
            summary.clone(),
            "after".to_string(),
        ]));
        let mut a = agent(llm.clone());
        a.respond("hello").await.unwrap();

        let outcome = a.cleanup(100).await.unwrap().unwrap();
        assert_eq!(outcome.summary, summary);
        assert_eq!(a.summary(), Some(summary.as_str()));
        assert_eq!(a.history().messages(), &[Message::system("sys")]);

        // 摘要请求只含对话，不含 system
        let summarize_request = &llm.requests()[1];
        assert_eq!(summarize_request.len(), 1);
        assert!(summarize_request[0].content.contains("User: hello"));
        assert!(summarize_request[0].content.contains("AI: hello back"));
        assert!(!summarize_request[0].content.contains("System:"));

        a.respond("next").await.unwrap();
        let last = llm.requests()[2].clone();
        assert_eq!(
            last[1].content,
            format!("context summary: {summary}\n\nmessage: next")
        );
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_history() {
        let llm = Arc::new(ScriptedLlmClient::new(["reply"]));
        let mut a = agent(llm);
        a.respond("hello").await.unwrap();
        assert!(a.cleanup(50).await.is_err());
        assert_eq!(a.history().len(), 3);
        assert_eq!(a.summary(), None);
    }
}
