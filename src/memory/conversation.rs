//! 对话历史
//!
//! 按插入顺序保存 role + content 消息，每轮整体发给 LLM。
//! 不变量：至多一条 system 消息，且只能位于下标 0；reset 时清空对话但保留 system。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// 压缩时拼接文本用的角色标签
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "AI",
            Role::System => "System",
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 对话历史：由单个 Agent 独占，只增不减，直到 reset
#[derive(Clone, Debug, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 system prompt 开头的历史
    pub fn with_system(prompt: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.set_system(prompt);
        history
    }

    /// 设置（或替换）下标 0 的 system 消息
    pub fn set_system(&mut self, prompt: impl Into<String>) {
        let msg = Message::system(prompt);
        match self.messages.first() {
            Some(first) if first.role == Role::System => self.messages[0] = msg,
            _ => self.messages.insert(0, msg),
        }
    }

    pub fn system(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.role == Role::System)
    }

    /// 追加消息；System 角色不会追加到末尾，而是替换下标 0
    pub fn push(&mut self, msg: Message) {
        if msg.role == Role::System {
            self.set_system(msg.content);
        } else {
            self.messages.push(msg);
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 除 system 以外的对话消息
    pub fn dialogue(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    pub fn has_dialogue(&self) -> bool {
        self.dialogue().next().is_some()
    }

    /// 清空历史；若之前有 system 消息则重新放回下标 0
    pub fn reset(&mut self) {
        let system = self.system().cloned();
        self.messages.clear();
        if let Some(system) = system {
            self.messages.push(system);
        }
    }

    /// 把对话拼成 "角色: 内容" 段落，供摘要用
    pub fn flatten(&self) -> String {
        let mut text = String::new();
        for msg in self.dialogue() {
            text.push_str(&format!("{}: {}\n\n", msg.role.label(), msg.content));
        }
        text
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_only_system_for_any_length() {
        for extra in 0..12 {
            let mut history = ConversationHistory::with_system("be brief");
            for i in 0..extra {
                if i % 2 == 0 {
                    history.push(Message::user(format!("q{i}")));
                } else {
                    history.push(Message::assistant(format!("a{i}")));
                }
            }
            history.reset();
            assert_eq!(history.len(), 1);
            assert_eq!(history.messages()[0], Message::system("be brief"));
        }
    }

    #[test]
    fn test_reset_without_system_is_empty() {
        let mut history = ConversationHistory::new();
        history.push(Message::user("hi"));
        history.reset();
        assert!(history.is_empty());
    }

    #[test]
    fn test_system_stays_at_index_zero() {
        let mut history = ConversationHistory::new();
        history.push(Message::user("hi"));
        history.push(Message::system("first"));
        history.push(Message::system("second"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0], Message::system("second"));
        assert_eq!(
            history.messages().iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[test]
    fn test_flatten_skips_system() {
        let mut history = ConversationHistory::with_system("sys");
        history.push(Message::user("hello"));
        history.push(Message::assistant("hi there"));
        assert_eq!(history.flatten(), "User: hello\n\nAI: hi there\n\n");
        assert!(history.has_dialogue());
    }
}
