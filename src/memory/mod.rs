//! 记忆层：对话历史与会话记录持久化

pub mod conversation;
pub mod transcript;

pub use conversation::{ConversationHistory, Message, Role};
pub use transcript::TranscriptLog;
