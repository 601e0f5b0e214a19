//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage, OPENROUTER_BASE_URL, PLACEHOLDER_API_KEY};
pub use traits::{LlmClient, LlmError};
