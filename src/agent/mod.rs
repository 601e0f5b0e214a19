//! Agent 层：基础对话单元、摘要上下文装饰、上下文压缩

pub mod chat;
pub mod compression;
pub mod context;

pub use chat::{ChatAgent, Conversant};
pub use compression::{
    deviation, CompressionEngine, CompressionOutcome, CompressionSettings, DEFAULT_MAX_ROUNDS,
    DEFAULT_TOLERANCE,
};
pub use context::ContextAwareAgent;
