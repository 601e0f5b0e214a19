//! 核心编排层：错误、会话状态、交互主控循环、双 Agent 会话、中断处理、构建器

pub mod builder;
pub mod duet;
pub mod error;
pub mod orchestrator;
pub mod shutdown;
pub mod state;

pub use builder::{load_prompt, AgentBuilder};
pub use duet::{strip_end_marker, Duet, DuetSettings, Speaker, END_MARKER};
pub use error::AgentError;
pub use orchestrator::{Orchestrator, SessionSettings, SESSION_MARKER};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{EndReason, SessionPhase, SessionReport, TurnState};
