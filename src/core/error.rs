//! Agent 错误类型
//!
//! Orchestrator 以下的任何错误都不终止进程：在对话边界处经 render() 转成文本，
//! 作为回复或工具结果交给模型/用户。

use thiserror::Error;

use crate::llm::LlmError;

/// 会话运行过程中可能出现的错误（配置、响应、工具解析与执行）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{0}")]
    Configuration(String),

    #[error("unexpected response format\n{0}")]
    Provider(String),

    #[error("problem during API request\n{0}")]
    Transport(String),

    #[error("tool '{0}' not found")]
    UnknownTool(String),

    #[error("tool '{tool}' has no function '{function}'")]
    UnknownFunction { tool: String, function: String },

    #[error("an error occurred while running tool '{tool}': {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    #[error("tool '{tool}' timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("tool '{tool}' panicked: {reason}")]
    ToolPanicked { tool: String, reason: String },
}

impl AgentError {
    /// 模型 / 用户看到的文本形式
    pub fn render(&self) -> String {
        format!("Error: {}", self)
    }

    /// 工具名或函数名无法解析
    pub fn is_resolution(&self) -> bool {
        matches!(self, AgentError::UnknownTool(_) | AgentError::UnknownFunction { .. })
    }
}

/// panic 负载中的消息文本
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(msg) => AgentError::Configuration(msg),
            LlmError::Provider(raw) => AgentError::Provider(raw),
            LlmError::Transport(msg) => AgentError::Transport(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefixes_error() {
        let err = AgentError::UnknownTool("weather".to_string());
        assert_eq!(err.render(), "Error: tool 'weather' not found");
        assert!(err.is_resolution());
    }

    #[test]
    fn test_provider_error_keeps_raw_response() {
        let err: AgentError = LlmError::Provider("{\"choices\": []}".to_string()).into();
        assert!(err.render().contains("{\"choices\": []}"));
        assert!(!err.is_resolution());
    }
}
