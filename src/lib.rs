//! Parley - 与 LLM 的多轮对话编排
//!
//! 模块划分：
//! - **agent**: 对话单元、摘要上下文、上下文压缩
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、会话状态机、双 Agent 会话、中断处理、构建器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话历史与会话记录
//! - **observability**: tracing 初始化
//! - **tools**: 标签协议解析、工具注册表、分派器与内置工具
//! - **ui**: 控制台输入输出

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;
pub mod ui;
