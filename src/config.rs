//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PARLEY__*` 覆盖（双下划线表示嵌套，如 `PARLEY__LLM__MODEL=openai/gpt-4o-mini`）。
//! API Key 本身不进配置文件，只记录读取它的环境变量名（`llm.api_key_env`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::agent::CompressionSettings;
use crate::core::{DuetSettings, SessionSettings};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub compaction: CompactionSection,
    pub duet: DuetSection,
}

/// [app] 段：交互会话
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 退出关键字（不区分大小写）
    pub exit_keyword: String,
    pub transcript_path: PathBuf,
    /// 基础 system prompt；读取失败时使用内置文本
    pub system_prompt_path: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            exit_keyword: "exit".to_string(),
            transcript_path: PathBuf::from("conversation_log.txt"),
            system_prompt_path: PathBuf::from("config/prompts/system.txt"),
        }
    }
}

/// [llm] 段：OpenAI 兼容端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// "mock" 使用本地回显客户端；其他值都走 base_url 的 OpenAI 兼容协议
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 存放 API Key 的环境变量名
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: "google/gemini-2.0-flash-lite-001".to_string(),
            base_url: Some(crate::llm::openai::OPENROUTER_BASE_URL.to_string()),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// [tools] 段：内置工具与脚本目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 脚本工具目录；不设置则只有内置工具
    pub scripts_dir: Option<PathBuf>,
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    /// 启用的内置工具：gettime / myname / ask_user / echo
    pub builtin: Vec<String>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            scripts_dir: None,
            tool_timeout_secs: 30,
            builtin: vec!["gettime".into(), "myname".into(), "ask_user".into()],
        }
    }
}

/// [compaction] 段：上下文压缩
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompactionSection {
    pub tolerance: f64,
    pub max_rounds: usize,
    pub default_target_length: usize,
    /// 0 表示不自动压缩
    pub auto_threshold_messages: usize,
}

impl Default for CompactionSection {
    fn default() -> Self {
        Self {
            tolerance: crate::agent::DEFAULT_TOLERANCE,
            max_rounds: crate::agent::DEFAULT_MAX_ROUNDS,
            default_target_length: 100,
            auto_threshold_messages: 0,
        }
    }
}

impl CompactionSection {
    pub fn settings(&self) -> CompressionSettings {
        CompressionSettings {
            tolerance: self.tolerance,
            max_rounds: self.max_rounds,
        }
    }
}

/// [duet] 段：双 Agent 会话
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DuetSection {
    pub max_turns: usize,
    pub turn_delay_ms: u64,
    pub end_marker: String,
    /// 说出开场白的一方
    pub opener_name: String,
    pub opener_prompt_path: PathBuf,
    pub responder_name: String,
    pub responder_prompt_path: PathBuf,
    pub opening_message: String,
    pub transcript_path: PathBuf,
}

impl Default for DuetSection {
    fn default() -> Self {
        Self {
            max_turns: 20,
            turn_delay_ms: 1000,
            end_marker: crate::core::duet::END_MARKER.to_string(),
            opener_name: "Student".to_string(),
            opener_prompt_path: PathBuf::from("config/prompts/student.txt"),
            responder_name: "Professor".to_string(),
            responder_prompt_path: PathBuf::from("config/prompts/professor.txt"),
            opening_message: "Professor, what is magic engineering? Is it the same as the magic in anime?"
                .to_string(),
            transcript_path: PathBuf::from("duet_log.txt"),
        }
    }
}

impl DuetSection {
    pub fn settings(&self) -> DuetSettings {
        DuetSettings {
            max_turns: self.max_turns,
            turn_delay: std::time::Duration::from_millis(self.turn_delay_ms),
            end_marker: self.end_marker.clone(),
        }
    }
}

impl AppConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            exit_keyword: self.app.exit_keyword.clone(),
            default_target_length: self.compaction.default_target_length,
            auto_threshold_messages: self.compaction.auto_threshold_messages,
            ..SessionSettings::default()
        }
    }
}

/// 从 config 目录加载配置，环境变量 PARLEY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PARLEY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, ignored");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PARLEY")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
