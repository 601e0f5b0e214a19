//! 会话构建器：配置 → LLM 客户端 → 工具注册表 → system prompt → 会话
//!
//! main 与 duet 两个入口共用；测试可用 with_llm 注入脚本化客户端。

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::agent::ContextAwareAgent;
use crate::config::AppConfig;
use crate::core::{Duet, Orchestrator, Speaker};
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::TranscriptLog;
use crate::tools::{
    discover_scripts, AskUserTool, EchoTool, GetTimeTool, MyNameTool, ToolDispatcher, ToolRegistry,
};
use crate::ui::Console;

const FALLBACK_SYSTEM_PROMPT: &str = "You are a helpful assistant. \
     You can call a tool by writing <toolname>argument</toolname> or \
     <toolname.subtool>argument</toolname.subtool>; the result comes back as \
     <toolname_result>...</toolname_result>. Write <<END>> when the conversation is over.";

const FALLBACK_DUET_PROMPT: &str = "You are taking part in a friendly conversation. \
     Keep each reply short. When the conversation has reached a natural end, finish your reply with <end>.";

pub struct AgentBuilder {
    config: AppConfig,
    console: Arc<dyn Console>,
    llm: Option<Arc<dyn LlmClient>>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig, console: Arc<dyn Console>) -> Self {
        Self {
            config,
            console,
            llm: None,
        }
    }

    /// 使用给定客户端代替按配置创建的 OpenAI 兼容客户端
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// provider = "mock" 时使用回显客户端，不需要 Key。
    /// 其他情况 Key 从 llm.api_key_env 指定的环境变量读取；缺失时客户端照常创建，调用时返回配置错误
    pub fn build_llm(&self) -> Arc<dyn LlmClient> {
        if let Some(llm) = &self.llm {
            return Arc::clone(llm);
        }
        let cfg = &self.config.llm;
        if cfg.provider.eq_ignore_ascii_case("mock") {
            tracing::info!("Using Mock LLM");
            return Arc::new(MockLlmClient);
        }
        let api_key = std::env::var(&cfg.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(env = %cfg.api_key_env, "API key is not set, every request will fail");
        }
        tracing::info!(provider = %cfg.provider, model = %cfg.model, "using OpenAI-compatible LLM");
        Arc::new(OpenAiClient::new(
            cfg.base_url.as_deref(),
            &cfg.model,
            api_key,
            &cfg.api_key_env,
            cfg.request_timeout_secs,
        ))
    }

    /// 内置工具按配置顺序注册，随后是脚本目录中的工具（按文件名排序）
    pub fn build_tool_registry(&self) -> anyhow::Result<ToolRegistry> {
        let mut tools = ToolRegistry::new();

        for name in &self.config.tools.builtin {
            match name.as_str() {
                "gettime" => tools.register(GetTimeTool::new()),
                "myname" => tools.register(MyNameTool::default()),
                "ask_user" => tools.register(AskUserTool::new(Arc::clone(&self.console))),
                "echo" => tools.register(EchoTool),
                other => tracing::warn!(tool = %other, "unknown builtin tool, skipped"),
            }
        }

        if let Some(dir) = &self.config.tools.scripts_dir {
            if dir.is_dir() {
                let scripts = discover_scripts(dir, self.config.tools.tool_timeout_secs)
                    .with_context(|| format!("failed to scan scripts in {}", dir.display()))?;
                for script in scripts {
                    tools.register(script);
                }
            } else {
                tracing::warn!(dir = %dir.display(), "scripts_dir is not a directory, skipped");
            }
        }

        tracing::info!(tools = ?tools.tool_names(), "tool registry built");
        Ok(tools)
    }

    /// 基础 prompt + 空行 + 工具清单
    pub fn build_system_prompt(&self, registry: &ToolRegistry) -> String {
        let base = load_prompt(&self.config.app.system_prompt_path, FALLBACK_SYSTEM_PROMPT);
        format!("{}\n\n{}", base, registry.manifest())
    }

    /// 交互会话
    pub fn build_session(&self) -> anyhow::Result<Orchestrator> {
        let llm = self.build_llm();
        let registry = self.build_tool_registry()?;
        let system_prompt = self.build_system_prompt(&registry);

        let agent = ContextAwareAgent::new(llm, Some(system_prompt), self.config.compaction.settings());
        let dispatcher = ToolDispatcher::new(Arc::new(registry), self.config.tools.tool_timeout_secs);

        Ok(Orchestrator::new(
            agent,
            dispatcher,
            Arc::clone(&self.console),
            TranscriptLog::new(&self.config.app.transcript_path),
            self.config.session_settings(),
        ))
    }

    /// 双 Agent 会话；两方共用同一个 LLM 客户端，各自持有历史
    pub fn build_duet(&self) -> Duet {
        let llm = self.build_llm();
        let duet = &self.config.duet;
        let settings = self.config.compaction.settings();

        let opener = Speaker::new(
            duet.opener_name.clone(),
            ContextAwareAgent::new(
                Arc::clone(&llm),
                Some(load_prompt(&duet.opener_prompt_path, FALLBACK_DUET_PROMPT)),
                settings,
            ),
        );
        let responder = Speaker::new(
            duet.responder_name.clone(),
            ContextAwareAgent::new(
                llm,
                Some(load_prompt(&duet.responder_prompt_path, FALLBACK_DUET_PROMPT)),
                settings,
            ),
        );

        Duet::new(
            opener,
            responder,
            duet.settings(),
            Arc::clone(&self.console),
            TranscriptLog::new(&duet.transcript_path),
        )
    }
}

/// 读取 prompt 文件（去掉首尾空白）；读取失败时使用 fallback
pub fn load_prompt(path: &Path, fallback: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "prompt file unavailable, using built-in prompt");
            fallback.to_string()
        }
    }
}
