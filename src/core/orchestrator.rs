//! 交互会话主控循环
//!
//! 三态机：AwaitUser 读取用户输入（退出关键字 / `/summary` 命令 / 普通消息），
//! AgentTurn 把待发送消息交给 Agent，回复中出现会话结束标记则终止，
//! 解析出工具调用则执行并把汇总结果作为下一条消息，直接再次进入 AgentTurn。
//! 每一步都与中断 token 竞争；无论以何种方式结束，转录都会写盘。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::agent::{ContextAwareAgent, Conversant};
use crate::core::error::panic_message;
use crate::core::{EndReason, SessionPhase, SessionReport};
use crate::memory::TranscriptLog;
use crate::tools::{aggregate, ToolDispatcher};
use crate::ui::Console;

/// 会话结束标记
pub const SESSION_MARKER: &str = "<<END>>";

const USER_PROMPT: &str = "\nYou: ";
const SUMMARY_COMMAND: &str = "/summary";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub exit_keyword: String,
    pub session_marker: String,
    /// `/summary` 不带参数时的目标长度
    pub default_target_length: usize,
    /// 历史消息数超过该值时在 Agent 回合前自动压缩；0 关闭
    pub auto_threshold_messages: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            exit_keyword: "exit".to_string(),
            session_marker: SESSION_MARKER.to_string(),
            default_target_length: 100,
            auto_threshold_messages: 0,
        }
    }
}

/// 用户输入的解释结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum UserInput {
    Exit,
    Summary(Result<usize, String>),
    Message(String),
}

pub struct Orchestrator {
    agent: ContextAwareAgent,
    dispatcher: ToolDispatcher,
    console: Arc<dyn Console>,
    transcript: TranscriptLog,
    settings: SessionSettings,
    phase: SessionPhase,
    pending: String,
    turns: usize,
}

impl Orchestrator {
    pub fn new(
        agent: ContextAwareAgent,
        dispatcher: ToolDispatcher,
        console: Arc<dyn Console>,
        transcript: TranscriptLog,
        settings: SessionSettings,
    ) -> Self {
        Self {
            agent,
            dispatcher,
            console,
            transcript,
            settings,
            phase: SessionPhase::AwaitUser,
            pending: String::new(),
            turns: 0,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn agent(&self) -> &ContextAwareAgent {
        &self.agent
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    /// 运行到终态，然后写出转录
    pub async fn run(&mut self, cancel: CancellationToken) -> anyhow::Result<SessionReport> {
        self.console.show(&format!(
            "Conversation started. Type '{}' to quit.",
            self.settings.exit_keyword
        ));

        while !self.phase.is_terminated() {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = AssertUnwindSafe(self.step()).catch_unwind() => Some(next),
            };
            let next = match next {
                None => SessionPhase::Terminated(EndReason::Interrupted),
                Some(Ok(next)) => next,
                Some(Err(payload)) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(error = %message, "session step panicked");
                    SessionPhase::Terminated(EndReason::Failed(message))
                }
            };
            if next != self.phase {
                tracing::debug!(from = ?self.phase, to = ?next, "session transition");
            }
            self.phase = next;
        }

        let reason = match &self.phase {
            SessionPhase::Terminated(reason) => reason.clone(),
            _ => EndReason::Interrupted,
        };
        match reason {
            EndReason::Interrupted => self.console.show("\nConversation interrupted."),
            EndReason::SessionMarker => self.console.show("The agent ended the conversation."),
            EndReason::Failed(ref message) => {
                self.console.show(&format!("\nConversation aborted: {}", message))
            }
            _ => self.console.show("Conversation ended."),
        }
        tracing::info!(reason = %reason, turns = self.turns, "session terminated");
        if let Some((prompt, completion, total)) = self.agent.llm().token_usage() {
            tracing::info!(prompt, completion, total, "token usage");
        }

        self.transcript.save()?;
        Ok(SessionReport {
            reason,
            turns: self.turns,
            transcript_lines: self.transcript.lines().len(),
        })
    }

    async fn step(&mut self) -> SessionPhase {
        match self.phase.clone() {
            SessionPhase::AwaitUser => self.await_user().await,
            SessionPhase::AgentTurn => self.agent_turn().await,
            terminated @ SessionPhase::Terminated(_) => terminated,
        }
    }

    async fn await_user(&mut self) -> SessionPhase {
        let Some(line) = self.console.read_line(USER_PROMPT).await else {
            return SessionPhase::Terminated(EndReason::InputClosed);
        };

        match interpret(&line, &self.settings.exit_keyword) {
            UserInput::Exit => SessionPhase::Terminated(EndReason::ExitKeyword),
            UserInput::Summary(Ok(target)) => {
                let target = if target == 0 {
                    self.settings.default_target_length
                } else {
                    target
                };
                self.summarize(target).await;
                SessionPhase::AwaitUser
            }
            UserInput::Summary(Err(raw)) => {
                self.console
                    .show(&format!("usage: {SUMMARY_COMMAND} [length] (got '{raw}')"));
                SessionPhase::AwaitUser
            }
            UserInput::Message(message) => {
                self.transcript.push(format!("User: {message}"));
                self.pending = message;
                SessionPhase::AgentTurn
            }
        }
    }

    async fn agent_turn(&mut self) -> SessionPhase {
        let threshold = self.settings.auto_threshold_messages;
        if threshold > 0 && self.agent.history().len() > threshold {
            tracing::info!(
                messages = self.agent.history().len(),
                threshold,
                "history over threshold, compacting"
            );
            if let Err(e) = self.agent.cleanup(self.settings.default_target_length).await {
                tracing::warn!(error = %e, "automatic compaction failed, keeping history");
            }
        }

        let outbound = std::mem::take(&mut self.pending);
        let reply = self.agent.reply(&outbound).await;
        self.turns += 1;

        let marker = self.settings.session_marker.as_str();
        if !marker.is_empty() && reply.contains(marker) {
            let shown = reply.replace(marker, "");
            self.console.show(&format!("\nAI: {shown}"));
            self.transcript.push(format!("AI: {shown}"));
            return SessionPhase::Terminated(EndReason::SessionMarker);
        }

        self.console.show(&format!("\nAI: {reply}"));
        self.transcript.push(format!("AI: {reply}"));

        let calls = self.dispatcher.parse(&reply);
        if calls.is_empty() {
            return SessionPhase::AwaitUser;
        }

        tracing::info!(count = calls.len(), "executing tool calls");
        let outcomes = self.dispatcher.execute_all(&calls).await;
        for outcome in &outcomes {
            let line = format!("[tool] {} -> {}", outcome.call.label(), outcome.text());
            self.console.show(&line);
            self.transcript.push(line);
        }
        self.pending = aggregate(&outcomes);
        SessionPhase::AgentTurn
    }

    async fn summarize(&mut self, target_length: usize) {
        match self.agent.cleanup(target_length).await {
            Ok(Some(outcome)) => {
                self.console.show(&format!(
                    "summary ({} chars, target {}): {}",
                    outcome.length, outcome.target_length, outcome.summary
                ));
            }
            Ok(None) => self.console.show("no summary"),
            Err(e) => self.console.show(&e.render()),
        }
    }
}

fn interpret(line: &str, exit_keyword: &str) -> UserInput {
    let trimmed = line.trim();
    if trimmed.to_lowercase() == exit_keyword.to_lowercase() {
        return UserInput::Exit;
    }
    if let Some(rest) = trimmed.strip_prefix(SUMMARY_COMMAND) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let arg = rest.trim();
            if arg.is_empty() {
                return UserInput::Summary(Ok(0));
            }
            return UserInput::Summary(
                arg.parse::<usize>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| arg.to_string()),
            );
        }
    }
    UserInput::Message(line.to_string())
}
