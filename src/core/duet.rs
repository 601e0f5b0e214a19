//! 双 Agent 会话
//!
//! 没有人类用户：两个 ContextAwareAgent 轮流把对方的回复当作自己的输入。
//! 回复以结束标记收尾（忽略尾部空白）时自然结束；达到 max_turns 是正常结束，不是错误。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::agent::{ContextAwareAgent, Conversant};
use crate::core::error::panic_message;
use crate::core::{EndReason, SessionReport, TurnState};
use crate::memory::TranscriptLog;
use crate::ui::Console;

pub const END_MARKER: &str = "<end>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuetSettings {
    pub max_turns: usize,
    /// 两次交换之间的停顿，只影响观感
    pub turn_delay: Duration,
    pub end_marker: String,
}

impl Default for DuetSettings {
    fn default() -> Self {
        Self {
            max_turns: 20,
            turn_delay: Duration::from_millis(1000),
            end_marker: END_MARKER.to_string(),
        }
    }
}

/// 一位发言者
pub struct Speaker {
    pub name: String,
    pub agent: ContextAwareAgent,
}

impl Speaker {
    pub fn new(name: impl Into<String>, agent: ContextAwareAgent) -> Self {
        Self {
            name: name.into(),
            agent,
        }
    }
}

/// 回复以 marker 结尾时返回去掉标记后的文本
pub fn strip_end_marker(reply: &str, marker: &str) -> Option<String> {
    if marker.is_empty() {
        return None;
    }
    reply
        .trim_end()
        .strip_suffix(marker)
        .map(|rest| rest.trim_end().to_string())
}

pub struct Duet {
    /// [0] 说出开场白的一方，[1] 先回复的一方
    speakers: [Speaker; 2],
    settings: DuetSettings,
    console: Arc<dyn Console>,
    transcript: TranscriptLog,
}

impl Duet {
    pub fn new(
        opener: Speaker,
        responder: Speaker,
        settings: DuetSettings,
        console: Arc<dyn Console>,
        transcript: TranscriptLog,
    ) -> Self {
        Self {
            speakers: [opener, responder],
            settings,
            console,
            transcript,
        }
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    pub fn speaker(&self, index: usize) -> Option<&Speaker> {
        self.speakers.get(index)
    }

    fn record(&mut self, speaker: &str, message: &str) {
        let line = format!("{speaker}: {message}");
        self.console.show(&format!("\n{line}"));
        self.transcript.push(line);
    }

    /// 由开场方说出 opening_message，然后交替发言直到结束；结束后写出转录
    pub async fn run(
        &mut self,
        opening_message: &str,
        cancel: CancellationToken,
    ) -> anyhow::Result<SessionReport> {
        let mut state = TurnState::new(self.speakers[0].name.clone(), opening_message);
        let mut current = 0usize;
        let opener = self.speakers[0].name.clone();
        self.record(&opener, opening_message);

        let reason = loop {
            if state.turn_count >= self.settings.max_turns {
                break EndReason::TurnCeiling;
            }
            let next = 1 - current;
            let next_name = self.speakers[next].name.clone();
            self.console.show(&format!("\n{next_name} is thinking..."));

            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                reply = AssertUnwindSafe(self.speakers[next].agent.reply(&state.pending_message))
                    .catch_unwind() => Some(reply),
            };
            let reply = match reply {
                None => break EndReason::Interrupted,
                Some(Ok(reply)) => reply,
                Some(Err(payload)) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(speaker = %next_name, error = %message, "duet turn panicked");
                    break EndReason::Failed(message);
                }
            };

            if let Some(closing) = strip_end_marker(&reply, &self.settings.end_marker) {
                self.record(&next_name, &closing);
                state.advance(next_name, closing);
                break EndReason::EndMarker;
            }

            self.record(&next_name, &reply);
            state.advance(next_name, reply);
            current = next;
            tracing::debug!(turn = state.turn_count, speaker = %state.speaker, "duet exchange");

            if state.turn_count < self.settings.max_turns && !self.settings.turn_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break EndReason::Interrupted,
                    _ = tokio::time::sleep(self.settings.turn_delay) => {}
                }
            }
        };

        match reason {
            EndReason::EndMarker => self.console.show("\nThe conversation came to a natural end."),
            EndReason::TurnCeiling => self.console.show(&format!(
                "\nThe conversation reached {} turns and was stopped.",
                self.settings.max_turns
            )),
            EndReason::Failed(ref message) => {
                self.console.show(&format!("\nThe conversation was aborted: {}", message))
            }
            _ => self.console.show("\nThe conversation was interrupted."),
        }
        tracing::info!(reason = %reason, turns = state.turn_count, "duet finished");
        for speaker in &self.speakers {
            if let Some((prompt, completion, total)) = speaker.agent.llm().token_usage() {
                tracing::info!(speaker = %speaker.name, prompt, completion, total, "token usage");
            }
        }

        self.transcript.save()?;
        Ok(SessionReport {
            reason,
            turns: state.turn_count,
            transcript_lines: self.transcript.lines().len(),
        })
    }
}
