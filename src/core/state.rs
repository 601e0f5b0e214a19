//! 会话状态：交互会话的三态机与双 Agent 会话的轮次状态
//!
//! Orchestrator 只在 AwaitUser / AgentTurn 之间推进，Terminated 是唯一终态。

use std::fmt;

use serde::Serialize;

/// 交互会话阶段
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// 等待用户输入
    AwaitUser,
    /// 把待发送消息交给 Agent
    AgentTurn,
    Terminated(EndReason),
}

impl SessionPhase {
    pub fn is_terminated(&self) -> bool {
        matches!(self, SessionPhase::Terminated(_))
    }
}

/// 会话结束原因；都不是错误
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// 用户输入了退出关键字
    ExitKeyword,
    /// Agent 回复中出现会话结束标记
    SessionMarker,
    /// 双 Agent 会话中某条消息以结束标记收尾
    EndMarker,
    /// 双 Agent 会话达到最大轮数
    TurnCeiling,
    /// 输入流结束（EOF）
    InputClosed,
    /// 用户中断（Ctrl+C）
    Interrupted,
    /// 会话边界处捕获到的意外故障（panic），附消息
    Failed(String),
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndReason::ExitKeyword => "exit keyword",
            EndReason::SessionMarker => "session marker",
            EndReason::EndMarker => "end marker",
            EndReason::TurnCeiling => "turn ceiling reached",
            EndReason::InputClosed => "input closed",
            EndReason::Interrupted => "interrupted",
            EndReason::Failed(reason) => return write!(f, "failed: {reason}"),
        };
        f.write_str(s)
    }
}

/// 轮次状态：当前发言者、待发送消息、已完成的轮数
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TurnState {
    pub speaker: String,
    pub pending_message: String,
    pub turn_count: usize,
}

impl TurnState {
    pub fn new(speaker: impl Into<String>, pending_message: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            pending_message: pending_message.into(),
            turn_count: 0,
        }
    }

    /// 完成一次交换：回复成为对方的待发送消息，发言者切换
    pub fn advance(&mut self, next_speaker: impl Into<String>, reply: impl Into<String>) {
        self.speaker = next_speaker.into();
        self.pending_message = reply.into();
        self.turn_count += 1;
    }
}

/// 会话结束时的报告
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub reason: EndReason,
    /// Agent 交换次数（含工具结果回送）
    pub turns: usize,
    /// 写入的转录行数
    pub transcript_lines: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_state_advance() {
        let mut state = TurnState::new("Professor", "hello");
        state.advance("Student", "hi");
        assert_eq!(state.speaker, "Student");
        assert_eq!(state.pending_message, "hi");
        assert_eq!(state.turn_count, 1);
    }

    #[test]
    fn test_only_terminated_is_terminal() {
        assert!(!SessionPhase::AwaitUser.is_terminated());
        assert!(!SessionPhase::AgentTurn.is_terminated());
        assert!(SessionPhase::Terminated(EndReason::TurnCeiling).is_terminated());
        assert_eq!(EndReason::TurnCeiling.to_string(), "turn ceiling reached");
        assert_eq!(
            EndReason::Failed("boom".to_string()).to_string(),
            "failed: boom"
        );
    }
}
