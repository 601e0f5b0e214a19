//! 上下文压缩
//!
//! 用一个无 system prompt、无历史的辅助 Agent 把对话记录摘要到约 target_length 个字符：
//! 首次回复作为候选；偏差 |len - target| / target 超过容差时要求缩短或扩写，
//! 最多调整 max_rounds 轮。超出上限时返回最接近目标的候选并记录警告，不报错。

use std::sync::Arc;

use crate::agent::{ChatAgent, Conversant};
use crate::core::AgentError;
use crate::llm::LlmClient;

pub const DEFAULT_TOLERANCE: f64 = 0.30;
pub const DEFAULT_MAX_ROUNDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionSettings {
    /// 允许的相对偏差
    pub tolerance: f64,
    /// 首次摘要之后最多追加的调整轮数
    pub max_rounds: usize,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// 一次压缩的结果
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOutcome {
    pub summary: String,
    /// 摘要字符数
    pub length: usize,
    pub target_length: usize,
    /// 实际进行的调整轮数
    pub rounds: usize,
    /// false 表示达到轮数上限仍未进入容差
    pub converged: bool,
}

/// 相对偏差
pub fn deviation(length: usize, target_length: usize) -> f64 {
    let target = target_length.max(1) as f64;
    (length as f64 - target).abs() / target
}

fn summarize_prompt(transcript: &str, target_length: usize) -> String {
    format!(
        "Summarize the following conversation in about {target_length} characters.\n\
         The summary must keep the important points and enough context to continue the conversation.\n\
         Make it clear which statements were mine and which were yours.\n\
         \n\
         Conversation:\n\
         {transcript}\n\
         \n\
         Summary length: about {target_length} characters\n"
    )
}

fn adjust_prompt(summary: &str, length: usize, target_length: usize) -> String {
    let direction = if length > target_length {
        "Make it shorter"
    } else {
        "Make it more detailed"
    };
    format!(
        "The previous summary was {length} characters long.\n\
         The target is {target_length} characters.\n\
         {direction} and summarize again.\n\
         \n\
         Previous summary:\n\
         {summary}\n"
    )
}

/// 压缩引擎：每次 summarize 都新建辅助 Agent
pub struct CompressionEngine {
    llm: Arc<dyn LlmClient>,
    settings: CompressionSettings,
}

impl CompressionEngine {
    pub fn new(llm: Arc<dyn LlmClient>, settings: CompressionSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> CompressionSettings {
        self.settings
    }

    /// 摘要 transcript；辅助 Agent 的任何错误直接返回，不产生摘要
    pub async fn summarize(
        &self,
        transcript: &str,
        target_length: usize,
    ) -> Result<CompressionOutcome, AgentError> {
        let target_length = target_length.max(1);
        let mut helper = ChatAgent::new(Arc::clone(&self.llm));

        let mut candidate = helper
            .respond(&summarize_prompt(transcript, target_length))
            .await?;
        let mut best = candidate.clone();
        let mut rounds = 0;

        loop {
            let length = candidate.chars().count();
            if deviation(length, target_length) <= self.settings.tolerance {
                return Ok(CompressionOutcome {
                    length,
                    summary: candidate,
                    target_length,
                    rounds,
                    converged: true,
                });
            }
            if rounds >= self.settings.max_rounds {
                let length = best.chars().count();
                tracing::warn!(
                    target_length,
                    length,
                    rounds,
                    "summary did not converge to target length, using closest candidate"
                );
                return Ok(CompressionOutcome {
                    length,
                    summary: best,
                    target_length,
                    rounds,
                    converged: false,
                });
            }

            rounds += 1;
            tracing::debug!(length, target_length, round = rounds, "adjusting summary length");
            candidate = helper
                .respond(&adjust_prompt(&candidate, length, target_length))
                .await?;
            if deviation(candidate.chars().count(), target_length)
                < deviation(best.chars().count(), target_length)
            {
                best = candidate.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::memory::Role;

    fn engine(llm: Arc<ScriptedLlmClient>, max_rounds: usize) -> CompressionEngine {
        CompressionEngine::new(
            llm,
            CompressionSettings {
                tolerance: DEFAULT_TOLERANCE,
                max_rounds,
            },
        )
    }

    #[tokio::test]
    async fn test_first_reply_within_tolerance() {
        let llm = Arc::new(ScriptedLlmClient::new(["x".repeat(110)]));
        let outcome = engine(llm.clone(), 5).summarize("User: hi\n\n", 100).await.unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.length, 110);

        let request = &llm.requests()[0];
        assert_eq!(request.len(), 1);
        assert_eq!(request[0].role, Role::User);
        assert!(request[0].content.contains("User: hi"));
        assert!(request[0].content.contains("about 100 characters"));
    }

    #[tokio::test]
    async fn test_adjusts_in_the_right_direction() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "x".repeat(300),
            "y".repeat(20),
            "z".repeat(95),
        ]));
        let outcome = engine(llm.clone(), 5).summarize("t", 100).await.unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.summary, "z".repeat(95));

        let requests = llm.requests();
        // 辅助 Agent 保留自己的历史
        assert_eq!(requests[1].len(), 3);
        assert!(requests[1][2].content.contains("Make it shorter"));
        assert!(requests[2][4].content.contains("Make it more detailed"));
    }

    #[tokio::test]
    async fn test_ceiling_returns_closest_candidate() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "a".repeat(500),
            "b".repeat(10),
            "c".repeat(180),
            "d".repeat(400),
        ]));
        let outcome = engine(llm.clone(), 3).summarize("t", 100).await.unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.summary, "c".repeat(180));
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn test_helper_error_is_returned() {
        let llm = Arc::new(ScriptedLlmClient::with_results([Err(LlmError::Transport(
            "down".to_string(),
        ))]));
        let err = engine(llm, 3).summarize("t", 100).await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
    }

    #[tokio::test]
    async fn test_tolerance_or_ceiling_for_random_lengths() {
        for seed in 1..=40u64 {
            for target in [1usize, 7, 50, 100, 333] {
                let state = std::sync::Mutex::new(seed);
                let llm = Arc::new(ScriptedLlmClient::responder(move |_| {
                    let mut s = state.lock().unwrap();
                    *s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let len = ((*s >> 33) % 800) as usize;
                    Ok("w".repeat(len))
                }));
                let outcome = engine(llm.clone(), 4).summarize("t", target).await.unwrap();
                let dev = deviation(outcome.length, target);
                assert!(
                    dev <= DEFAULT_TOLERANCE || outcome.rounds == 4,
                    "seed {seed} target {target}: dev {dev} rounds {}",
                    outcome.rounds
                );
                assert_eq!(outcome.converged, dev <= DEFAULT_TOLERANCE);
                assert!(llm.call_count() <= 5);
            }
        }
    }
}
