//! 工具分派器
//!
//! 持有只读 ToolRegistry 与全局超时：从模型输出解析 ToolCall，逐个（按出现顺序）解析并执行，
//! 任何单个调用的失败（未知工具/函数、工具返回错误、超时、panic）都转成文本结果，
//! 不影响同批次其他调用。每次调用输出结构化审计日志（JSON）。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::time::timeout;

use crate::core::error::panic_message;
use crate::core::AgentError;
use crate::tools::{parse_tool_calls, ToolCall, ToolRegistry};

/// 单个调用的结果
#[derive(Debug)]
pub struct ToolOutcome {
    pub call: ToolCall,
    pub result: Result<String, AgentError>,
}

impl ToolOutcome {
    /// 结果正文；错误渲染为 "Error: ..."
    pub fn text(&self) -> String {
        match &self.result {
            Ok(s) => s.clone(),
            Err(e) => e.render(),
        }
    }

    /// `<label_result>…</label_result>`
    pub fn wrapped(&self) -> String {
        self.call.wrap_result(&self.text())
    }
}

/// 工具分派器：解析 + 执行 + 汇总
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn parse(&self, text: &str) -> Vec<ToolCall> {
        parse_tool_calls(text)
    }

    /// 执行一个调用；交互式工具（等待用户输入）不加超时
    pub async fn execute(&self, call: &ToolCall) -> Result<String, AgentError> {
        let start = Instant::now();
        let result = self.execute_inner(call).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_resolution() => "unresolved",
            Err(AgentError::ToolTimeout { .. }) => "timeout",
            Err(AgentError::ToolPanicked { .. }) => "panic",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.label(),
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.argument),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
    }

    async fn execute_inner(&self, call: &ToolCall) -> Result<String, AgentError> {
        let tool = self.registry.resolve(call)?;
        let fut = AssertUnwindSafe(tool.call(call.function(), &call.argument)).catch_unwind();

        let joined = if tool.interactive() {
            fut.await
        } else {
            timeout(self.timeout, fut)
                .await
                .map_err(|_| AgentError::ToolTimeout {
                    tool: call.label(),
                    secs: self.timeout.as_secs(),
                })?
        };

        match joined {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(reason)) => Err(AgentError::ToolExecutionFailed {
                tool: call.label(),
                reason,
            }),
            Err(payload) => Err(AgentError::ToolPanicked {
                tool: call.label(),
                reason: panic_message(payload.as_ref()),
            }),
        }
    }

    /// 按顺序执行全部调用（不并行，保证结果顺序）
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolOutcome> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.execute(call).await;
            outcomes.push(ToolOutcome {
                call: call.clone(),
                result,
            });
        }
        outcomes
    }
}

/// 拼接所有包装后的结果，作为下一条发给 Agent 的消息
pub fn aggregate(outcomes: &[ToolOutcome]) -> String {
    outcomes.iter().map(ToolOutcome::wrapped).collect()
}

fn args_preview(args: &str) -> String {
    if args.chars().count() > 200 {
        format!("{}...", args.chars().take(200).collect::<String>())
    } else {
        args.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{EchoTool, GetTimeTool, MyNameTool, Tool};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct Exploding;

    #[async_trait]
    impl Tool for Exploding {
        fn name(&self) -> &str {
            "boom"
        }
        fn annotation(&self) -> &str {
            ""
        }
        async fn call(&self, function: &str, _argument: &str) -> Result<String, String> {
            if function == "boom" {
                panic!("kaboom");
            }
            Err("never".to_string())
        }
        fn subtools(&self) -> Vec<String> {
            vec!["fail".to_string()]
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        fn annotation(&self) -> &str {
            ""
        }
        async fn call(&self, _function: &str, _argument: &str) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn dispatcher() -> ToolDispatcher {
        let t = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(GetTimeTool::at(t));
        registry.register(MyNameTool::new("Agent", "Alias"));
        registry.register(EchoTool);
        registry.register(Exploding);
        registry.register(Slow);
        ToolDispatcher::new(Arc::new(registry), 1)
    }

    #[tokio::test]
    async fn test_gettime_result_wrapping() {
        let d = dispatcher();
        let calls = d.parse("<gettime></gettime>");
        let outcomes = d.execute_all(&calls).await;
        assert_eq!(
            aggregate(&outcomes),
            "<gettime_result>2024-01-01 00:00:00</gettime_result>"
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_stop_siblings() {
        let d = dispatcher();
        let calls = d.parse("<weather>tokyo</weather> and <echo>still here</echo>");
        let outcomes = d.execute_all(&calls).await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].result, Err(AgentError::UnknownTool(_))));
        assert_eq!(
            aggregate(&outcomes),
            "<weather_result>Error: tool 'weather' not found</weather_result>\
             <echo_result>still here</echo_result>"
        );
    }

    #[tokio::test]
    async fn test_qualified_call_and_unknown_subtool() {
        let d = dispatcher();
        let calls = d.parse("<myname.anothername></myname.anothername><myname.nick></myname.nick>");
        let outcomes = d.execute_all(&calls).await;
        assert_eq!(
            outcomes[0].wrapped(),
            "<myname.anothername_result>Alias</myname.anothername_result>"
        );
        assert!(matches!(
            outcomes[1].result,
            Err(AgentError::UnknownFunction { .. })
        ));
        assert!(outcomes[1].wrapped().starts_with("<myname.nick_result>Error: "));
    }

    #[tokio::test]
    async fn test_panic_and_failure_are_contained() {
        let d = dispatcher();
        let calls = d.parse("<boom></boom><boom.fail></boom.fail><echo>ok</echo>");
        let outcomes = d.execute_all(&calls).await;
        assert!(matches!(
            &outcomes[0].result,
            Err(AgentError::ToolPanicked { reason, .. }) if reason == "kaboom"
        ));
        assert!(matches!(
            &outcomes[1].result,
            Err(AgentError::ToolExecutionFailed { reason, .. }) if reason == "never"
        ));
        assert_eq!(outcomes[2].text(), "ok");
    }

    #[tokio::test]
    async fn test_timeout_is_an_error_result() {
        let d = dispatcher();
        let outcome = d.execute(&ToolCall::plain("slow", "")).await;
        assert!(matches!(outcome, Err(AgentError::ToolTimeout { secs: 1, .. })));
    }

    #[test]
    fn test_aggregate_of_nothing_is_empty() {
        assert_eq!(aggregate(&[]), "");
    }
}
