//! ask_user：向用户提问并把回答作为工具结果返回

use std::sync::Arc;

use async_trait::async_trait;

use crate::tools::Tool;
use crate::ui::Console;

const ANNOTATION: &str = "<RM_AGENT_TOOL>
Tool Name: ask_user
Description: Asks the user a question or talks to them directly.
Input: the question or message for the user
Output: the user's answer
</RM_AGENT_TOOL>";

pub struct AskUserTool {
    console: Arc<dyn Console>,
}

impl AskUserTool {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self { console }
    }
}

#[async_trait]
impl Tool for AskUserTool {
    fn name(&self) -> &str {
        "ask_user"
    }

    fn annotation(&self) -> &str {
        ANNOTATION
    }

    fn interactive(&self) -> bool {
        true
    }

    async fn call(&self, _function: &str, argument: &str) -> Result<String, String> {
        self.console.show(argument);
        self.console
            .read_line("")
            .await
            .ok_or_else(|| "no answer: input closed".to_string())
    }
}
