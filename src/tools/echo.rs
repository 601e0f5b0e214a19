//! Echo 工具（测试用）

use async_trait::async_trait;

use crate::tools::Tool;

const ANNOTATION: &str = "<RM_AGENT_TOOL>
Tool Name: echo
Description: Returns its input unchanged (for testing).
Input: any text
Output: the same text
</RM_AGENT_TOOL>";

/// Echo 工具：回显参数
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn annotation(&self) -> &str {
        ANNOTATION
    }

    async fn call(&self, _function: &str, argument: &str) -> Result<String, String> {
        Ok(argument.to_string())
    }
}
