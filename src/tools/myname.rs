//! myname：Agent 的名字与别名

use async_trait::async_trait;

use crate::tools::Tool;

const ANNOTATION: &str = "<RM_AGENT_TOOL>
Tool Name: myname
Description: Holds the agent's own name.
Subtools:
  - myname: returns the usual name
  - anothername: returns the alias
Input: None
Output: the agent's name
</RM_AGENT_TOOL>";

/// 名字工具：`<myname>` 返回名字，`<myname.anothername>` 返回别名
#[derive(Debug, Clone)]
pub struct MyNameTool {
    name: String,
    alias: String,
}

impl MyNameTool {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

impl Default for MyNameTool {
    fn default() -> Self {
        Self::new("Parley", "Eiji Endo")
    }
}

#[async_trait]
impl Tool for MyNameTool {
    fn name(&self) -> &str {
        "myname"
    }

    fn annotation(&self) -> &str {
        ANNOTATION
    }

    fn subtools(&self) -> Vec<String> {
        vec!["anothername".to_string()]
    }

    async fn call(&self, function: &str, _argument: &str) -> Result<String, String> {
        match function {
            "myname" => Ok(self.name.clone()),
            "anothername" => Ok(self.alias.clone()),
            other => Err(format!("no function '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_name_and_alias() {
        let tool = MyNameTool::new("Agent", "Alias");
        assert_eq!(tool.call("myname", "").await.unwrap(), "Agent");
        assert_eq!(tool.call("anothername", "").await.unwrap(), "Alias");
        assert!(tool.provides("anothername"));
        assert!(!tool.provides("thirdname"));
    }
}
