//! 工具注册表
//!
//! 启动时一次性注册所有工具单元（内置 + 脚本目录），按注册顺序提取每个工具源注释里的
//! `<RM_AGENT_TOOL>…</RM_AGENT_TOOL>` 描述块，拼成注入 system prompt 的工具清单。
//! 之后只读；没有描述块的工具照样可调用，只是不出现在清单里。

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::core::AgentError;
use crate::tools::ToolCall;

pub const DESCRIPTOR_OPEN: &str = "<RM_AGENT_TOOL>";
pub const DESCRIPTOR_CLOSE: &str = "</RM_AGENT_TOOL>";

static DESCRIPTOR_RE: OnceLock<Regex> = OnceLock::new();

/// 工具 trait：名称、源注释（含描述块）、可调用函数、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名（标签 `<name>` 中的 name）
    fn name(&self) -> &str;

    /// 工具源注释，描述块从这里提取
    fn annotation(&self) -> &str;

    /// 除同名主函数以外的子工具
    fn subtools(&self) -> Vec<String> {
        Vec::new()
    }

    /// 是否提供名为 function 的函数
    fn provides(&self, function: &str) -> bool {
        function == self.name() || self.subtools().iter().any(|s| s == function)
    }

    /// 需要等待用户输入的工具不受执行超时限制
    fn interactive(&self) -> bool {
        false
    }

    /// 调用 function；Err 为工具自身的失败原因
    async fn call(&self, function: &str, argument: &str) -> Result<String, String>;
}

/// 工具描述：启动时提取一次，之后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub subtools: Vec<String>,
    pub description: String,
}

/// 取源文本中第一个描述块的内部文本（原样）
pub fn extract_descriptor_block(source: &str) -> Option<String> {
    let re = DESCRIPTOR_RE.get_or_init(|| {
        let pattern = format!(
            "(?s){}(.*?){}",
            regex::escape(DESCRIPTOR_OPEN),
            regex::escape(DESCRIPTOR_CLOSE)
        );
        Regex::new(&pattern).expect("descriptor pattern")
    });
    re.captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// 工具注册表：注册顺序即发现顺序
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具后注册的覆盖先注册的
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let descriptor = extract_descriptor_block(tool.annotation()).map(|description| {
            ToolDescriptor {
                name: name.clone(),
                subtools: tool.subtools(),
                description,
            }
        });
        if descriptor.is_none() {
            tracing::debug!(tool = %name, "no descriptor block, tool stays undocumented");
        }

        let slot = match self.index.get(&name) {
            Some(&slot) => {
                tracing::warn!(tool = %name, "tool registered twice, replacing");
                self.tools[slot] = tool;
                self.descriptors.retain(|d| d.name != name);
                slot
            }
            None => {
                let slot = self.tools.len();
                self.index.insert(name, slot);
                self.tools.push(tool);
                slot
            }
        };
        if let Some(d) = descriptor {
            // 覆盖时保持原发现位置
            let at = self
                .descriptors
                .iter()
                .take_while(|existing| self.index.get(&existing.name).is_some_and(|&i| i < slot))
                .count();
            self.descriptors.insert(at, d);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// 解析调用：工具不存在或不提供 call.function() 时报错
    pub fn resolve(&self, call: &ToolCall) -> Result<Arc<dyn Tool>, AgentError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;
        if !tool.provides(call.function()) {
            return Err(AgentError::UnknownFunction {
                tool: call.name.clone(),
                function: call.function().to_string(),
            });
        }
        Ok(tool)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// 工具清单：各描述块按发现顺序以换行拼接
    pub fn manifest(&self) -> String {
        self.descriptors
            .iter()
            .map(|d| d.description.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
