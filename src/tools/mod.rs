//! 工具层：标签式调用协议的解析、注册表与分派，以及内置工具

pub mod ask_user;
pub mod dispatcher;
pub mod echo;
pub mod gettime;
pub mod markup;
pub mod myname;
pub mod registry;
pub mod script;

pub use ask_user::AskUserTool;
pub use dispatcher::{aggregate, ToolDispatcher, ToolOutcome};
pub use echo::EchoTool;
pub use gettime::{GetTimeTool, TIME_FORMAT};
pub use markup::{parse_tool_calls, ToolCall};
pub use myname::MyNameTool;
pub use registry::{extract_descriptor_block, Tool, ToolDescriptor, ToolRegistry};
pub use script::{discover_scripts, ScriptTool};
