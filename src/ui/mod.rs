//! 交互层：控制台输入输出

pub mod console;

pub use console::{Console, ScriptedConsole, Terminal};
