//! 控制台：会话与 ask_user 工具共用的输入 / 输出通道
//!
//! Terminal 读 stdin、写 stdout；ScriptedConsole 用预设输入驱动会话并记录输出（测试用）。
//! 两者都只在单个会话内顺序使用，读写不会重叠。

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use async_trait::async_trait;

/// 输入 / 输出通道；read_line 返回 None 表示输入结束（EOF）
#[async_trait]
pub trait Console: Send + Sync {
    async fn read_line(&self, prompt: &str) -> Option<String>;

    fn show(&self, text: &str);
}

/// 标准输入输出
#[derive(Debug, Default)]
pub struct Terminal;

#[async_trait]
impl Console for Terminal {
    async fn read_line(&self, prompt: &str) -> Option<String> {
        if !prompt.is_empty() {
            let mut out = std::io::stdout();
            let _ = write!(out, "{}", prompt);
            let _ = out.flush();
        }
        // stdin 只能阻塞读取，放到 blocking 线程
        let line = tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            match std::io::stdin().lock().read_line(&mut buf) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(buf),
            }
        })
        .await
        .ok()
        .flatten()?;
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn show(&self, text: &str) {
        println!("{}", text);
    }
}

/// 预设输入的控制台
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: Mutex<VecDeque<String>>,
    shown: Mutex<Vec<String>>,
    prompts: Mutex<usize>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: Mutex::new(inputs.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 已展示的全部文本
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// read_line 被调用的次数（含输入耗尽后的调用）
    pub fn reads(&self) -> usize {
        self.prompts.lock().map(|p| *p).unwrap_or(0)
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&self, _prompt: &str) -> Option<String> {
        if let Ok(mut p) = self.prompts.lock() {
            *p += 1;
        }
        self.inputs.lock().ok().and_then(|mut q| q.pop_front())
    }

    fn show(&self, text: &str) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_console_replays_inputs() {
        let console = ScriptedConsole::new(["a", "b"]);
        assert_eq!(console.read_line("> ").await.as_deref(), Some("a"));
        console.show("shown");
        assert_eq!(console.read_line("> ").await.as_deref(), Some("b"));
        assert_eq!(console.read_line("> ").await, None);
        assert_eq!(console.reads(), 3);
        assert_eq!(console.shown(), vec!["shown".to_string()]);
    }
}
