//! 工具调用标记解析
//!
//! 模型输出中的工具调用形如：
//!
//! ```text
//! span      := open ARGUMENT close
//! open      := "<" head ">"
//! close     := "</" head ">"          (head 必须与 open 完全一致)
//! head      := ident | ident "." ident
//! ident     := [A-Za-z0-9_]+
//! ```
//!
//! ARGUMENT 为任意文本（可跨行），取到第一个匹配的 close 为止（非贪婪）。
//! 从左到右扫描，匹配成功后从 close 之后继续，因此各 span 互不重叠；
//! 不完整或不匹配的标签（如 `<a>x</b>`）只是普通文本，不报错。

/// 一次工具调用；subtool 仅在 `<name.subtool>` 形式时存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub subtool: Option<String>,
    pub argument: String,
}

impl ToolCall {
    pub fn plain(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subtool: None,
            argument: argument.into(),
        }
    }

    pub fn qualified(
        name: impl Into<String>,
        subtool: impl Into<String>,
        argument: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            subtool: Some(subtool.into()),
            argument: argument.into(),
        }
    }

    /// 标签头：`name` 或 `name.subtool`
    pub fn label(&self) -> String {
        match &self.subtool {
            Some(sub) => format!("{}.{}", self.name, sub),
            None => self.name.clone(),
        }
    }

    /// 实际要调用的函数名：有 subtool 用 subtool，否则与工具同名
    pub fn function(&self) -> &str {
        self.subtool.as_deref().unwrap_or(&self.name)
    }

    /// 把结果包成 `<label_result>…</label_result>`
    pub fn wrap_result(&self, body: &str) -> String {
        let label = self.label();
        format!("<{label}_result>{body}</{label}_result>")
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// 从 `bytes[start..]` 读一个 ident，返回结束位置
fn ident_end(bytes: &[u8], start: usize) -> Option<usize> {
    let len = bytes[start..].iter().take_while(|b| is_ident_byte(**b)).count();
    (len > 0).then_some(start + len)
}

/// 解析位于 `lt` 的开标签，成功时返回 (name, subtool, 开标签之后的位置)
fn open_tag(text: &str, lt: usize) -> Option<(&str, Option<&str>, usize)> {
    let bytes = text.as_bytes();
    let name_end = ident_end(bytes, lt + 1)?;
    let name = &text[lt + 1..name_end];
    match bytes.get(name_end)? {
        b'>' => Some((name, None, name_end + 1)),
        b'.' => {
            let sub_end = ident_end(bytes, name_end + 1)?;
            if bytes.get(sub_end) != Some(&b'>') {
                return None;
            }
            Some((name, Some(&text[name_end + 1..sub_end]), sub_end + 1))
        }
        _ => None,
    }
}

/// 提取文本中所有合法的工具调用，按出现顺序返回
pub fn parse_tool_calls(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('<') {
        let lt = pos + offset;
        let Some((name, subtool, body_start)) = open_tag(text, lt) else {
            pos = lt + 1;
            continue;
        };

        let close = match subtool {
            Some(sub) => format!("</{name}.{sub}>"),
            None => format!("</{name}>"),
        };
        match text[body_start..].find(&close) {
            Some(len) => {
                let argument = &text[body_start..body_start + len];
                calls.push(ToolCall {
                    name: name.to_string(),
                    subtool: subtool.map(str::to_string),
                    argument: argument.to_string(),
                });
                pos = body_start + len + close.len();
            }
            None => pos = lt + 1,
        }
    }

    calls
}
