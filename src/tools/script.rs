//! 脚本工具：扫描 [tools].scripts_dir 下的可执行文件注册为工具
//!
//! 工具名取文件名（不含扩展名），描述块从文件内容中提取；
//! 调用时无 shell，直接执行 `<file> <function> <argument>`，stdout 为结果，带超时与日志。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::tools::Tool;

/// 目录中的一个脚本
pub struct ScriptTool {
    name: String,
    path: PathBuf,
    source: String,
    timeout_secs: u64,
}

impl ScriptTool {
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>, source: String, timeout_secs: u64) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            source,
            timeout_secs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_tool_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// 按文件名排序扫描目录；隐藏文件、子目录跳过，文件名不是合法标签名的也跳过
pub fn discover_scripts(dir: &Path, timeout_secs: u64) -> anyhow::Result<Vec<ScriptTool>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let tools = load_scripts(entries, timeout_secs);
    tracing::info!(dir = %dir.display(), count = tools.len(), "discovered script tools");
    Ok(tools)
}

/// 逐个读取脚本；单个文件读取失败只告警跳过，不影响其余工具
fn load_scripts(paths: Vec<PathBuf>, timeout_secs: u64) -> Vec<ScriptTool> {
    let mut tools = Vec::new();
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with('.') {
            continue;
        }
        if !is_tool_name(stem) {
            tracing::warn!(path = %path.display(), "script name is not a valid tag name, skipped");
            continue;
        }
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "script unreadable, skipped");
                continue;
            }
        };
        let source = String::from_utf8_lossy(&bytes).into_owned();
        tools.push(ScriptTool::new(stem, &path, source, timeout_secs));
    }
    tools
}

#[async_trait]
impl Tool for ScriptTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn annotation(&self) -> &str {
        &self.source
    }

    /// 子函数由脚本自行分派
    fn provides(&self, _function: &str) -> bool {
        true
    }

    async fn call(&self, function: &str, argument: &str) -> Result<String, String> {
        tracing::info!(tool = %self.name, function = %function, "script tool invoke");
        let child = Command::new(&self.path)
            .arg(function)
            .arg(argument)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("script spawn failed: {}", e))?;
        let timeout = Duration::from_secs(self.timeout_secs);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("script timeout after {}s", self.timeout_secs))?
            .map_err(|e| format!("script wait failed: {}", e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(format!(
                "exit {:?}: stderr {}",
                output.status.code(),
                stderr.trim()
            ));
        }
        Ok(stdout.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("weather.sh"),
            "#!/bin/sh\n# <RM_AGENT_TOOL>\n# Tool Name: weather\n# </RM_AGENT_TOOL>\necho sunny\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("alpha.py"), "print('no block')\n").unwrap();
        std::fs::write(dir.path().join("bad-name.sh"), "echo\n").unwrap();
        std::fs::write(dir.path().join(".hidden"), "echo\n").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let tools = discover_scripts(dir.path(), 5).unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "weather"]);
        assert!(tools[1].annotation().contains("Tool Name: weather"));
    }

    #[test]
    fn test_unreadable_script_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let weather = dir.path().join("weather.sh");
        std::fs::write(&weather, "echo sunny\n").unwrap();
        let gone = dir.path().join("gone.sh");

        let tools = load_scripts(vec![gone, weather.clone()], 5);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "weather");
        assert_eq!(tools[0].path(), weather.as_path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_receives_function_and_argument() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greet.sh");
        std::fs::write(&path, "#!/bin/sh\necho \"$1:$2\"\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = ScriptTool::new("greet", &path, String::new(), 5);
        assert_eq!(tool.call("loud", "bob").await.unwrap(), "loud:bob");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_nonzero_exit_is_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fail.sh");
        std::fs::write(&path, "#!/bin/sh\necho oops >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = ScriptTool::new("fail", &path, String::new(), 5);
        let err = tool.call("fail", "").await.unwrap_err();
        assert!(err.contains("Some(3)"));
        assert!(err.contains("oops"));
    }
}
