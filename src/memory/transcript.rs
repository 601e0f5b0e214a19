//! 会话记录持久化
//!
//! 会话结束（正常结束或用户中断）时，把展示过的每一行写入纯文本文件，换行分隔，覆盖旧文件。

use std::path::{Path, PathBuf};

/// 会话记录：按展示顺序累积行，save 时整体写盘
#[derive(Debug, Clone)]
pub struct TranscriptLog {
    path: PathBuf,
    lines: Vec<String>,
}

impl TranscriptLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入文件（覆盖）；父目录不存在时自动创建
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, self.lines.join("\n"))?;
        tracing::info!(path = %self.path.display(), lines = self.lines.len(), "transcript saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("conversation_log.txt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale content that is longer than the new one").unwrap();

        let mut log = TranscriptLog::new(&path);
        log.push("User: hi");
        log.push("AI: hello");
        log.save().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "User: hi\nAI: hello");
    }
}
