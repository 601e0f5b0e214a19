//! Parley - 与 LLM 的多轮对话
//!
//! 入口：加载 .env 与配置、初始化日志、构建交互会话并运行到结束。
//! 用法：`parley [config.toml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use parley::config::{load_config, AppConfig};
use parley::core::{AgentBuilder, ShutdownManager};
use parley::ui::Terminal;

fn main() -> anyhow::Result<()> {
    // stdin 读取在 blocking 线程上，关闭运行时不能等它
    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let result = runtime.block_on(run());
    runtime.shutdown_background();
    result
}

async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    parley::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let mut session = AgentBuilder::new(cfg, Arc::new(Terminal))
        .build_session()
        .context("Failed to build session")?;

    println!("{}", "=".repeat(80));
    let report = session
        .run(shutdown.token())
        .await
        .context("Session failed")?;
    println!("{}", "=".repeat(80));
    println!(
        "Transcript saved to {} ({} lines).",
        session.transcript().path().display(),
        report.transcript_lines
    );
    Ok(())
}
