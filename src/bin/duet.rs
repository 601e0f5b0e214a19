//! 双 Agent 会话：开场方与回复方轮流发言，直到结束标记、轮数上限或 Ctrl+C
//!
//! 用法：`parley-duet [config.toml]`，发言者、prompt 与开场白来自 [duet] 段

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use parley::config::{load_config, AppConfig};
use parley::core::{AgentBuilder, ShutdownManager};
use parley::ui::Terminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    parley::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let opening = cfg.duet.opening_message.clone();

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let mut duet = AgentBuilder::new(cfg, Arc::new(Terminal)).build_duet();

    println!("{}", "=".repeat(80));
    let report = duet
        .run(&opening, shutdown.token())
        .await
        .context("Duet failed")?;
    println!("{}", "=".repeat(80));
    println!("Conversation log:");
    for line in duet.transcript().lines() {
        println!("{line}");
    }
    println!(
        "Saved to {} ({}).",
        duet.transcript().path().display(),
        report.reason
    );
    Ok(())
}
