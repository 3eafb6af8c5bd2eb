//! `ping` - liveness check with a short system report

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::errors::HandlerError;
use crate::application::startup::StartupInfo;
use crate::plugins::trait_def::{CommandContext, Plugin};

pub struct PingPlugin {
    startup: Arc<StartupInfo>,
}

impl PingPlugin {
    pub fn new(startup: Arc<StartupInfo>) -> Self {
        Self { startup }
    }

    fn report(&self, started: Instant) -> String {
        let memory = resident_memory_bytes()
            .map(|b| format!("{:.2} MB", b as f64 / 1024.0 / 1024.0))
            .unwrap_or_else(|| "n/a".to_string());
        let metrics = tokio::runtime::Handle::current().metrics();
        let (workers, tasks) = (metrics.num_workers(), metrics.num_alive_tasks());
        let uptime = format_uptime(self.startup.uptime());
        let latency = started.elapsed();

        format!(
            "🏓 *Pong!* {} is up and ready.\n\n\
             📊 *System Information:*\n\
             • 🚀 Uptime: {}\n\
             • 💾 Memory Usage: {}\n\
             • 🔧 Version: v{}\n\
             • ⚡ Runtime Workers: {}\n\
             • 🧵 Live Tasks: {}\n\
             • ⏰ Response Time: {:?}",
            self.startup.bot_name,
            uptime,
            memory,
            self.startup.version,
            workers,
            tasks,
            latency,
        )
    }
}

#[async_trait]
impl Plugin for PingPlugin {
    fn name(&self) -> &str {
        "ping"
    }

    fn commands(&self) -> &[&str] {
        &["ping"]
    }

    fn description(&self) -> &str {
        "Check that the bot is alive and show system info"
    }

    async fn handle(&self, ctx: &CommandContext) -> Result<(), HandlerError> {
        let text = self.report(Instant::now());
        ctx.reply(text).await?;
        Ok(())
    }
}

/// `1d 2h 3m 4s`, dropping leading zero units
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let (hours, minutes, seconds) = (secs / 3_600 % 24, secs / 60 % 60, secs % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));
    parts.join(" ")
}

/// Resident set size of this process, where the platform exposes it
fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}
