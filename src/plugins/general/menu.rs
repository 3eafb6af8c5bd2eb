//! `menu` - lists every available command

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::HandlerError;
use crate::application::startup::StartupInfo;
use crate::domain::entities::CatalogEntry;
use crate::plugins::trait_def::{CommandContext, Plugin};

pub struct MenuPlugin {
    startup: Arc<StartupInfo>,
}

impl MenuPlugin {
    pub fn new(startup: Arc<StartupInfo>) -> Self {
        Self { startup }
    }

    fn render(&self, prefix: &str, catalog: &[CatalogEntry]) -> String {
        let mut help = format!("🤖 *{} - Help*\n\n", self.startup.bot_name);

        help.push_str("📋 *Available Commands:*\n");
        for entry in catalog {
            help.push_str(&format!("• `{}{}` - {}\n", prefix, entry.command, entry.description));
        }

        help.push_str("\nℹ️ *Bot Info:*\n");
        help.push_str(&format!("• Prefix: `{}`\n\n", prefix));
        help.push_str(&format!("✨ *{} v{}*", self.startup.bot_name, self.startup.version));
        help
    }
}

#[async_trait]
impl Plugin for MenuPlugin {
    fn name(&self) -> &str {
        "help"
    }

    fn commands(&self) -> &[&str] {
        &["menu"]
    }

    fn description(&self) -> &str {
        "Show this list of commands"
    }

    async fn handle(&self, ctx: &CommandContext) -> Result<(), HandlerError> {
        let text = self.render(&ctx.prefix, &ctx.catalog);
        ctx.reply(text).await?;
        Ok(())
    }
}
