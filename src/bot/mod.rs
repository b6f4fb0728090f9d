use serenity::{
    all::{Context, EventHandler, Interaction, Ready},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;
pub mod handlers;

pub use commands::{CommandContext, MusicCommands};

/// Handler principal del bot: recibe los eventos del gateway y los despacha a
/// la superficie de comandos.
pub struct MixtapeBot {
    pub commands: Arc<MusicCommands>,
}

impl MixtapeBot {
    pub fn new(commands: Arc<MusicCommands>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl EventHandler for MixtapeBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("✅ {} conectado y listo", ready.user.name);
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            let name = command.data.name.clone();
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("❌ Error manejando /{}: {:?}", name, e);
            }
        }
    }
}
