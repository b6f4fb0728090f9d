use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    bot::{CommandContext, MixtapeBot},
    ui::{embeds, ChannelNotifier},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &MixtapeBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    // Defer la respuesta: la resolución de canciones puede tomar tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let context = CommandContext {
        guild_id,
        voice_channel: user_voice_channel(ctx, guild_id, command.user.id),
        notifier: Arc::new(ChannelNotifier::new(ctx.http.clone(), command.channel_id)),
    };

    let reply = match command.data.name.as_str() {
        "play" => {
            let song_title = option_str(&command, "song_title")
                .ok_or_else(|| anyhow::anyhow!("Título de canción no proporcionado"))?;
            bot.commands.play(&context, song_title).await
        }
        "playlist" => {
            let playlist_name = option_str(&command, "playlist_name")
                .ok_or_else(|| anyhow::anyhow!("Nombre de playlist no proporcionado"))?;
            bot.commands.playlist(&context, playlist_name).await
        }
        "skip" => bot.commands.skip(&context).await,
        "stop" => bot.commands.stop(&context).await,
        "queue" => {
            // Posición negativa o fuera de rango se rechaza más adentro
            let position =
                option_int(&command, "position").map(|p| usize::try_from(p).unwrap_or(0));
            bot.commands.queue(&context, position).await
        }
        "addtoplaylist" => {
            let playlist_name = option_str(&command, "playlist_name")
                .ok_or_else(|| anyhow::anyhow!("Nombre de playlist no proporcionado"))?;
            bot.commands.add_to_playlist(&context, playlist_name).await
        }
        "showplaylists" => bot.commands.show_playlists().await,
        "bothelp" => bot.commands.help(),
        _ => {
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().content("❌ Comando no reconocido"),
                )
                .await?;
            return Ok(());
        }
    };

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().embed(embeds::render(&reply)),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn option_int(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
