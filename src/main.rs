use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod spotify;
mod ui;

use crate::audio::{voice::SongbirdConnector, SessionRegistry};
use crate::bot::{MixtapeBot, MusicCommands};
use crate::config::Config;
use crate::sources::{TrackResolver, YtSearchClient};
use crate::spotify::{PlaylistCatalog, SpotifyAuth, SpotifyClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_mixtape=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Open Mixtape v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    let timeout = Duration::from_secs(config.search_timeout_secs);

    // Catálogo de Spotify con tokens persistidos en disco
    let auth = Arc::new(SpotifyAuth::load(
        &config.data_dir,
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        timeout,
    )?);
    let catalog: Arc<dyn PlaylistCatalog> = Arc::new(SpotifyClient::new(auth, timeout)?);

    // Resolución de pistas: yt-dlp para el match, Spotify para la carátula
    let resolver = Arc::new(TrackResolver::new(
        Arc::new(YtSearchClient::new()),
        catalog.clone(),
        timeout,
    ));

    // Sesiones de voz por guild
    let registry = Arc::new(SessionRegistry::new());
    let manager = Songbird::serenity();
    let connector = Arc::new(SongbirdConnector::new(manager.clone(), timeout));

    let commands = Arc::new(MusicCommands::new(
        registry,
        resolver,
        catalog,
        connector,
        config.max_playlist_size,
    ));

    // Intents mínimos: comandos slash + estados de voz
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let handler = MixtapeBot::new(commands);

    let mut client = Client::builder(&config.discord_token, intents)
        .application_id(config.application_id.into())
        .event_handler(handler)
        .register_songbird_with(manager)
        .await?;

    // Manejar shutdown graceful
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
