use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    audio::{voice::VoiceConnector, PlaybackEngine, SessionRegistry},
    error::MusicError,
    sources::TrackResolver,
    spotify::{Playlist, PlaylistCatalog},
    ui::{Notifier, UiMessage},
};

const HELP_TEXT: &str = "\
**Bot Commands:**

**/playlist [playlist_name]** - Searches for songs from the specified Spotify playlist on YouTube, adds them to the queue, shuffles the queue, and starts playing after all songs are added.

**/play [song_title]** - Searches for the specified song on YouTube and adds it to the top of the queue.

**/skip** - Skips the current song and plays the next one in the queue.

**/stop** - Stops playing and clears the queue.

**/queue** - Displays the upcoming songs in the queue.

**/queue [position]** - Puts the song at specified position at the top of the queue

**/addtoplaylist [playlist_name]** - Adds the current playing song to the specified playlist

**/showplaylists** - Displays all playlists from your Spotify account.

**/bothelp** - Displays this help message.";

/// Contexto de un comando ya desacoplado del transporte: guild, canal de voz
/// del usuario (si está en uno) y canal de salida para los avisos del motor.
pub struct CommandContext {
    pub guild_id: GuildId,
    pub voice_channel: Option<ChannelId>,
    pub notifier: Arc<dyn Notifier>,
}

/// Superficie de comandos del núcleo. Cada método devuelve exactamente una
/// respuesta estructurada; los fallos se traducen acá y nunca dejan una
/// sesión a medio mutar.
pub struct MusicCommands {
    registry: Arc<SessionRegistry>,
    resolver: Arc<TrackResolver>,
    catalog: Arc<dyn PlaylistCatalog>,
    connector: Arc<dyn VoiceConnector>,
    max_playlist_size: usize,
}

impl MusicCommands {
    pub fn new(
        registry: Arc<SessionRegistry>,
        resolver: Arc<TrackResolver>,
        catalog: Arc<dyn PlaylistCatalog>,
        connector: Arc<dyn VoiceConnector>,
        max_playlist_size: usize,
    ) -> Self {
        Self {
            registry,
            resolver,
            catalog,
            connector,
            max_playlist_size,
        }
    }

    pub async fn play(&self, ctx: &CommandContext, song_title: &str) -> UiMessage {
        self.play_inner(ctx, song_title)
            .await
            .unwrap_or_else(|e| UiMessage::error(e.to_string()))
    }

    async fn play_inner(
        &self,
        ctx: &CommandContext,
        song_title: &str,
    ) -> Result<UiMessage, MusicError> {
        let channel = ctx.voice_channel.ok_or(MusicError::NotInVoiceChannel)?;

        let song = self
            .resolver
            .resolve_free_text(song_title)
            .await?
            .ok_or_else(|| MusicError::ResolutionNotFound(song_title.to_string()))?;
        let title = song.title.clone();

        if let Some(session) = self.registry.get(ctx.guild_id) {
            let mut queue = session.lock_queue().await;
            if queue.head_matches(&song.source_url) {
                return Ok(UiMessage::info("The song is already playing."));
            }
            queue.insert_after_head(song);
            return Ok(UiMessage::info(format!(
                "{title} has been added to the top of the queue!"
            )));
        }

        let (session, created) = self
            .registry
            .get_or_create(ctx.guild_id, ctx.notifier.clone(), || {
                self.connector.connect(ctx.guild_id, channel)
            })
            .await?;

        if created {
            session.lock_queue().await.append(song);
            PlaybackEngine::spawn(self.registry.clone(), session);
        } else {
            // Otro comando ganó la creación entre el get y el get_or_create
            session.lock_queue().await.insert_after_head(song);
        }

        Ok(UiMessage::info(format!(
            "{title} has been added to the top of the queue!"
        )))
    }

    pub async fn playlist(&self, ctx: &CommandContext, playlist_name: &str) -> UiMessage {
        self.playlist_inner(ctx, playlist_name)
            .await
            .unwrap_or_else(|e| UiMessage::error(e.to_string()))
    }

    async fn playlist_inner(
        &self,
        ctx: &CommandContext,
        playlist_name: &str,
    ) -> Result<UiMessage, MusicError> {
        let channel = ctx.voice_channel.ok_or(MusicError::NotInVoiceChannel)?;

        let playlist = self.find_playlist(playlist_name).await?;
        info!("📋 Playlist encontrada: {}", playlist.name);

        let mut tracks = self.catalog.get_playlist_tracks(&playlist.id).await?;
        tracks.truncate(self.max_playlist_size);

        let songs = self.resolver.resolve_playlist(&tracks).await;
        if songs.is_empty() {
            return Ok(UiMessage::error(
                "No valid YouTube videos found for the playlist.",
            ));
        }

        let (session, created) = self
            .registry
            .get_or_create(ctx.guild_id, ctx.notifier.clone(), || {
                self.connector.connect(ctx.guild_id, channel)
            })
            .await?;

        {
            let mut queue = session.lock_queue().await;
            queue.bulk_append(songs);
            // Se mezcla la cola completa, incluida la canción en curso si la
            // sesión ya existía
            queue.shuffle(0);
        }

        if created {
            PlaybackEngine::spawn(self.registry.clone(), session);
        }

        Ok(UiMessage::info(
            "Queue has been successfully added and shuffled.",
        ))
    }

    pub async fn skip(&self, ctx: &CommandContext) -> UiMessage {
        self.skip_inner(ctx)
            .await
            .unwrap_or_else(|e| UiMessage::error(e.to_string()))
    }

    async fn skip_inner(&self, ctx: &CommandContext) -> Result<UiMessage, MusicError> {
        ctx.voice_channel.ok_or(MusicError::NotInVoiceChannel)?;
        let session = self
            .registry
            .get(ctx.guild_id)
            .ok_or(MusicError::EmptyQueue)?;

        info!(
            "⏭️ Skip pedido en guild {} (estado {:?})",
            ctx.guild_id,
            session.state()
        );
        session.request_skip();
        Ok(UiMessage::info("Skipped the song."))
    }

    pub async fn stop(&self, ctx: &CommandContext) -> UiMessage {
        self.stop_inner(ctx)
            .await
            .unwrap_or_else(|e| UiMessage::error(e.to_string()))
    }

    async fn stop_inner(&self, ctx: &CommandContext) -> Result<UiMessage, MusicError> {
        ctx.voice_channel.ok_or(MusicError::NotInVoiceChannel)?;
        let session = self
            .registry
            .get(ctx.guild_id)
            .ok_or(MusicError::EmptyQueue)?;

        // La cola se vacía antes de cancelar: el motor no puede avanzar a
        // otra canción entre ambas operaciones
        session.lock_queue().await.clear();
        session.cancel();

        Ok(UiMessage::info("Stopped the music and cleared the queue."))
    }

    /// Sin posición lista las canciones que vienen; con posición mueve esa
    /// entrada al tope de la cola.
    pub async fn queue(&self, ctx: &CommandContext, position: Option<usize>) -> UiMessage {
        match position {
            None => self.show_queue(ctx).await,
            Some(position) => self
                .move_to_top(ctx, position)
                .await
                .unwrap_or_else(|e| UiMessage::error(e.to_string())),
        }
    }

    async fn show_queue(&self, ctx: &CommandContext) -> UiMessage {
        let Some(session) = self.registry.get(ctx.guild_id) else {
            return UiMessage::info("The queue is empty.");
        };

        let queue = session.lock_queue().await;
        if queue.is_empty() {
            return UiMessage::info("The queue is empty.");
        }

        let upcoming = queue.upcoming_titles(queue.len());
        if upcoming.is_empty() {
            return UiMessage::info("The queue is empty.");
        }

        let mut text = String::from("Upcoming songs:\n");
        for (i, title) in upcoming.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", i + 1, title));
        }
        UiMessage::info(text)
    }

    async fn move_to_top(
        &self,
        ctx: &CommandContext,
        position: usize,
    ) -> Result<UiMessage, MusicError> {
        ctx.voice_channel.ok_or(MusicError::NotInVoiceChannel)?;

        let Some(session) = self.registry.get(ctx.guild_id) else {
            return Ok(UiMessage::info("The queue is empty or has only one song."));
        };

        let mut queue = session.lock_queue().await;
        if queue.len() <= 1 {
            return Ok(UiMessage::info("The queue is empty or has only one song."));
        }

        let title = queue.move_to_top(position)?;
        Ok(UiMessage::info(format!(
            "Moved {title} to the top of the queue!"
        )))
    }

    pub async fn add_to_playlist(&self, ctx: &CommandContext, playlist_name: &str) -> UiMessage {
        self.add_to_playlist_inner(ctx, playlist_name)
            .await
            .unwrap_or_else(|e| UiMessage::error(e.to_string()))
    }

    async fn add_to_playlist_inner(
        &self,
        ctx: &CommandContext,
        playlist_name: &str,
    ) -> Result<UiMessage, MusicError> {
        // El chequeo de canción en curso va antes de tocar el catálogo
        let current_title = match self.registry.get(ctx.guild_id) {
            Some(session) => session.lock_queue().await.head().map(|s| s.title.clone()),
            None => None,
        };
        let title = current_title.ok_or(MusicError::NoSongPlaying)?;

        let playlist = self.find_playlist(playlist_name).await?;

        let uri = match self.catalog.search_tracks(&title).await {
            Ok(tracks) => tracks.into_iter().next().map(|t| t.uri),
            Err(e) => {
                warn!("⚠️ Búsqueda en Spotify fallida para '{}': {}", title, e);
                None
            }
        };
        let Some(uri) = uri else {
            return Ok(UiMessage::error("Could not find the song on Spotify."));
        };

        self.catalog.add_tracks(&playlist.id, &[uri]).await?;
        Ok(UiMessage::info(format!(
            "Added {title} to the playlist **{playlist_name}**."
        )))
    }

    pub async fn show_playlists(&self) -> UiMessage {
        match self.catalog.get_user_playlists().await {
            Ok(playlists) if playlists.is_empty() => UiMessage::info("No playlists found."),
            Ok(playlists) => {
                let mut text = String::from("Your Spotify playlists:\n");
                for (i, playlist) in playlists.iter().enumerate() {
                    text.push_str(&format!("{}. {}\n", i + 1, playlist.name));
                }
                UiMessage::info(text)
            }
            Err(e) => UiMessage::error(format!("Error retrieving playlists: {e}")),
        }
    }

    pub fn help(&self) -> UiMessage {
        UiMessage::info(HELP_TEXT)
    }

    /// Las playlists se matchean por nombre sin distinguir mayúsculas.
    async fn find_playlist(&self, name: &str) -> Result<Playlist, MusicError> {
        let playlists = self.catalog.get_user_playlists().await?;
        playlists
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| MusicError::PlaylistNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{voice::MockVoiceConnector, voice::MockVoiceSink, voice::VoiceSink, Song},
        sources::{MockTrackSearcher, SearchHit},
        spotify::MockPlaylistCatalog,
        ui::{MessageKind, MockNotifier},
    };
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn ctx(in_voice: bool) -> CommandContext {
        CommandContext {
            guild_id: GuildId::new(1),
            voice_channel: in_voice.then(|| ChannelId::new(9)),
            notifier: Arc::new(MockNotifier::new()),
        }
    }

    fn commands_with(
        registry: Arc<SessionRegistry>,
        searcher: MockTrackSearcher,
        catalog: MockPlaylistCatalog,
        connector: MockVoiceConnector,
    ) -> MusicCommands {
        let catalog: Arc<dyn PlaylistCatalog> = Arc::new(catalog);
        let resolver = Arc::new(TrackResolver::new(
            Arc::new(searcher),
            catalog.clone(),
            Duration::from_secs(5),
        ));
        MusicCommands::new(
            registry,
            resolver,
            catalog,
            Arc::new(connector),
            100,
        )
    }

    async fn registry_with_session(songs: Vec<Song>) -> Arc<SessionRegistry> {
        let registry = Arc::new(SessionRegistry::new());
        let sink: Arc<dyn VoiceSink> = Arc::new(MockVoiceSink::new());
        let (session, _) = registry
            .get_or_create(GuildId::new(1), Arc::new(MockNotifier::new()), || async move {
                Ok(sink)
            })
            .await
            .unwrap();
        session.lock_queue().await.bulk_append(songs);
        registry
    }

    fn song(title: &str) -> Song {
        Song::new(title, format!("https://youtu.be/{title}"), None)
    }

    #[tokio::test]
    async fn stop_without_session_is_an_error_and_creates_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let commands = commands_with(
            registry.clone(),
            MockTrackSearcher::new(),
            MockPlaylistCatalog::new(),
            MockVoiceConnector::new(),
        );

        let reply = commands.stop(&ctx(true)).await;

        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(reply.text, "The queue is empty.");
        assert!(registry.get(GuildId::new(1)).is_none());
    }

    #[tokio::test]
    async fn play_without_voice_channel_is_rejected() {
        let commands = commands_with(
            Arc::new(SessionRegistry::new()),
            MockTrackSearcher::new(),
            MockPlaylistCatalog::new(),
            MockVoiceConnector::new(),
        );

        let reply = commands.play(&ctx(false), "anything").await;

        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(
            reply.text,
            "You need to be in a voice channel to use this command!"
        );
    }

    #[tokio::test]
    async fn play_duplicate_of_the_playing_head_is_not_queued() {
        let registry = registry_with_session(vec![song("a"), song("b")]).await;

        let mut searcher = MockTrackSearcher::new();
        searcher.expect_search().returning(|_| {
            Ok(vec![SearchHit {
                title: "a".to_string(),
                url: "https://youtu.be/a".to_string(),
                thumbnail: None,
            }])
        });
        let mut catalog = MockPlaylistCatalog::new();
        catalog.expect_search_tracks().returning(|_| Ok(vec![]));

        let commands = commands_with(
            registry.clone(),
            searcher,
            catalog,
            MockVoiceConnector::new(),
        );

        let reply = commands.play(&ctx(true), "a").await;

        assert_eq!(reply.text, "The song is already playing.");
        let session = registry.get(GuildId::new(1)).unwrap();
        assert_eq!(session.lock_queue().await.len(), 2);
    }

    #[tokio::test]
    async fn play_on_live_session_lands_right_below_the_head() {
        let registry = registry_with_session(vec![song("a"), song("b")]).await;

        let mut searcher = MockTrackSearcher::new();
        searcher.expect_search().returning(|_| {
            Ok(vec![SearchHit {
                title: "x".to_string(),
                url: "https://youtu.be/x".to_string(),
                thumbnail: None,
            }])
        });
        let mut catalog = MockPlaylistCatalog::new();
        catalog.expect_search_tracks().returning(|_| Ok(vec![]));

        let commands = commands_with(
            registry.clone(),
            searcher,
            catalog,
            MockVoiceConnector::new(),
        );

        let reply = commands.play(&ctx(true), "x").await;

        assert_eq!(reply.text, "x has been added to the top of the queue!");
        let session = registry.get(GuildId::new(1)).unwrap();
        let queue = session.lock_queue().await;
        assert_eq!(queue.head().unwrap().title, "a");
        assert_eq!(queue.upcoming_titles(1), vec!["x"]);
    }

    #[tokio::test]
    async fn queue_position_one_is_the_playing_slot_and_rejected() {
        let registry = registry_with_session(vec![song("a"), song("b"), song("c")]).await;
        let commands = commands_with(
            registry,
            MockTrackSearcher::new(),
            MockPlaylistCatalog::new(),
            MockVoiceConnector::new(),
        );

        let reply = commands.queue(&ctx(true), Some(1)).await;

        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(
            reply.text,
            "Invalid position. Please provide a valid song position in the queue."
        );
    }

    #[tokio::test]
    async fn add_to_playlist_without_a_playing_song_skips_the_catalog() {
        // Sin expectativas en el catálogo: cualquier llamada haría fallar el test
        let commands = commands_with(
            Arc::new(SessionRegistry::new()),
            MockTrackSearcher::new(),
            MockPlaylistCatalog::new(),
            MockVoiceConnector::new(),
        );

        let reply = commands.add_to_playlist(&ctx(true), "favorites").await;

        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(reply.text, "There is no song currently playing.");
    }

    #[tokio::test]
    async fn playlist_name_match_ignores_case() {
        let mut catalog = MockPlaylistCatalog::new();
        catalog.expect_get_user_playlists().returning(|| {
            Ok(vec![Playlist {
                id: "p1".to_string(),
                name: "Chill Mix".to_string(),
            }])
        });
        catalog
            .expect_get_playlist_tracks()
            .withf(|id| id == "p1")
            .returning(|_| Ok(vec![]));

        let commands = commands_with(
            Arc::new(SessionRegistry::new()),
            MockTrackSearcher::new(),
            catalog,
            MockVoiceConnector::new(),
        );

        let reply = commands.playlist(&ctx(true), "chill mix").await;

        // Matcheó la playlist pero no resolvió ninguna pista
        assert_eq!(reply.text, "No valid YouTube videos found for the playlist.");
    }

    #[tokio::test]
    async fn unknown_playlist_is_reported() {
        let mut catalog = MockPlaylistCatalog::new();
        catalog.expect_get_user_playlists().returning(|| Ok(vec![]));

        let commands = commands_with(
            Arc::new(SessionRegistry::new()),
            MockTrackSearcher::new(),
            catalog,
            MockVoiceConnector::new(),
        );

        let reply = commands.playlist(&ctx(true), "nope").await;

        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(reply.text, "Playlist not found.");
    }

    #[tokio::test]
    async fn show_playlists_lists_them_in_order() {
        let mut catalog = MockPlaylistCatalog::new();
        catalog.expect_get_user_playlists().returning(|| {
            Ok(vec![
                Playlist {
                    id: "p1".to_string(),
                    name: "Chill Mix".to_string(),
                },
                Playlist {
                    id: "p2".to_string(),
                    name: "Workout".to_string(),
                },
            ])
        });

        let commands = commands_with(
            Arc::new(SessionRegistry::new()),
            MockTrackSearcher::new(),
            catalog,
            MockVoiceConnector::new(),
        );

        let reply = commands.show_playlists().await;

        assert_eq!(reply.text, "Your Spotify playlists:\n1. Chill Mix\n2. Workout\n");
    }
}
