use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::YoutubeDl,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{MusicError, StreamError};

/// Resultado final de un intento de reproducción.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEnd {
    Finished,
    Errored(StreamError),
}

#[derive(Debug)]
pub(crate) enum TrackSignal {
    Ready,
    Done(TrackEnd),
}

/// Futuro del fin de pista: se resuelve cuando el intento en curso termina,
/// sea de forma natural o con error ya clasificado.
pub struct TrackDone {
    rx: mpsc::UnboundedReceiver<TrackSignal>,
}

impl TrackDone {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<TrackSignal>) -> Self {
        Self { rx }
    }

    /// Un TrackDone ya resuelto (pista terminada antes de ser observada).
    pub fn finished() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TrackSignal::Done(TrackEnd::Finished));
        Self { rx }
    }

    #[cfg(test)]
    pub fn errored(error: StreamError) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TrackSignal::Done(TrackEnd::Errored(error)));
        Self { rx }
    }

    /// Un TrackDone que no se resuelve hasta que el emisor lo complete.
    #[cfg(test)]
    pub fn pending() -> (Self, mpsc::UnboundedSender<TrackSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }

    pub async fn wait(mut self) -> TrackEnd {
        loop {
            match self.rx.recv().await {
                Some(TrackSignal::Ready) => continue,
                Some(TrackSignal::Done(end)) => return end,
                // Canal cerrado: la pista fue descartada por el driver.
                None => return TrackEnd::Finished,
            }
        }
    }
}

/// Salida de audio de una sesión: adquiere el stream de una URL y lo
/// reproduce en la conexión de voz de la guild.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceSink: Send + Sync {
    /// Adquiere el stream (solo audio, mejor calidad disponible) y lo deja
    /// sonando. Resuelve recién cuando hay datos reproducibles; los errores
    /// llegan ya clasificados.
    async fn start(&self, source_url: &str) -> Result<TrackDone, StreamError>;

    /// Detiene la pista en curso sin soltar la conexión.
    async fn stop_track(&self);

    /// Suelta la conexión de voz. La sesión garantiza exactamente una llamada.
    async fn release(&self);
}

/// Fábrica de conexiones de voz (join al canal).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSink>, MusicError>;
}

pub struct SongbirdConnector {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    acquire_timeout: Duration,
}

impl SongbirdConnector {
    pub fn new(manager: Arc<Songbird>, acquire_timeout: Duration) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            acquire_timeout,
        }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSink>, MusicError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::ConnectionSetup(e.to_string()))?;

        info!("🔊 Conectado al canal de voz en guild {}", guild_id);

        Ok(Arc::new(SongbirdSink {
            manager: self.manager.clone(),
            call,
            guild_id,
            http: self.http.clone(),
            acquire_timeout: self.acquire_timeout,
            current: parking_lot::Mutex::new(None),
        }))
    }
}

/// Sink real sobre songbird. Los handlers de eventos se registran sobre el
/// TrackHandle de cada intento, así su alcance es exactamente ese intento y
/// nunca contaminan las canciones siguientes.
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    guild_id: GuildId,
    http: reqwest::Client,
    acquire_timeout: Duration,
    current: parking_lot::Mutex<Option<TrackHandle>>,
}

#[async_trait]
impl VoiceSink for SongbirdSink {
    async fn start(&self, source_url: &str) -> Result<TrackDone, StreamError> {
        debug!("🎧 Adquiriendo stream: {}", source_url);

        // yt-dlp vía songbird: pide el mejor bitstream de solo audio
        let input = YoutubeDl::new(self.http.clone(), source_url.to_string());
        let handle = self.call.lock().await.play_input(input.into());

        let (tx, mut rx) = mpsc::unbounded_channel();
        handle
            .add_event(Event::Track(TrackEvent::Playable), ReadySignal { tx: tx.clone() })
            .map_err(|e| StreamError::Other(e.to_string()))?;
        handle
            .add_event(Event::Track(TrackEvent::Error), FailureSignal { tx: tx.clone() })
            .map_err(|e| StreamError::Other(e.to_string()))?;
        handle
            .add_event(Event::Track(TrackEvent::End), EndSignal { tx })
            .map_err(|e| StreamError::Other(e.to_string()))?;

        *self.current.lock() = Some(handle.clone());

        match tokio::time::timeout(self.acquire_timeout, rx.recv()).await {
            Err(_) => {
                warn!("⏰ Timeout adquiriendo stream para {}", source_url);
                let _ = handle.stop();
                Err(StreamError::Timeout)
            }
            Ok(Some(TrackSignal::Ready)) => Ok(TrackDone::new(rx)),
            Ok(Some(TrackSignal::Done(TrackEnd::Errored(e)))) => {
                let _ = handle.stop();
                Err(e)
            }
            Ok(Some(TrackSignal::Done(TrackEnd::Finished))) | Ok(None) => Ok(TrackDone::finished()),
        }
    }

    async fn stop_track(&self) {
        if let Some(handle) = self.current.lock().take() {
            let _ = handle.stop();
        }
    }

    async fn release(&self) {
        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("⚠️ Error al soltar la conexión de voz: {:?}", e);
        }
        info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
    }
}

struct ReadySignal {
    tx: mpsc::UnboundedSender<TrackSignal>,
}

#[async_trait]
impl VoiceEventHandler for ReadySignal {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let _ = self.tx.send(TrackSignal::Ready);
        Some(Event::Cancel)
    }
}

struct FailureSignal {
    tx: mpsc::UnboundedSender<TrackSignal>,
}

#[async_trait]
impl VoiceEventHandler for FailureSignal {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = track_error(ctx)
            .unwrap_or_else(|| StreamError::Other("playback error".to_string()));
        let _ = self.tx.send(TrackSignal::Done(TrackEnd::Errored(error)));
        Some(Event::Cancel)
    }
}

struct EndSignal {
    tx: mpsc::UnboundedSender<TrackSignal>,
}

#[async_trait]
impl VoiceEventHandler for EndSignal {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let _ = self.tx.send(TrackSignal::Done(TrackEnd::Finished));
        Some(Event::Cancel)
    }
}

/// Extrae y clasifica el error del estado de la pista, si lo hay.
fn track_error(ctx: &EventContext<'_>) -> Option<StreamError> {
    if let EventContext::Track(track_list) = ctx {
        for (state, _handle) in *track_list {
            if let PlayMode::Errored(e) = &state.playing {
                return Some(StreamError::classify(&e.to_string()));
            }
        }
    }
    None
}
