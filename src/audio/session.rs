use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    audio::{queue::SongQueue, voice::VoiceSink},
    ui::Notifier,
};

/// Estado de reproducción de una sesión. `Idle` no existe como estado: una
/// guild sin sesión en el registro está ociosa por definición.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Connecting,
    Playing,
    Retrying,
    Draining,
}

/// Agregado por guild: una cola, un estado, una conexión de voz y un canal de
/// salida. Toda mutación de la cola pasa por su mutex, así los comandos nunca
/// se intercalan a mitad del avance del motor.
pub struct PlaybackSession {
    pub guild_id: GuildId,
    queue: Mutex<SongQueue>,
    state: parking_lot::Mutex<PlaybackState>,
    // Slot de la conexión: `take` en el teardown garantiza un único release
    sink: Mutex<Option<Arc<dyn VoiceSink>>>,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
    skip: Notify,
}

impl PlaybackSession {
    pub fn new(
        guild_id: GuildId,
        sink: Arc<dyn VoiceSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            queue: Mutex::new(SongQueue::new()),
            state: parking_lot::Mutex::new(PlaybackState::Connecting),
            sink: Mutex::new(Some(sink)),
            notifier,
            cancel: CancellationToken::new(),
            skip: Notify::new(),
        })
    }

    pub async fn lock_queue(&self) -> MutexGuard<'_, SongQueue> {
        self.queue.lock().await
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: PlaybackState) {
        debug!("🎚️ Guild {}: estado -> {:?}", self.guild_id, state);
        *self.state.lock() = state;
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Señal de stop: cancela el loop del motor, incluso a mitad de un retry.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Pide al motor saltar la canción en curso. El motor es el único que
    /// saca de la cola durante el avance.
    pub fn request_skip(&self) {
        self.skip.notify_one();
    }

    pub async fn skip_requested(&self) {
        self.skip.notified().await
    }

    pub async fn sink(&self) -> Option<Arc<dyn VoiceSink>> {
        self.sink.lock().await.clone()
    }

    /// Suelta la conexión de voz exactamente una vez, sin importar qué
    /// teardown (drain, stop o fallo de setup) llegó primero.
    pub async fn release_sink(&self) {
        if let Some(sink) = self.sink.lock().await.take() {
            sink.release().await;
        }
    }
}
