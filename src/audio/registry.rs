use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::{future::Future, sync::Arc};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    audio::{session::PlaybackSession, voice::VoiceSink},
    error::MusicError,
    ui::Notifier,
};

/// Tabla de sesiones activas, a lo sumo una por guild. Es el único estado
/// compartido entre guilds del proceso.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
    // Exclusión mutua por guild durante la creación: dos pedidos concurrentes
    // no pueden abrir dos conexiones de voz
    creating: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            creating: DashMap::new(),
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    /// Devuelve la sesión existente o construye una nueva con `connect` (el
    /// join al canal de voz). `connect` solo se espera bajo el candado de la
    /// guild, y si falla no queda ninguna sesión parcial en el registro.
    ///
    /// El booleano indica si la sesión es nueva: el llamador debe arrancar el
    /// motor solo en ese caso.
    pub async fn get_or_create<F, Fut>(
        &self,
        guild_id: GuildId,
        notifier: Arc<dyn Notifier>,
        connect: F,
    ) -> Result<(Arc<PlaybackSession>, bool), MusicError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn VoiceSink>, MusicError>>,
    {
        let lock = self
            .creating
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(session) = self.sessions.get(&guild_id) {
            return Ok((session.clone(), false));
        }

        let sink = connect().await?;
        let session = PlaybackSession::new(guild_id, sink, notifier);
        self.sessions.insert(guild_id, session.clone());

        info!("🆕 Sesión creada para guild {}", guild_id);
        Ok((session, true))
    }

    /// Desarme explícito: usado por stop, por el drain natural del motor y
    /// por los fallos de setup de conexión.
    ///
    /// El candado de `creating` se queda: borrarlo con una creación en curso
    /// permitiría acuñar un segundo candado y abrir dos conexiones de voz.
    /// La tabla queda acotada por las guilds vistas en la vida del proceso.
    pub fn remove(&self, guild_id: GuildId) {
        if self.sessions.remove(&guild_id).is_some() {
            info!("🗑️ Sesión eliminada para guild {}", guild_id);
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
