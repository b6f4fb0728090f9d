use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    audio::{
        queue::Song,
        registry::SessionRegistry,
        session::{PlaybackSession, PlaybackState},
        voice::TrackEnd,
    },
    error::StreamError,
    ui::UiMessage,
};

/// Intentos totales por canción ante errores de stream reintentables (403).
pub const MAX_STREAM_ATTEMPTS: u32 = 3;

/// Resultado de reproducir la canción en cabecera.
enum Outcome {
    /// Terminó (fin natural o skip): sacar de la cola y seguir.
    Advance,
    /// Falló de forma definitiva: sacar, avisar y seguir.
    Skipped(SkipReason),
    /// La sesión fue cancelada (stop).
    Cancelled,
}

enum SkipReason {
    Exhausted,
    Fatal(StreamError),
}

/// Máquina de estados que drena la cola de una sesión hasta vaciarla y luego
/// la desarma. Una tarea por sesión; es el único código que hace pop durante
/// el avance, así los comandos nunca compiten con él.
pub struct PlaybackEngine;

impl PlaybackEngine {
    pub fn spawn(registry: Arc<SessionRegistry>, session: Arc<PlaybackSession>) {
        tokio::spawn(Self::run(registry, session));
    }

    pub async fn run(registry: Arc<SessionRegistry>, session: Arc<PlaybackSession>) {
        let mut drained = false;

        loop {
            if session.is_cancelled() {
                break;
            }

            let head = session.lock_queue().await.head().cloned();
            let Some(song) = head else {
                drained = true;
                break;
            };

            match Self::play_song(&session, &song).await {
                Outcome::Advance => {
                    session.lock_queue().await.pop_front();
                }
                Outcome::Skipped(reason) => {
                    // La canción fallida se saca entera antes de avanzar:
                    // nunca queda una cabecera "fallida pero presente".
                    session.lock_queue().await.pop_front();

                    let text = match reason {
                        SkipReason::Exhausted => format!(
                            "Failed to play {} after {} attempts. Skipping to the next song.",
                            song.title, MAX_STREAM_ATTEMPTS
                        ),
                        SkipReason::Fatal(e) => {
                            format!("Error: {}. Skipping to the next song.", e)
                        }
                    };
                    session.notifier().send(UiMessage::error(text)).await;
                }
                Outcome::Cancelled => break,
            }
        }

        session.set_state(PlaybackState::Draining);
        if drained {
            session
                .notifier()
                .send(UiMessage::info("Queue has ended. No more songs to play."))
                .await;
        }
        session.release_sink().await;
        registry.remove(session.guild_id);
        info!("🏁 Sesión de guild {} terminada", session.guild_id);
    }

    async fn play_song(session: &Arc<PlaybackSession>, song: &Song) -> Outcome {
        let Some(sink) = session.sink().await else {
            return Outcome::Cancelled;
        };

        // El aviso de "now playing" sale una sola vez por canción, aunque el
        // stream se recupere de un 403 a mitad de reproducción.
        let mut announced = false;

        for attempt in 1..=MAX_STREAM_ATTEMPTS {
            // La cancelación se chequea entre intentos: un stop nunca espera
            // a que el loop de retry se agote.
            if session.is_cancelled() {
                return Outcome::Cancelled;
            }

            if attempt > 1 {
                session.set_state(PlaybackState::Retrying);
                warn!(
                    "🔁 Reintentando {} (intento {}/{})",
                    song.title, attempt, MAX_STREAM_ATTEMPTS
                );
            }

            let done = match sink.start(&song.source_url).await {
                Ok(done) => done,
                Err(e) if e.is_retryable() && attempt < MAX_STREAM_ATTEMPTS => continue,
                Err(e) if e.is_retryable() => return Outcome::Skipped(SkipReason::Exhausted),
                Err(e) => return Outcome::Skipped(SkipReason::Fatal(e)),
            };

            session.set_state(PlaybackState::Playing);
            info!("▶️ Reproduciendo: {}", song.title);
            if !announced {
                Self::announce_now_playing(session, song).await;
                announced = true;
            }

            tokio::select! {
                _ = session.cancelled() => {
                    sink.stop_track().await;
                    return Outcome::Cancelled;
                }
                _ = session.skip_requested() => {
                    sink.stop_track().await;
                    return Outcome::Advance;
                }
                end = done.wait() => match end {
                    TrackEnd::Finished => return Outcome::Advance,
                    TrackEnd::Errored(e) if e.is_retryable() && attempt < MAX_STREAM_ATTEMPTS => {
                        continue
                    }
                    TrackEnd::Errored(e) if e.is_retryable() => {
                        return Outcome::Skipped(SkipReason::Exhausted)
                    }
                    TrackEnd::Errored(e) => return Outcome::Skipped(SkipReason::Fatal(e)),
                },
            }
        }

        Outcome::Skipped(SkipReason::Exhausted)
    }

    /// Aviso de "now playing" con las 1-2 canciones siguientes. Efecto de
    /// solo lectura: no toca la cola ni el estado.
    async fn announce_now_playing(session: &Arc<PlaybackSession>, song: &Song) {
        let next = session.lock_queue().await.upcoming_titles(2);

        let mut text = String::from("Now playing:");
        if !next.is_empty() {
            text.push_str("\n\n**Next up:**");
            for (i, title) in next.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", i + 1, title));
            }
        }

        let message = UiMessage::info(text)
            .with_title(song.title.clone())
            .with_thumbnail(song.artwork_url.clone());
        session.notifier().send(message).await;
    }
}
