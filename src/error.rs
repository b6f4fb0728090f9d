use thiserror::Error;

/// Errores del núcleo de reproducción. El texto de `Display` se usa tal cual
/// en las respuestas al usuario.
#[derive(Debug, Error)]
pub enum MusicError {
    #[error("No match found for '{0}'.")]
    ResolutionNotFound(String),

    /// El refresh del token ya se intentó una vez y volvió a fallar.
    #[error("Spotify session expired and could not be refreshed.")]
    AuthExpired,

    #[error("Invalid position. Please provide a valid song position in the queue.")]
    InvalidPosition(usize),

    #[error("The queue is empty.")]
    EmptyQueue,

    #[error("You need to be in a voice channel to use this command!")]
    NotInVoiceChannel,

    #[error("There is no song currently playing.")]
    NoSongPlaying,

    #[error("Playlist not found.")]
    PlaylistNotFound(String),

    #[error("Could not join the voice channel: {0}")]
    ConnectionSetup(String),

    #[error("The {0} request timed out.")]
    Timeout(&'static str),

    #[error("Spotify error: {0}")]
    Catalog(String),

    #[error("Search failed: {0}")]
    Search(String),
}

/// Clasificación etiquetada de fallos de stream. Se asigna una sola vez en el
/// borde con songbird/yt-dlp; el motor de reproducción solo consulta la
/// etiqueta, nunca el mensaje.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Acceso denegado por la fuente (HTTP 403). Reintentable.
    #[error("stream access forbidden (HTTP 403)")]
    Forbidden,

    #[error("stream acquisition timed out")]
    Timeout,

    #[error("stream failed: {0}")]
    Other(String),
}

impl StreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamError::Forbidden)
    }

    /// Mapea el error crudo del backend de audio a la taxonomía etiquetada.
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("403") || lower.contains("forbidden") {
            StreamError::Forbidden
        } else {
            StreamError::Other(raw.to_string())
        }
    }
}
