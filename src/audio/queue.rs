use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::error::MusicError;

/// Canción resuelta y reproducible. Inmutable después de construida.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub title: String,
    pub source_url: String,
    pub artwork_url: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

impl Song {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>, artwork_url: Option<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            artwork_url,
            resolved_at: Utc::now(),
        }
    }
}

/// Cola de reproducción de una sesión. El índice 0 es la canción que está
/// sonando (o a punto de sonar); solo se vacía por pop o clear explícitos.
#[derive(Debug, Default)]
pub struct SongQueue {
    songs: Vec<Song>,
}

impl SongQueue {
    pub fn new() -> Self {
        Self { songs: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn head(&self) -> Option<&Song> {
        self.songs.first()
    }

    /// Chequeo de duplicado usado por /play: misma URL que la que ya suena.
    pub fn head_matches(&self, source_url: &str) -> bool {
        self.head().map_or(false, |s| s.source_url == source_url)
    }

    pub fn append(&mut self, song: Song) {
        info!("➕ Agregada a la cola: {}", song.title);
        self.songs.push(song);
    }

    pub fn bulk_append(&mut self, songs: Vec<Song>) {
        info!("➕ Agregadas {} canciones a la cola", songs.len());
        self.songs.extend(songs);
    }

    /// Fisher–Yates sobre `[from_index, len)`. Con `from_index = 0` se mezcla
    /// la cola completa, incluida la posición de la canción en curso.
    pub fn shuffle(&mut self, from_index: usize) {
        if from_index >= self.songs.len() {
            return;
        }

        let mut rng = rand::thread_rng();
        self.songs[from_index..].shuffle(&mut rng);
        debug!("🔀 Cola mezclada desde el índice {}", from_index);
    }

    /// Inserta justo debajo de la canción en curso (índice 1).
    pub fn insert_after_head(&mut self, song: Song) {
        let index = 1.min(self.songs.len());
        info!("➕ Agregada al tope de la cola: {}", song.title);
        self.songs.insert(index, song);
    }

    /// Mueve la entrada en `position` al índice 1. Válido solo para
    /// `2 <= position <= len - 1`: el índice 0 es la canción en curso y el 1
    /// ya es el tope.
    pub fn move_to_top(&mut self, position: usize) -> Result<String, MusicError> {
        if position < 2 || position >= self.songs.len() {
            return Err(MusicError::InvalidPosition(position));
        }

        let song = self.songs.remove(position);
        let title = song.title.clone();
        self.songs.insert(1, song);
        debug!("📍 Movida al tope de la cola: {}", title);
        Ok(title)
    }

    /// Saca la canción que acaba de terminar (o que se saltó).
    pub fn pop_front(&mut self) -> Option<Song> {
        if self.songs.is_empty() {
            return None;
        }
        Some(self.songs.remove(0))
    }

    pub fn clear(&mut self) {
        info!("🗑️ Cola limpiada");
        self.songs.clear();
    }

    /// Títulos desde el índice 1 en adelante (la canción en curso se excluye).
    pub fn upcoming_titles(&self, limit: usize) -> Vec<String> {
        self.songs
            .iter()
            .skip(1)
            .take(limit)
            .map(|s| s.title.clone())
            .collect()
    }
}
