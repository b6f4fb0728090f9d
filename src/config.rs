use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,

    // Spotify (client credentials para el refresh de tokens)
    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    // Paths (tokens persistidos en disco)
    pub data_dir: PathBuf,

    // Límites
    pub search_timeout_secs: u64,
    pub max_playlist_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,

            spotify_client_id: std::env::var("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: std::env::var("SPOTIFY_CLIENT_SECRET")?,

            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),

            // Toda llamada externa lleva timeout explícito
            search_timeout_secs: std::env::var("SEARCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
        };

        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Chequeos de sanidad sobre los valores cargados.
    pub fn validate(&self) -> Result<()> {
        if self.spotify_client_id.is_empty() || self.spotify_client_secret.is_empty() {
            anyhow::bail!("Spotify client credentials must not be empty");
        }

        if self.search_timeout_secs == 0 {
            anyhow::bail!("Search timeout must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            application_id: 0,
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            data_dir: "./data".into(),
            search_timeout_secs: 30,
            max_playlist_size: 100,
        }
    }
}
