pub mod auth;
pub mod models;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, warn};

pub use auth::SpotifyAuth;
pub use models::{Playlist, TrackRef};

use crate::error::MusicError;
use models::{PlaylistTracksResponse, PlaylistsResponse, SearchResponse};

const API_BASE: &str = "https://api.spotify.com/v1";
const SEARCH_LIMIT: u32 = 5;

/// Catálogo de playlists del usuario. Es la única puerta a la Web API de
/// Spotify que conocen los comandos.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistCatalog: Send + Sync {
    async fn get_user_playlists(&self) -> Result<Vec<Playlist>, MusicError>;
    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackRef>, MusicError>;
    async fn search_tracks(&self, query: &str) -> Result<Vec<TrackRef>, MusicError>;
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), MusicError>;
}

/// Falla de una llamada a la API, separando la expiración del token (que se
/// puede reparar con un refresh) de todo lo demás.
enum ApiFailure {
    Expired,
    Other(MusicError),
}

/// Ejecuta `op`; si el token expiró, renueva una única vez y reintenta. Una
/// segunda expiración tras el refresh es terminal.
async fn with_refresh<T, Op, Fut, R, RFut>(op: Op, refresh: R) -> Result<T, MusicError>
where
    Op: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiFailure>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<(), MusicError>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(ApiFailure::Other(e)) => Err(e),
        Err(ApiFailure::Expired) => {
            warn!("🔐 Token de Spotify expirado, renovando");
            refresh().await?;
            match op().await {
                Ok(value) => Ok(value),
                Err(ApiFailure::Expired) => Err(MusicError::AuthExpired),
                Err(ApiFailure::Other(e)) => Err(e),
            }
        }
    }
}

/// Cliente real contra la Web API de Spotify.
pub struct SpotifyClient {
    auth: Arc<SpotifyAuth>,
    http: reqwest::Client,
}

impl SpotifyClient {
    pub fn new(auth: Arc<SpotifyAuth>, timeout: Duration) -> AnyResult<Self> {
        // Toda llamada externa lleva timeout explícito
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("No se pudo construir el cliente HTTP")?;
        Ok(Self { auth, http })
    }

    async fn refresh_token(&self) -> Result<(), MusicError> {
        self.auth.refresh().await.map_err(|e| {
            warn!("❌ Refresh de Spotify fallido: {}", e);
            MusicError::AuthExpired
        })
    }

    /// Envía la petición con el token vigente y decodifica el cuerpo,
    /// traduciendo el 401 a expiración.
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiFailure> {
        let response = request
            .bearer_auth(self.auth.current_token())
            .send()
            .await
            .map_err(|e| ApiFailure::Other(MusicError::Catalog(e.to_string())))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiFailure::Expired);
        }
        if !response.status().is_success() {
            return Err(ApiFailure::Other(MusicError::Catalog(format!(
                "HTTP {}",
                response.status()
            ))));
        }

        response
            .json()
            .await
            .map_err(|e| ApiFailure::Other(MusicError::Catalog(e.to_string())))
    }

    async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ApiFailure> {
        let response = request
            .bearer_auth(self.auth.current_token())
            .send()
            .await
            .map_err(|e| ApiFailure::Other(MusicError::Catalog(e.to_string())))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiFailure::Expired);
        }
        if !response.status().is_success() {
            return Err(ApiFailure::Other(MusicError::Catalog(format!(
                "HTTP {}",
                response.status()
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaylistCatalog for SpotifyClient {
    async fn get_user_playlists(&self) -> Result<Vec<Playlist>, MusicError> {
        let playlists: PlaylistsResponse = with_refresh(
            || self.send_json(self.http.get(format!("{API_BASE}/me/playlists"))),
            || self.refresh_token(),
        )
        .await?;

        debug!("📋 {} playlists del usuario", playlists.items.len());
        Ok(playlists.items)
    }

    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackRef>, MusicError> {
        let tracks: PlaylistTracksResponse = with_refresh(
            || {
                self.send_json(
                    self.http
                        .get(format!("{API_BASE}/playlists/{playlist_id}/tracks")),
                )
            },
            || self.refresh_token(),
        )
        .await?;

        Ok(tracks
            .items
            .into_iter()
            .filter_map(|item| item.track.map(TrackRef::from))
            .collect())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<TrackRef>, MusicError> {
        let results: SearchResponse = with_refresh(
            || {
                self.send_json(self.http.get(format!("{API_BASE}/search")).query(&[
                    ("q", query),
                    ("type", "track"),
                    ("limit", &SEARCH_LIMIT.to_string()),
                ]))
            },
            || self.refresh_token(),
        )
        .await?;

        Ok(results
            .tracks
            .items
            .into_iter()
            .map(TrackRef::from)
            .collect())
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), MusicError> {
        with_refresh(
            || {
                self.send_empty(
                    self.http
                        .post(format!("{API_BASE}/playlists/{playlist_id}/tracks"))
                        .json(&serde_json::json!({ "uris": uris })),
                )
            },
            || self.refresh_token(),
        )
        .await
    }
}
