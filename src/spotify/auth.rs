use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use parking_lot::RwLock;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

use super::models::TokenResponse;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Tokens de Spotify persistidos en disco, como el resto de la instalación:
/// sobreviven reinicios sin repetir el flujo de autorización.
pub struct SpotifyAuth {
    client_id: String,
    client_secret: String,
    access_token: RwLock<String>,
    refresh_token: String,
    access_token_path: PathBuf,
    http: reqwest::Client,
}

impl SpotifyAuth {
    /// Carga los tokens desde `data_dir` (archivos `access_token.txt` y
    /// `refresh_token.txt`). Ambos deben existir.
    pub fn load(
        data_dir: &Path,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Result<Self> {
        let access_token_path = data_dir.join("access_token.txt");
        let refresh_token_path = data_dir.join("refresh_token.txt");

        let access_token = std::fs::read_to_string(&access_token_path)
            .with_context(|| format!("No se pudo leer {}", access_token_path.display()))?
            .trim()
            .to_string();
        let refresh_token = std::fs::read_to_string(&refresh_token_path)
            .with_context(|| format!("No se pudo leer {}", refresh_token_path.display()))?
            .trim()
            .to_string();

        info!("🔑 Tokens de Spotify cargados desde {}", data_dir.display());

        // Toda llamada externa lleva timeout explícito
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("No se pudo construir el cliente HTTP")?;

        Ok(Self {
            client_id,
            client_secret,
            access_token: RwLock::new(access_token),
            refresh_token,
            access_token_path,
            http,
        })
    }

    pub fn current_token(&self) -> String {
        self.access_token.read().clone()
    }

    /// Canjea el refresh token por un access token nuevo y lo persiste.
    pub async fn refresh(&self) -> Result<()> {
        info!("🔄 Renovando access token de Spotify");

        let basic = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .http
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {basic}"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &self.refresh_token),
            ])
            .send()
            .await
            .context("Fallo la petición de refresh a Spotify")?;

        if !response.status().is_success() {
            anyhow::bail!("Refresh rechazado por Spotify: {}", response.status());
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Respuesta de refresh inválida")?;

        std::fs::write(&self.access_token_path, &token.access_token)
            .with_context(|| format!("No se pudo escribir {}", self.access_token_path.display()))?;
        *self.access_token.write() = token.access_token;

        info!("✅ Access token renovado y persistido");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_tokens(dir: &Path, access: &str, refresh: &str) {
        std::fs::write(dir.join("access_token.txt"), access).unwrap();
        std::fs::write(dir.join("refresh_token.txt"), refresh).unwrap();
    }

    #[test]
    fn load_reads_and_trims_tokens() {
        let dir = tempfile::tempdir().unwrap();
        write_tokens(dir.path(), "access-abc\n", "refresh-xyz\n");

        let auth = SpotifyAuth::load(
            dir.path(),
            "id".to_string(),
            "secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(auth.current_token(), "access-abc");
        assert_eq!(auth.refresh_token, "refresh-xyz");
    }

    #[test]
    fn load_fails_when_tokens_are_missing() {
        let dir = tempfile::tempdir().unwrap();

        let result = SpotifyAuth::load(
            dir.path(),
            "id".to_string(),
            "secret".to_string(),
            Duration::from_secs(5),
        );

        assert!(result.is_err());
    }
}
