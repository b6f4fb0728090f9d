use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{SearchHit, TrackSearcher};
use crate::error::MusicError;

/// Cliente de búsqueda sobre yt-dlp.
pub struct YtSearchClient {
    limit: usize,
}

/// Entrada de `--dump-json --flat-playlist`: según el extractor, la URL del
/// video puede venir en `webpage_url`, `url` o solo como `id`.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: Option<String>,
    title: String,
    url: Option<String>,
    webpage_url: Option<String>,
    thumbnail: Option<String>,
}

impl YtSearchClient {
    pub fn new() -> Self {
        Self { limit: 1 }
    }

    async fn run_search(&self, query: &str) -> Result<Vec<SearchHit>> {
        info!("🔍 Buscando en YouTube: {}", query);

        let search_query = format!("ytsearch{}:{}", self.limit, query);

        let output = Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                &search_query,
            ])
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut hits = Vec::new();

        for line in stdout.lines() {
            if let Ok(entry) = serde_json::from_str::<YtDlpEntry>(line) {
                if let Some(hit) = entry_to_hit(entry) {
                    hits.push(hit);
                }
            }
        }

        debug!("🔍 {} resultados para '{}'", hits.len(), query);
        Ok(hits)
    }
}

impl Default for YtSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackSearcher for YtSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, MusicError> {
        self.run_search(query)
            .await
            .map_err(|e| MusicError::Search(e.to_string()))
    }
}

fn entry_to_hit(entry: YtDlpEntry) -> Option<SearchHit> {
    let url = entry
        .webpage_url
        .or(entry.url)
        .or_else(|| {
            entry
                .id
                .map(|id| format!("https://www.youtube.com/watch?v={id}"))
        })?;

    Some(SearchHit {
        title: entry.title,
        url,
        thumbnail: entry.thumbnail,
    })
}
