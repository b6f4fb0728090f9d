use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use super::TrackSearcher;
use crate::{
    audio::Song,
    error::MusicError,
    spotify::{models::TrackRef, PlaylistCatalog},
};

/// Traductor de referencias de catálogo y texto libre a canciones con URL
/// reproducible de YouTube.
pub struct TrackResolver {
    searcher: Arc<dyn TrackSearcher>,
    catalog: Arc<dyn PlaylistCatalog>,
    timeout: Duration,
}

impl TrackResolver {
    pub fn new(
        searcher: Arc<dyn TrackSearcher>,
        catalog: Arc<dyn PlaylistCatalog>,
        timeout: Duration,
    ) -> Self {
        Self {
            searcher,
            catalog,
            timeout,
        }
    }

    /// Resuelve una pista de catálogo. El título de cola se fija como
    /// "{nombre} by {artista}" y la carátula viene del propio catálogo.
    /// Timeout o falta de resultados descartan la pista sin cortar el lote.
    pub async fn resolve_catalog_track(&self, track: &TrackRef) -> Option<Song> {
        let query = format!("{} {}", track.name, track.artist);

        let hits = match tokio::time::timeout(self.timeout, self.searcher.search(&query)).await {
            Err(_) => {
                warn!("⏰ Timeout resolviendo '{}', se descarta", query);
                return None;
            }
            Ok(Err(e)) => {
                warn!("⚠️ Búsqueda fallida para '{}': {}, se descarta", query, e);
                return None;
            }
            Ok(Ok(hits)) => hits,
        };

        let hit = hits.into_iter().next()?;
        debug!("✅ '{}' resuelta a {}", query, hit.url);

        Some(Song::new(
            format!("{} by {}", track.name, track.artist),
            hit.url,
            track.artwork_url.clone(),
        ))
    }

    /// Resuelve texto libre del usuario. A diferencia del lote de playlist,
    /// acá el timeout sí se reporta como error. La carátula se busca en el
    /// catálogo como mejor esfuerzo: su falla no tumba la resolución.
    pub async fn resolve_free_text(&self, query: &str) -> Result<Option<Song>, MusicError> {
        let hits = tokio::time::timeout(self.timeout, self.searcher.search(query))
            .await
            .map_err(|_| MusicError::Timeout("search"))??;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let artwork = match tokio::time::timeout(self.timeout, self.catalog.search_tracks(query))
            .await
        {
            Ok(Ok(tracks)) => tracks.into_iter().next().and_then(|t| t.artwork_url),
            Ok(Err(e)) => {
                debug!("⚠️ Sin carátula para '{}': {}", query, e);
                None
            }
            Err(_) => {
                debug!("⏰ Timeout buscando carátula para '{}'", query);
                None
            }
        };

        let artwork = artwork.or(hit.thumbnail);
        Ok(Some(Song::new(hit.title, hit.url, artwork)))
    }

    /// Resuelve un lote de pistas de catálogo en orden, descartando las que
    /// fallan. El resultado puede ser más corto que la entrada.
    pub async fn resolve_playlist(&self, tracks: &[TrackRef]) -> Vec<Song> {
        let mut songs = Vec::with_capacity(tracks.len());
        for track in tracks {
            if let Some(song) = self.resolve_catalog_track(track).await {
                songs.push(song);
            }
        }
        debug!("📋 Resueltas {}/{} pistas del lote", songs.len(), tracks.len());
        songs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockTrackSearcher, SearchHit};
    use crate::spotify::{MockPlaylistCatalog, Playlist};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn track(name: &str, artist: &str) -> TrackRef {
        TrackRef {
            name: name.to_string(),
            artist: artist.to_string(),
            artwork_url: Some(format!("https://img/{name}.jpg")),
            uri: format!("spotify:track:{name}"),
        }
    }

    fn hit(title: &str, url: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            url: url.to_string(),
            thumbnail: None,
        }
    }

    fn resolver(
        searcher: MockTrackSearcher,
        catalog: MockPlaylistCatalog,
    ) -> TrackResolver {
        TrackResolver::new(
            Arc::new(searcher),
            Arc::new(catalog),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn playlist_resolves_only_the_matchable_tracks() {
        let mut searcher = MockTrackSearcher::new();
        searcher
            .expect_search()
            .withf(|q| q == "Uno ArtistA")
            .returning(|_| Ok(vec![hit("Uno", "https://youtu.be/uno")]));
        searcher
            .expect_search()
            .withf(|q| q == "Dos ArtistB")
            .returning(|_| Ok(vec![]));
        searcher
            .expect_search()
            .withf(|q| q == "Tres ArtistC")
            .returning(|_| Ok(vec![hit("Tres", "https://youtu.be/tres")]));

        let resolver = resolver(searcher, MockPlaylistCatalog::new());
        let songs = resolver
            .resolve_playlist(&[
                track("Uno", "ArtistA"),
                track("Dos", "ArtistB"),
                track("Tres", "ArtistC"),
            ])
            .await;

        let titles: Vec<_> = songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Uno by ArtistA", "Tres by ArtistC"]);
        assert_eq!(songs[0].source_url, "https://youtu.be/uno");
        assert_eq!(songs[0].artwork_url.as_deref(), Some("https://img/Uno.jpg"));
    }

    #[tokio::test]
    async fn catalog_track_keeps_first_hit_only() {
        let mut searcher = MockTrackSearcher::new();
        searcher.expect_search().returning(|_| {
            Ok(vec![
                hit("primero", "https://youtu.be/1"),
                hit("segundo", "https://youtu.be/2"),
            ])
        });

        let resolver = resolver(searcher, MockPlaylistCatalog::new());
        let song = resolver
            .resolve_catalog_track(&track("Canción", "Alguien"))
            .await
            .unwrap();

        assert_eq!(song.source_url, "https://youtu.be/1");
        assert_eq!(song.title, "Canción by Alguien");
    }

    #[tokio::test]
    async fn free_text_survives_catalog_failure() {
        let mut searcher = MockTrackSearcher::new();
        searcher.expect_search().returning(|_| {
            Ok(vec![SearchHit {
                title: "algo".to_string(),
                url: "https://youtu.be/x".to_string(),
                thumbnail: Some("https://thumb/x.jpg".to_string()),
            }])
        });

        let mut catalog = MockPlaylistCatalog::new();
        catalog
            .expect_search_tracks()
            .returning(|_| Err(MusicError::Catalog("rate limited".to_string())));

        let resolver = resolver(searcher, catalog);
        let song = resolver.resolve_free_text("algo").await.unwrap().unwrap();

        assert_eq!(song.title, "algo");
        // Sin catálogo, la miniatura del buscador es el fallback
        assert_eq!(song.artwork_url.as_deref(), Some("https://thumb/x.jpg"));
    }

    #[tokio::test]
    async fn free_text_without_hits_is_none() {
        let mut searcher = MockTrackSearcher::new();
        searcher.expect_search().returning(|_| Ok(vec![]));

        let resolver = resolver(searcher, MockPlaylistCatalog::new());
        let song = resolver.resolve_free_text("nada de nada").await.unwrap();

        assert!(song.is_none());
    }

    /// Catálogo que nunca responde a tiempo.
    struct SlowCatalog;

    #[async_trait]
    impl crate::spotify::PlaylistCatalog for SlowCatalog {
        async fn get_user_playlists(&self) -> Result<Vec<Playlist>, MusicError> {
            unimplemented!()
        }

        async fn get_playlist_tracks(
            &self,
            _playlist_id: &str,
        ) -> Result<Vec<TrackRef>, MusicError> {
            unimplemented!()
        }

        async fn search_tracks(&self, _query: &str) -> Result<Vec<TrackRef>, MusicError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(vec![track("tarde", "alguien")])
        }

        async fn add_tracks(&self, _playlist_id: &str, _uris: &[String]) -> Result<(), MusicError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn free_text_artwork_lookup_timeout_is_swallowed() {
        let mut searcher = MockTrackSearcher::new();
        searcher.expect_search().returning(|_| {
            Ok(vec![SearchHit {
                title: "algo".to_string(),
                url: "https://youtu.be/x".to_string(),
                thumbnail: Some("https://thumb/x.jpg".to_string()),
            }])
        });

        let resolver = TrackResolver::new(
            Arc::new(searcher),
            Arc::new(SlowCatalog),
            Duration::from_millis(50),
        );

        let song = resolver.resolve_free_text("algo").await.unwrap().unwrap();

        // La carátula vencida no tumba la resolución: fallback del buscador
        assert_eq!(song.title, "algo");
        assert_eq!(song.artwork_url.as_deref(), Some("https://thumb/x.jpg"));
    }

    #[tokio::test]
    async fn free_text_prefers_catalog_artwork() {
        let mut searcher = MockTrackSearcher::new();
        searcher
            .expect_search()
            .returning(|_| Ok(vec![hit("algo", "https://youtu.be/x")]));

        let mut catalog = MockPlaylistCatalog::new();
        catalog
            .expect_search_tracks()
            .returning(|_| Ok(vec![track("algo", "alguien")]));

        let resolver = resolver(searcher, catalog);
        let song = resolver.resolve_free_text("algo").await.unwrap().unwrap();

        assert_eq!(song.artwork_url.as_deref(), Some("https://img/algo.jpg"));
    }
}
