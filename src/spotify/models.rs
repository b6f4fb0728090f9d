use serde::Deserialize;

/// Referencia de pista de catálogo, ya aplanada para el resto del bot.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRef {
    pub name: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub uri: String,
}

/// Playlist del usuario (solo lo que los comandos necesitan).
#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistsResponse {
    pub items: Vec<Playlist>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTracksResponse {
    pub items: Vec<PlaylistItem>,
}

/// Las pistas locales o eliminadas llegan con `track: null`.
#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
pub struct TrackObject {
    pub name: String,
    pub uri: String,
    pub artists: Vec<ArtistObject>,
    pub album: AlbumObject,
}

#[derive(Debug, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumObject {
    #[serde(default)]
    pub images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
pub struct ImageObject {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: TracksPage,
}

#[derive(Debug, Deserialize)]
pub struct TracksPage {
    pub items: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

impl From<TrackObject> for TrackRef {
    fn from(track: TrackObject) -> Self {
        let artist = track
            .artists
            .first()
            .map(|a| a.name.clone())
            .unwrap_or_default();
        // La primera imagen del álbum es la de mayor resolución
        let artwork_url = track.album.images.first().map(|i| i.url.clone());

        Self {
            name: track.name,
            artist,
            artwork_url,
            uri: track.uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn playlist_tracks_skip_null_entries() {
        let body = r#"{
            "items": [
                {"track": null},
                {"track": {
                    "name": "Paranoid",
                    "uri": "spotify:track:abc",
                    "artists": [{"name": "Black Sabbath"}],
                    "album": {"images": [{"url": "https://img/large.jpg"}, {"url": "https://img/small.jpg"}]}
                }}
            ]
        }"#;

        let parsed: PlaylistTracksResponse = serde_json::from_str(body).unwrap();
        let tracks: Vec<TrackRef> = parsed
            .items
            .into_iter()
            .filter_map(|item| item.track.map(TrackRef::from))
            .collect();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Paranoid");
        assert_eq!(tracks[0].artist, "Black Sabbath");
        assert_eq!(tracks[0].uri, "spotify:track:abc");
        assert_eq!(tracks[0].artwork_url.as_deref(), Some("https://img/large.jpg"));
    }

    #[test]
    fn track_without_images_has_no_artwork() {
        let body = r#"{
            "name": "Local Song",
            "uri": "spotify:local:xyz",
            "artists": [],
            "album": {}
        }"#;

        let track: TrackObject = serde_json::from_str(body).unwrap();
        let track_ref = TrackRef::from(track);

        assert_eq!(track_ref.artist, "");
        assert!(track_ref.artwork_url.is_none());
    }

    #[test]
    fn search_response_parses_track_page() {
        let body = r#"{
            "tracks": {
                "items": [{
                    "name": "Song",
                    "uri": "spotify:track:1",
                    "artists": [{"name": "A"}],
                    "album": {"images": []}
                }]
            }
        }"#;

        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.tracks.items.len(), 1);
    }
}
