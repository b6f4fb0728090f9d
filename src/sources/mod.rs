pub mod resolver;
pub mod youtube;

use async_trait::async_trait;

pub use resolver::TrackResolver;
pub use youtube::YtSearchClient;

use crate::error::MusicError;

/// Resultado de búsqueda: referencia reproducible más título para mostrar.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
}

/// Buscador de medios. La política de matching es deliberadamente ingenua:
/// el primer resultado gana, sin scoring propio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackSearcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, MusicError>;
}
