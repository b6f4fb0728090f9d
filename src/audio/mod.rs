pub mod engine;
pub mod queue;
pub mod registry;
pub mod session;
pub mod voice;

pub use engine::PlaybackEngine;
pub use queue::{Song, SongQueue};
pub use registry::SessionRegistry;
pub use session::{PlaybackSession, PlaybackState};
