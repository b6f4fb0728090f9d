pub mod embeds;

use async_trait::async_trait;
use serenity::{all::ChannelId, builder::CreateMessage, http::Http};
use std::sync::Arc;
use tracing::error;

/// Respuesta estructurada del núcleo. Cada comando devuelve exactamente una,
/// y las notificaciones del motor de reproducción usan el mismo formato.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiMessage {
    pub kind: MessageKind,
    pub text: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

impl UiMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            text: text.into(),
            title: None,
            thumbnail: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
            title: None,
            thumbnail: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }
}

/// Canal de salida de una sesión: a dónde van los "now playing", los skips y
/// el aviso de cola terminada.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: UiMessage);
}

/// Notifier real: publica embeds en el canal de texto donde se invocó el
/// comando que creó la sesión.
pub struct ChannelNotifier {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, message: UiMessage) {
        let embed = embeds::render(&message);
        if let Err(e) = self
            .channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await
        {
            error!("❌ Error enviando notificación al canal: {:?}", e);
        }
    }
}
