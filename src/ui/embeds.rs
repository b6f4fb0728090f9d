use serenity::{all::Timestamp, builder::CreateEmbed};

use crate::ui::{MessageKind, UiMessage};

/// Paleta de colores del bot
pub mod colors {
    use serenity::all::Colour;

    pub const INFO_GREEN: Colour = Colour::from_rgb(0, 255, 0);
    pub const ERROR_RED: Colour = Colour::from_rgb(255, 0, 0);
}

/// Convierte una respuesta estructurada del núcleo en un embed de Discord.
pub fn render(message: &UiMessage) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .description(message.text.clone())
        .timestamp(Timestamp::now());

    embed = match message.kind {
        MessageKind::Info => embed.color(colors::INFO_GREEN),
        MessageKind::Error => embed.color(colors::ERROR_RED),
    };

    if let Some(title) = &message.title {
        embed = embed.title(title.clone());
    }

    if let Some(thumbnail) = &message.thumbnail {
        embed = embed.thumbnail(thumbnail.clone());
    }

    embed
}
