//! Fluent embed builder.

use crate::types::{Embed, EmbedField, EmbedFooter, EmbedImage};

/// ```rust
/// use gw2style_discord::builders::EmbedBuilder;
///
/// let embed = EmbedBuilder::new()
///     .title("Hello")
///     .description("Tyria")
///     .color(3447003)
///     .build();
/// assert_eq!(embed.color, Some(3447003));
/// ```
#[derive(Default)]
pub struct EmbedBuilder {
    inner: Embed,
}

impl EmbedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.inner.title = Some(v.into());
        self
    }

    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.inner.description = Some(v.into());
        self
    }

    pub fn color(mut self, v: u32) -> Self {
        self.inner.color = Some(v);
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.inner.footer = Some(EmbedFooter { text: text.into(), icon_url: None });
        self
    }

    /// Set the thumbnail; an empty URL leaves it unset.
    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.inner.thumbnail = (!url.is_empty()).then_some(EmbedImage { url });
        self
    }

    pub fn thumbnail_image(mut self, image: Option<EmbedImage>) -> Self {
        self.inner.thumbnail = image;
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.inner.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = EmbedField>) -> Self {
        self.inner.fields.extend(fields);
        self
    }

    pub fn build(self) -> Embed {
        self.inner
    }
}
