//! Message payloads sent through webhooks.

use gw2style_common::models::post::Post;

use crate::builders::EmbedBuilder;
use crate::types::{Embed, WebhookPayload};

pub const MODERATION_COLOR: u32 = 3447003;
pub const PUBLISHED_COLOR: u32 = 5763719;

/// Name of the embed field carrying the post id.
pub const POST_ID_FIELD: &str = "Post ID";

/// Notice posted to the moderation channel when a post is submitted.
pub fn moderation_notice(post: &Post) -> WebhookPayload {
    let tags = if post.tags.is_empty() {
        "None".to_owned()
    } else {
        post.tags.join(", ")
    };

    let embed = EmbedBuilder::new()
        .title("🆕 New Post Submitted")
        .description(format!("**{}**\n\n{}", post.title, post.description))
        .color(MODERATION_COLOR)
        .field("Author", &post.author_name, true)
        .field(POST_ID_FIELD, post.id.to_string(), true)
        .field("Tags", tags, false)
        .footer("React with ✅ to approve or ❌ to reject")
        .thumbnail(&post.thumbnail)
        .build();

    WebhookPayload {
        content: Some(format!(
            "📋 **New post awaiting moderation** (ID: {})",
            post.id
        )),
        embeds: vec![embed],
        ..Default::default()
    }
}

/// Public announcement for an approved post, built from the moderation embed.
pub fn public_announcement(post_id: i64, source: &Embed, site_url: &str) -> WebhookPayload {
    let link = format!("{}/posts/{post_id}", site_url.trim_end_matches('/'));

    let mut builder = EmbedBuilder::new()
        .title("✨ New Post Published!")
        .color(PUBLISHED_COLOR)
        .fields(source.fields.iter().cloned())
        .thumbnail_image(source.thumbnail.clone())
        .footer(format!("View on website: {link}"));
    if let Some(description) = &source.description {
        builder = builder.description(description);
    }

    WebhookPayload {
        content: Some(format!(
            "🎨 **New fashion post is live!** Check it out: {link}"
        )),
        embeds: vec![builder.build()],
        ..Default::default()
    }
}
