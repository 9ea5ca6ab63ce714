//! Post model: a fashion showcase that stays hidden until moderated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateUrl, ValidationError};

use crate::validation::validate_tags;

/// A full post row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "thumbnail_url")]
    pub thumbnail: String,
    #[sqlx(rename = "image1_url")]
    pub image1: String,
    #[sqlx(rename = "image2_url")]
    pub image2: String,
    #[sqlx(rename = "image3_url")]
    pub image3: String,
    #[sqlx(rename = "image4_url")]
    pub image4: String,
    #[sqlx(rename = "image5_url")]
    pub image5: String,
    /// Equipment snapshot as sent by the client (GW2 build data)
    pub equipments: Option<serde_json::Value>,
    pub author_name: String,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub likes_count: i32,
    /// False until a moderator approves the post
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// Listing card used by the front page grid.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    #[sqlx(rename = "thumbnail_url")]
    pub thumbnail: String,
    pub author_name: String,
    pub likes_count: i32,
}

/// Popularity window for `/posts/popular`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Week,
    Month,
    AllTime,
}

impl Timeframe {
    /// Unknown or missing values mean all time.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            _ => Self::AllTime,
        }
    }
}

/// Create-post request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(custom(function = trimmed_title))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,

    #[serde(default)]
    #[validate(custom(function = image_url))]
    pub thumbnail_url: String,
    #[serde(default)]
    #[validate(custom(function = image_url))]
    pub image1_url: String,
    #[serde(default)]
    #[validate(custom(function = image_url))]
    pub image2_url: String,
    #[serde(default)]
    #[validate(custom(function = image_url))]
    pub image3_url: String,
    #[serde(default)]
    #[validate(custom(function = image_url))]
    pub image4_url: String,
    #[serde(default)]
    #[validate(custom(function = image_url))]
    pub image5_url: String,

    #[serde(default)]
    pub equipments: Option<serde_json::Value>,

    #[serde(default)]
    #[validate(custom(function = validate_tags))]
    pub tags: Vec<String>,
}

/// Length is counted on the trimmed title, which is what gets stored.
fn trimmed_title(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if (1..=200).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("length").with_message("Title must be 1-200 characters".into()))
    }
}

/// Empty means "no image"; anything else must parse as a URL.
fn image_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_url() {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message("Image fields must be valid URLs".into()))
    }
}

/// Insert payload for a new post. Posts are always created unpublished.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub image_urls: [String; 5],
    pub equipments: Option<serde_json::Value>,
    pub author_name: String,
    pub tags: Vec<String>,
}

impl CreatePostRequest {
    pub fn into_new_post(self, author_name: &str) -> NewPost {
        NewPost {
            title: self.title.trim().to_owned(),
            description: self.description,
            thumbnail_url: self.thumbnail_url,
            image_urls: [
                self.image1_url,
                self.image2_url,
                self.image3_url,
                self.image4_url,
                self.image5_url,
            ],
            equipments: self.equipments.filter(|v| !v.is_null()),
            author_name: author_name.to_owned(),
            tags: self.tags.into_iter().map(|t| t.trim().to_owned()).collect(),
        }
    }
}

/// Filters accepted by post search.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    /// Every tag must be present on the post
    pub tags: Vec<String>,
    pub author_name: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_request;

    fn request(json: serde_json::Value) -> CreatePostRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn minimal_request_is_valid() {
        let req = request(serde_json::json!({ "title": "Sylvari in Bloom" }));
        assert!(validate_request(&req).is_ok());
        let post = req.into_new_post("Petal.4821");
        assert_eq!(post.author_name, "Petal.4821");
        assert!(post.tags.is_empty());
        assert!(post.image_urls.iter().all(String::is_empty));
    }

    #[test]
    fn blank_title_is_rejected() {
        let req = request(serde_json::json!({ "title": "" }));
        let err = validate_request(&req).unwrap_err();
        assert!(err.to_string().contains("Title must be 1-200 characters"));
    }

    #[test]
    fn whitespace_only_title_is_rejected() {
        let req = request(serde_json::json!({ "title": "    " }));
        let err = validate_request(&req).unwrap_err();
        assert!(err.to_string().contains("Title must be 1-200 characters"));

        // Surrounding spaces do not count towards the limit.
        let padded = format!("  {}  ", "a".repeat(200));
        let req = request(serde_json::json!({ "title": padded }));
        assert!(validate_request(&req).is_ok());
        assert_eq!(req.into_new_post("Rytlock.2000").title.len(), 200);
    }

    #[test]
    fn image_fields_must_be_urls() {
        let req = request(serde_json::json!({
            "title": "Charr chic",
            "thumbnailUrl": "https://i.imgur.com/abc.png",
            "image2Url": "not a url"
        }));
        let err = validate_request(&req).unwrap_err();
        assert!(err.to_string().contains("valid URLs"));
    }

    #[test]
    fn camel_case_fields_map_to_slots() {
        let req = request(serde_json::json!({
            "title": "  Asuran lab coat  ",
            "image1Url": "https://example.com/1.png",
            "image5Url": "https://example.com/5.png",
            "equipments": null,
            "tags": [" asura ", "light"]
        }));
        let post = req.into_new_post("Zojja.1000");
        assert_eq!(post.title, "Asuran lab coat");
        assert_eq!(post.image_urls[0], "https://example.com/1.png");
        assert_eq!(post.image_urls[4], "https://example.com/5.png");
        assert!(post.equipments.is_none());
        assert_eq!(post.tags, vec!["asura", "light"]);
    }

    #[test]
    fn timeframe_parsing() {
        assert_eq!(Timeframe::parse(Some("week")), Timeframe::Week);
        assert_eq!(Timeframe::parse(Some("month")), Timeframe::Month);
        assert_eq!(Timeframe::parse(Some("year")), Timeframe::AllTime);
        assert_eq!(Timeframe::parse(None), Timeframe::AllTime);
    }
}
