//! Moderation audit log, admin request bodies and user reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Reason recorded when a moderator approves a post.
pub const APPROVED_REASON: &str = "Approved by moderator";
/// Reason recorded when a rejection arrives without one.
pub const DEFAULT_REJECT_REASON: &str = "Rejected by moderator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Published,
    Rejected,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the moderation audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModerationLog {
    pub id: i64,
    pub post_id: i64,
    pub action: String,
    pub moderator_username: String,
    pub moderator_discord_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /admin/posts/{id}/publish`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublishPostRequest {
    #[validate(length(min = 1, max = 100, message = "moderator_username is required"))]
    pub moderator_username: String,
    #[serde(default)]
    pub moderator_discord_id: String,
}

/// Body of `POST /admin/posts/{id}/reject`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectPostRequest {
    #[validate(length(min = 1, max = 100, message = "moderator_username is required"))]
    pub moderator_username: String,
    #[serde(default)]
    pub moderator_discord_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

impl RejectPostRequest {
    /// The reason to record, falling back to the default wording.
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REJECT_REASON)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportReason {
    Nsfw,
    Spam,
    OffTopic,
    Harassment,
    Other,
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nsfw => "nsfw",
            Self::Spam => "spam",
            Self::OffTopic => "off-topic",
            Self::Harassment => "harassment",
            Self::Other => "other",
        }
    }
}

impl FromStr for ReportReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nsfw" => Ok(Self::Nsfw),
            "spam" => Ok(Self::Spam),
            "off-topic" => Ok(Self::OffTopic),
            "harassment" => Ok(Self::Harassment),
            "other" => Ok(Self::Other),
            other => Err(format!(
                "Invalid report reason '{other}', expected one of: nsfw, spam, off-topic, harassment, other"
            )),
        }
    }
}

/// Body of `POST /posts/{id}/report`. The reason is checked with
/// [`ReportReason::from_str`] so unknown values surface as 400s.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub reason: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: String,
}

/// A user report awaiting moderator review.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: i64,
    pub post_id: i64,
    pub reporter_username: String,
    pub reason: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}
