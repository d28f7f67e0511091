use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// User ids are small integers assigned at registration (max + 1).
pub type Id = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Volunteer,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "parent" => Some(Role::Parent),
            "volunteer" => Some(Role::Volunteer),
            _ => None,
        }
    }
}

/// Stored user record. Never serialized to API clients directly; see [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub contact: String,
    pub username: String,
    pub password: String, // plaintext, kept for compatibility with existing data files
    pub role: Role,
}

/// User as returned over the API (no password).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PublicUser {
    pub id: Id,
    pub name: String,
    pub contact: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            contact: u.contact.clone(),
            username: u.username.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub contact: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub enum AgeGroup {
    #[serde(rename = "0-3")]
    Toddler,
    #[serde(rename = "4-6")]
    Preschool,
    #[serde(rename = "7-8")]
    School,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Toddler, AgeGroup::Preschool, AgeGroup::School];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Toddler => "0-3",
            AgeGroup::Preschool => "4-6",
            AgeGroup::School => "7-8",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub parent_id: Id,
    pub name: String,
    pub age: u32,
    pub age_group: AgeGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub age_group: AgeGroup,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SubmissionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "accepted" => Some(SubmissionStatus::Accepted),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

/// Per-milestone status as seen on the parent dashboard; `NotStarted` has no stored record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    Pending,
    Accepted,
    Rejected,
}

impl From<SubmissionStatus> for ProgressStatus {
    fn from(s: SubmissionStatus) -> Self {
        match s {
            SubmissionStatus::Pending => ProgressStatus::Pending,
            SubmissionStatus::Accepted => ProgressStatus::Accepted,
            SubmissionStatus::Rejected => ProgressStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Declared content type decides the kind; anything not `image/*` is treated as video.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/") { MediaType::Image } else { MediaType::Video }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            _ => None,
        }
    }
}

/// A milestone submission (`milestoneStatus.json` record).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(rename = "_id")]
    pub id: String,
    pub child_id: String,
    pub milestone_id: String,
    pub status: SubmissionStatus,
    pub media_url: String,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub media_size: Option<f64>, // MB
    #[serde(default)]
    pub media_duration: Option<f64>, // seconds, videos only
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<Id>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Validated submission request, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub child_id: String,
    pub milestone_id: String,
    pub media_url: String,
    pub media_type: Option<MediaType>,
    pub media_size: Option<f64>,
    pub media_duration: Option<f64>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

impl NewSubmission {
    pub fn from_url(child_id: impl Into<String>, milestone_id: impl Into<String>, media_url: impl Into<String>) -> Self {
        Self {
            child_id: child_id.into(),
            milestone_id: milestone_id.into(),
            media_url: media_url.into(),
            media_type: None,
            media_size: None,
            media_duration: None,
            file_name: None,
            file_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn status(&self) -> SubmissionStatus {
        match self {
            Decision::Accept => SubmissionStatus::Accepted,
            Decision::Reject => SubmissionStatus::Rejected,
        }
    }
}

/// Validated review of a pending submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub decision: Decision,
    pub reviewer_id: Id,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: String,
    pub parent_id: Id,
    pub parent_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub replied_by: Option<Id>,
}

/// Original ticket (now closed) together with the reply record created for it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TicketExchange {
    pub ticket: Ticket,
    pub reply: Ticket,
}

/// Ids arrive as JSON numbers from the dashboards and as strings from form posts.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlexibleId {
    Number(Id),
    Text(String),
}

impl FlexibleId {
    pub fn as_id(&self) -> Option<Id> {
        match self {
            FlexibleId::Number(n) => Some(*n),
            FlexibleId::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FlexibleId::Number(n) => n.to_string(),
            FlexibleId::Text(s) => s.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_accepts_id_alias_and_age_group_labels() {
        let c: Child = serde_json::from_str(
            r#"{"id":"c1","parentId":1,"name":"Mia","age":2,"ageGroup":"0-3"}"#,
        )
        .unwrap();
        assert_eq!(c.id, "c1");
        assert_eq!(c.age_group, AgeGroup::Toddler);
        let out = serde_json::to_value(&c).unwrap();
        assert_eq!(out["_id"], "c1");
        assert_eq!(out["ageGroup"], "0-3");
    }

    #[test]
    fn media_type_from_declared_content_type() {
        assert_eq!(MediaType::from_content_type("image/png"), MediaType::Image);
        assert_eq!(MediaType::from_content_type("video/mp4"), MediaType::Video);
        assert_eq!(MediaType::from_content_type("application/octet-stream"), MediaType::Video);
    }

    #[test]
    fn flexible_id_parses_numbers_and_strings() {
        let n: FlexibleId = serde_json::from_str("9").unwrap();
        let s: FlexibleId = serde_json::from_str("\" 9 \"").unwrap();
        assert_eq!(n.as_id(), Some(9));
        assert_eq!(s.as_id(), Some(9));
        let bad: FlexibleId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(bad.as_id(), None);
    }
}
