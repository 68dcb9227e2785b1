use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a stored or requested enum value is not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Account role. Matching always targets the opposite role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Freelancer,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Role::Client => Role::Freelancer,
            Role::Freelancer => Role::Client,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Freelancer => "freelancer",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "freelancer" => Ok(Role::Freelancer),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(ParseEnumError::new("gender", other)),
        }
    }
}

/// Lifecycle of an attachment record relative to its blob.
///
/// A record is `Pending` while its blob is being uploaded and only becomes
/// `InUse` once the storage backend confirmed the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStatus {
    Pending,
    InUse,
}

impl AttachmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentStatus::Pending => "pending",
            AttachmentStatus::InUse => "in_use",
        }
    }
}

impl FromStr for AttachmentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AttachmentStatus::Pending),
            "in_use" => Ok(AttachmentStatus::InUse),
            other => Err(ParseEnumError::new("attachment status", other)),
        }
    }
}

/// Persisted company row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCompany {
    pub name: String,
    pub description: String,
}

/// Persisted attachment row referencing a blob in object storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    #[serde(rename = "name")]
    pub file_name: String,
    pub path: String,
    pub status: AttachmentStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Attachment record prepared in memory, before its row is written
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub file_name: String,
    pub path: String,
    pub status: AttachmentStatus,
}

impl NewAttachment {
    pub fn pending(file_name: String) -> Self {
        Self {
            file_name,
            path: String::new(),
            status: AttachmentStatus::Pending,
        }
    }

    /// Record the storage-reported location once the blob upload succeeded
    pub fn mark_in_use(&mut self, path: String) {
        self.path = path;
        self.status = AttachmentStatus::InUse;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// Account row with its company and attachments resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(skip_serializing)]
    pub telegram_id: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub nickname: Option<String>,
    pub role: Role,
    pub about_me: Option<String>,
    pub gender: Gender,
    pub country: Option<String>,
    pub location: Option<String>,
    #[serde(skip)]
    pub company_id: Option<i64>,
    pub company: Option<Company>,
    #[serde(skip)]
    pub avatar_id: Option<i64>,
    pub avatar: Option<Attachment>,
    #[serde(skip)]
    pub document_id: Option<i64>,
    pub document: Option<Attachment>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Values for inserting a new account row
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub telegram_id: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub nickname: Option<String>,
    pub role: Role,
    pub about_me: Option<String>,
    pub gender: Gender,
    pub country: Option<String>,
    pub location: Option<String>,
    pub company_id: Option<i64>,
    pub avatar_id: Option<i64>,
    pub document_id: Option<i64>,
}

/// Account view model with its tag and category links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDetails {
    #[serde(flatten)]
    pub account: Account,
    pub tags: Vec<Tag>,
    pub categories: Vec<Category>,
}

/// Directional like edge (liker -> liked)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LikeAccount {
    pub liker_id: i64,
    pub liked_id: i64,
}

impl LikeAccount {
    pub fn reversed(self) -> Self {
        Self {
            liker_id: self.liked_id,
            liked_id: self.liker_id,
        }
    }
}

/// Directional dislike edge (disliker -> disliked)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DislikeAccount {
    pub disliker_id: i64,
    pub disliked_id: i64,
}

/// How the candidate feed is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Pure exclusion filter, ordered by account id for stable pages
    #[default]
    Exclusion,
    /// Least-seen candidates first, based on `account_seen.rating`
    SeenRating,
}

/// Candidate feed query parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateQuery {
    pub requester_id: i64,
    pub target_role: Role,
    pub limit: i64,
    pub ranking: Ranking,
}

/// Action a requester takes on a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchAction {
    Like,
    Dislike,
    Unknown(String),
}

impl MatchAction {
    pub fn parse(text: &str) -> Self {
        match text {
            "like" => MatchAction::Like,
            "dislike" => MatchAction::Dislike,
            other => MatchAction::Unknown(other.to_string()),
        }
    }
}

/// Outcome of a match action. A match is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Like,
    Dislike,
    Match,
}

/// Work item published by a client account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub owner_id: i64,
    pub title: String,
    pub description: String,
}

/// One page of results with the total number of eligible rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
    pub data: Vec<T>,
}
