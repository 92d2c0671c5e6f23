use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Moderation state of a comment. Any state may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl CommentStatus {
    pub const ALL: [CommentStatus; 4] = [
        CommentStatus::Pending,
        CommentStatus::Approved,
        CommentStatus::Rejected,
        CommentStatus::Flagged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "PENDING",
            CommentStatus::Approved => "APPROVED",
            CommentStatus::Rejected => "REJECTED",
            CommentStatus::Flagged => "FLAGGED",
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(CommentStatus::Pending),
            "APPROVED" => Ok(CommentStatus::Approved),
            "REJECTED" => Ok(CommentStatus::Rejected),
            "FLAGGED" => Ok(CommentStatus::Flagged),
            other => Err(format!("Unknown comment status: {}", other)),
        }
    }
}

/// Who caused a status change: staff, the community, or the system itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangedBy {
    Staff,
    Community,
    #[default]
    System,
}

impl ChangedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedBy::Staff => "STAFF",
            ChangedBy::Community => "COMMUNITY",
            ChangedBy::System => "SYSTEM",
        }
    }
}

impl fmt::Display for ChangedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangedBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAFF" => Ok(ChangedBy::Staff),
            "COMMUNITY" => Ok(ChangedBy::Community),
            "SYSTEM" => Ok(ChangedBy::System),
            other => Err(format!("Unknown status change origin: {}", other)),
        }
    }
}

/// Article-level gate on whether new comments are accepted and counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommentingStatus {
    #[default]
    Open,
    Closed,
}

impl CommentingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentingStatus::Open => "OPEN",
            CommentingStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for CommentingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(CommentingStatus::Open),
            "CLOSED" => Ok(CommentingStatus::Closed),
            other => Err(format!("Unknown commenting status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "MODERATOR" => Ok(Role::Moderator),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author_id: String,
    pub article_id: i64,
    pub parent_id: Option<i64>,
    pub status: CommentStatus,
    pub like_count: i64,
    pub flagged_count: i64,
    pub reviewed_by_id: Option<String>,
    /// Bumped on every status transition; used for compare-and-swap updates.
    pub version: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// One row of the append-only moderation audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: i64,
    pub comment_id: i64,
    pub old_status: CommentStatus,
    pub new_status: CommentStatus,
    pub changed_by: ChangedBy,
    pub changed_by_id: Option<String>,
    pub changed_reason: Option<String>,
    pub changed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// Identifier assigned by the publishing site.
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub author_id: String,
    pub status: CommentingStatus,
    pub created_at: NaiveDateTime,
}

impl Article {
    pub fn is_open(&self) -> bool {
        self.status == CommentingStatus::Open
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub deleted: bool,
    pub suspended: bool,
    pub suspended_until: Option<NaiveDateTime>,
    pub suspended_reason: Option<String>,
    pub suspended_by_id: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A reference to the user performing an operation, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRef {
    ById(String),
    ByEmail(String),
}

impl ActorRef {
    /// Builds a reference from the optional id/email pair found in request bodies.
    /// The id takes precedence when both are present.
    pub fn from_parts(id: Option<String>, email: Option<String>) -> Option<Self> {
        let id = id.filter(|s| !s.trim().is_empty());
        let email = email.filter(|s| !s.trim().is_empty());
        match (id, email) {
            (Some(id), _) => Some(ActorRef::ById(id)),
            (None, Some(email)) => Some(ActorRef::ByEmail(email)),
            (None, None) => None,
        }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRef::ById(id) => write!(f, "id:{}", id),
            ActorRef::ByEmail(email) => write!(f, "email:{}", email),
        }
    }
}

/// A comment with its replies, as rendered for moderation review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    /// Total number of comments in this subtree, including the node itself.
    pub fn comment_count(&self) -> usize {
        1 + self.replies.iter().map(ThreadNode::comment_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Count for the hour starting at `hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyCount {
    pub hour: NaiveDateTime,
    pub count: i64,
}

/// An article ranked by how many comments it received today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleActivity {
    pub article_id: i64,
    pub title: String,
    pub url: String,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModerationStats {
    pub total_comments: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub flagged: i64,
    pub new_comments_today: i64,
    pub active_users: i64,
    /// Seven entries, oldest day first, ending today. Days without sign-ups are zero.
    pub new_users_last_7_days: Vec<DailyCount>,
    /// 24 entries, oldest hour first, ending with the current hour.
    pub comments_last_24_hours: Vec<HourlyCount>,
    /// Busiest articles today, most comments first.
    pub top_articles_today: Vec<ArticleActivity>,
}
