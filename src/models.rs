use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

pub const COMMUNITY_NAME_MAX: usize = 100;
pub const COMMUNITY_DESCRIPTION_MAX: usize = 500;
pub const POST_TITLE_MAX: usize = 100;
pub const COMMENT_CONTENT_MAX: usize = 500;
pub const FLAIR_CONTENT_MAX: usize = 30;

/// A vote's value. Absence from a voter registry means `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Voter {
    #[schema(value_type = i64)]
    pub user_id: Id,
    pub direction: VoteDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Community {
    #[schema(value_type = i64)]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<String>,
    pub creators: Vec<String>,
    #[schema(value_type = Vec<i64>)]
    pub post_ids: Vec<Id>,
}

impl Community {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Post {
    #[schema(value_type = i64)]
    pub id: Id,
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<i64>)]
    pub flair_id: Option<Id>,
    pub view_count: i64,
    #[schema(value_type = Vec<i64>)]
    pub child_comment_ids: Vec<Id>,
    pub vote_count: i64,
    pub voters: Vec<Voter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    #[schema(value_type = i64)]
    pub id: Id,
    pub content: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Vec<i64>)]
    pub child_comment_ids: Vec<Id>,
    pub vote_count: i64,
    pub voters: Vec<Voter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkFlair {
    #[schema(value_type = i64)]
    pub id: Id,
    pub content: String,
}

/// Stored user record. Never serialized to API clients directly, see [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub reputation: i64,
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    #[schema(value_type = i64)]
    pub id: Id,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub reputation: i64,
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            first_name: u.first_name,
            last_name: u.last_name,
            reputation: u.reputation,
            joined_at: u.joined_at,
            is_admin: u.is_admin,
        }
    }
}

/// The authenticated party behind a request, as resolved from its token and
/// the current user record.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Id,
    pub display_name: String,
    pub reputation: i64,
    pub is_admin: bool,
}

impl From<&User> for Caller {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.id,
            display_name: u.display_name.clone(),
            reputation: u.reputation,
            is_admin: u.is_admin,
        }
    }
}

// ---------------- request payloads ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterUser {
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCommunity {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCommunity {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    #[schema(value_type = i64)]
    pub community_id: Id,
    pub title: String,
    pub content: String,
    #[schema(value_type = Option<i64>)]
    pub flair_id: Option<Id>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub flair_id: Option<Id>,
}

/// Exactly one of `post_id` / `parent_comment_id` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub content: String,
    #[schema(value_type = Option<i64>)]
    pub post_id: Option<Id>,
    #[schema(value_type = Option<i64>)]
    pub parent_comment_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateComment {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewLinkFlair {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

// ---------------- response views ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteOutcome {
    pub vote_count: i64,
    pub author_reputation: i64,
    pub voter_reputation: i64,
    pub user_vote: VoteDirection,
}

/// A post as shown in listings, with the comment-derived fields filled in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    #[schema(value_type = Option<i64>)]
    pub community_id: Option<Id>,
    pub comment_count: usize,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostOrder {
    #[default]
    Newest,
    Oldest,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}
