//! # Domain Model
//!
//! Row types for every table the store manages, plus the enums they embed.
//!
//! Buildings own members and votes. Questions and options are embedded in the
//! vote row as a JSON column, so a vote always travels with its full ballot.
//! User votes and personalized links reference votes and members by id only.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Chairman,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::Chairman => "chairman",
            MemberRole::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vote_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoteStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "template_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Voting,
    Reminder,
    Notification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Bounced,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Building {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: Uuid,
    pub building_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub unit_number: String,
    pub ownership_share: f64,
    pub role: MemberRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub building_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: VoteStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub questions: Vec<VoteQuestion>,
    pub observers: Option<Vec<String>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<VoteOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOption {
    pub id: String,
    pub text: String,
}

/// One recorded answer: a member's chosen options for one question of a vote.
///
/// A member is considered to have voted on a vote as soon as any row exists
/// for the (vote, member) pair, no matter which question it targets.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserVote {
    pub id: Uuid,
    pub vote_id: Uuid,
    pub member_id: Uuid,
    pub question_id: String,
    pub option_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Single-use, time-boxed token granting one member access to one ballot.
///
/// Lifecycle: active on creation, deactivated exactly once by a successful
/// submission (`used_at` set). Expiry is derived from `expires_at` at read
/// time; nothing sweeps expired rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonalizedVotingLink {
    pub id: Uuid,
    pub vote_id: Uuid,
    pub member_id: Uuid,
    pub token: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub name: String,
    pub category: TemplateCategory,
    pub subject: String,
    pub content: String,
    pub variables: Vec<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit row, one per outbound email attempt. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailDeliveryLog {
    pub id: Uuid,
    pub vote_id: Uuid,
    pub member_id: Uuid,
    pub template_id: Uuid,
    pub recipient_email: String,
    pub subject: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-vote aggregate counters. Best effort: losing an update here never
/// invalidates the vote itself.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VotingSession {
    pub vote_id: Uuid,
    pub total_members: i64,
    pub emails_sent: i64,
    pub votes_received: i64,
    pub last_reminder_sent: Option<DateTime<Utc>>,
}
