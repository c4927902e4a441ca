//! # Persistent Store
//!
//! Boundary to the relational backend. Every component talks to rows through
//! the [`Store`] trait, so the voting core has exactly one copy of its checks
//! no matter which backend serves them.
//!
//! Two backends:
//! - [`postgres::PgStore`]: production backend over a `sqlx` Postgres pool.
//! - [`memory::MemoryStore`]: in-memory tables behind a single mutex, used by
//!   the test suite and as an embedded stand-in when no database is reachable.
//!
//! The one write with real invariants is [`Store::record_submission`]: it must
//! insert the answer rows and consume the link as a unit, conditional on the
//! link still being active. Both backends implement it atomically.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    Building, EmailDeliveryLog, EmailTemplate, Member, PersonalizedVotingLink, TemplateCategory,
    UserVote, Vote, VoteStatus, VotingSession,
};

pub mod memory;
pub mod postgres;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("row missing: {0}")]
    MissingRow(&'static str),
}

#[async_trait]
pub trait Store: Send + Sync {
    // Buildings.
    async fn building(&self, id: Uuid) -> Result<Option<Building>, StoreError>;
    async fn list_buildings(&self) -> Result<Vec<Building>, StoreError>;
    async fn insert_building(&self, building: &Building) -> Result<(), StoreError>;

    // Members.
    async fn member(&self, id: Uuid) -> Result<Option<Member>, StoreError>;
    async fn building_members(&self, building_id: Uuid) -> Result<Vec<Member>, StoreError>;
    async fn active_members(&self, building_id: Uuid) -> Result<Vec<Member>, StoreError>;
    async fn insert_members(&self, members: &[Member]) -> Result<(), StoreError>;
    async fn update_member(&self, member: &Member) -> Result<(), StoreError>;
    async fn delete_member(&self, id: Uuid) -> Result<(), StoreError>;

    // Votes.
    async fn vote(&self, id: Uuid) -> Result<Option<Vote>, StoreError>;
    async fn building_votes(&self, building_id: Uuid) -> Result<Vec<Vote>, StoreError>;
    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError>;
    async fn set_vote_status(
        &self,
        id: Uuid,
        status: VoteStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // Personalized voting links.
    async fn insert_link(&self, link: &PersonalizedVotingLink) -> Result<(), StoreError>;
    async fn active_link_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PersonalizedVotingLink>, StoreError>;

    // User votes.
    async fn has_user_vote(&self, vote_id: Uuid, member_id: Uuid) -> Result<bool, StoreError>;
    async fn user_votes(&self, vote_id: Uuid) -> Result<Vec<UserVote>, StoreError>;

    /// Insert the answer rows and consume the link as one unit.
    ///
    /// The link update is conditional on `is_active` still being true; when
    /// the condition fails nothing is written and `Ok(false)` is returned.
    async fn record_submission(
        &self,
        link_id: Uuid,
        rows: &[UserVote],
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn increment_votes_received(&self, vote_id: Uuid) -> Result<(), StoreError>;

    // Email templates.
    async fn template(&self, id: Uuid) -> Result<Option<EmailTemplate>, StoreError>;
    async fn default_template(
        &self,
        category: TemplateCategory,
    ) -> Result<Option<EmailTemplate>, StoreError>;
    async fn insert_template(&self, template: &EmailTemplate) -> Result<(), StoreError>;

    // Delivery audit trail and per-vote counters.
    async fn append_delivery_log(&self, log: &EmailDeliveryLog) -> Result<(), StoreError>;
    async fn upsert_session(&self, session: &VotingSession) -> Result<(), StoreError>;
    async fn stamp_reminder(&self, vote_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}
