//! # Voting Core
//!
//! Resolution and submission for token-based email voting. Both HTTP handlers
//! and any in-process caller go through these two functions, so the link
//! checks exist in exactly one place.
//!
//! Check order, each step short-circuiting with its own error: active link by
//! token, expiry, vote status, already-voted. Expiry is derived at read time
//! (`now > expires_at`); the row itself is never touched by resolution.
//! Current time is always injected by the caller.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::AppError,
    model::{Building, Member, PersonalizedVotingLink, UserVote, Vote, VoteStatus},
    store::{Store, StoreError},
};

/// Everything the ballot screen needs, resolved from a single token.
#[derive(Debug, Clone, Serialize)]
pub struct VotingData {
    pub vote: Vote,
    pub member: Member,
    pub building: Building,
    pub has_voted: bool,
    pub link_id: Uuid,
}

/// One answered question as submitted by the ballot form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAnswer {
    pub question_id: String,
    pub option_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub vote: Vote,
    pub member: Member,
}

async fn checked_link(
    store: &dyn Store,
    token: &str,
    now: DateTime<Utc>,
) -> Result<(PersonalizedVotingLink, Vote, Member), AppError> {
    let link = store
        .active_link_by_token(token)
        .await?
        .ok_or(AppError::LinkInvalid)?;

    // A link expiring at this exact instant is still honored.
    if now > link.expires_at {
        return Err(AppError::LinkExpired);
    }

    let vote = store
        .vote(link.vote_id)
        .await?
        .ok_or(StoreError::MissingRow("vote referenced by link"))?;

    if vote.status != VoteStatus::Active {
        return Err(AppError::VoteNotActive);
    }

    let member = store
        .member(link.member_id)
        .await?
        .ok_or(StoreError::MissingRow("member referenced by link"))?;

    Ok((link, vote, member))
}

/// Validates a token and serves the ballot it grants access to.
///
/// The already-voted check is advisory, for display only; it does not consume
/// the link.
pub async fn resolve(
    store: &dyn Store,
    token: &str,
    now: DateTime<Utc>,
) -> Result<VotingData, AppError> {
    let (link, vote, member) = checked_link(store, token, now).await?;

    let has_voted = store.has_user_vote(link.vote_id, link.member_id).await?;

    let building = store
        .building(vote.building_id)
        .await?
        .ok_or(StoreError::MissingRow("building referenced by vote"))?;

    Ok(VotingData {
        vote,
        member,
        building,
        has_voted,
        link_id: link.id,
    })
}

/// Records a member's answers and burns the link, atomically.
///
/// Every precondition is re-verified here; a prior `resolve` is not trusted.
/// Answer shape (all questions answered, single-choice cardinality) is left
/// to the client, matching the system this replaces.
pub async fn submit(
    store: &dyn Store,
    token: &str,
    answers: &[VoteAnswer],
    now: DateTime<Utc>,
) -> Result<Submission, AppError> {
    let (link, vote, member) = checked_link(store, token, now).await?;

    if store.has_user_vote(link.vote_id, link.member_id).await? {
        return Err(AppError::AlreadyVoted);
    }

    let rows: Vec<UserVote> = answers
        .iter()
        .map(|answer| UserVote {
            id: Uuid::new_v4(),
            vote_id: link.vote_id,
            member_id: link.member_id,
            question_id: answer.question_id.clone(),
            option_ids: answer.option_ids.clone(),
            created_at: now,
        })
        .collect();

    // The store consumes the link and inserts the rows as one unit; losing
    // the conditional update means another submission got there first.
    if !store.record_submission(link.id, &rows, now).await? {
        return Err(AppError::AlreadyVoted);
    }

    // Best-effort counter; its loss never invalidates the recorded vote.
    if let Err(e) = store.increment_votes_received(link.vote_id).await {
        warn!("Failed to update voting session counter: {e}");
    }

    Ok(Submission { vote, member })
}
