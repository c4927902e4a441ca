//! # Link Issuer
//!
//! Mints personalized voting links: one opaque, unguessable token per
//! (vote, member) pair, valid for 30 days. Issuance never checks for an
//! existing unconsumed link, so repeated sends mint multiple valid links for
//! the same member; the already-voted guard at submission time is what keeps
//! that from producing duplicate ballots.
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    model::PersonalizedVotingLink,
    store::Store,
};

pub const LINK_VALIDITY_DAYS: i64 = 30;

/// Random UUID plus a millisecond timestamp disambiguator.
pub fn mint_token(now: DateTime<Utc>) -> String {
    format!("{}-{}", Uuid::new_v4(), now.timestamp_millis())
}

pub async fn issue_link(
    store: &dyn Store,
    vote_id: Uuid,
    member_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PersonalizedVotingLink, AppError> {
    let link = PersonalizedVotingLink {
        id: Uuid::new_v4(),
        vote_id,
        member_id,
        token: mint_token(now),
        is_active: true,
        expires_at: now + Duration::days(LINK_VALIDITY_DAYS),
        used_at: None,
        created_at: now,
    };

    store
        .insert_link(&link)
        .await
        .map_err(|_| AppError::IssuanceFailed)?;

    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_tokens_are_unique() {
        let now = Utc::now();
        assert_ne!(mint_token(now), mint_token(now));
    }

    #[tokio::test]
    async fn test_issue_sets_expiry_30_days_out() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let link = issue_link(&store, Uuid::new_v4(), Uuid::new_v4(), now)
            .await
            .unwrap();

        assert!(link.is_active);
        assert_eq!(link.used_at, None);
        assert_eq!(link.expires_at, now + Duration::days(30));
    }

    #[tokio::test]
    async fn test_repeated_issuance_mints_independent_links() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let vote_id = Uuid::new_v4();
        let member_id = Uuid::new_v4();

        let first = issue_link(&store, vote_id, member_id, now).await.unwrap();
        let second = issue_link(&store, vote_id, member_id, now).await.unwrap();

        assert_ne!(first.token, second.token);
        assert_eq!(store.links_for(vote_id).await.len(), 2);
    }
}
