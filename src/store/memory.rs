//! In-memory backend: every table behind one mutex, so the submission write
//! is atomic for free. Backs the test suite; also usable as an embedded
//! stand-in when no database is configured.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::{
    Building, EmailDeliveryLog, EmailTemplate, Member, PersonalizedVotingLink, TemplateCategory,
    UserVote, Vote, VoteStatus, VotingSession,
};

#[derive(Default)]
struct Tables {
    buildings: Vec<Building>,
    members: Vec<Member>,
    votes: Vec<Vote>,
    links: Vec<PersonalizedVotingLink>,
    user_votes: Vec<UserVote>,
    templates: Vec<EmailTemplate>,
    delivery_logs: Vec<EmailDeliveryLog>,
    sessions: Vec<VotingSession>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivery_log_count(&self) -> usize {
        self.tables.lock().await.delivery_logs.len()
    }

    pub async fn user_vote_count(&self) -> usize {
        self.tables.lock().await.user_votes.len()
    }

    pub async fn session(&self, vote_id: Uuid) -> Option<VotingSession> {
        self.tables
            .lock()
            .await
            .sessions
            .iter()
            .find(|s| s.vote_id == vote_id)
            .cloned()
    }

    pub async fn links_for(&self, vote_id: Uuid) -> Vec<PersonalizedVotingLink> {
        self.tables
            .lock()
            .await
            .links
            .iter()
            .filter(|l| l.vote_id == vote_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn building(&self, id: Uuid) -> Result<Option<Building>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.buildings.iter().find(|b| b.id == id).cloned())
    }

    async fn list_buildings(&self) -> Result<Vec<Building>, StoreError> {
        Ok(self.tables.lock().await.buildings.clone())
    }

    async fn insert_building(&self, building: &Building) -> Result<(), StoreError> {
        self.tables.lock().await.buildings.push(building.clone());
        Ok(())
    }

    async fn member(&self, id: Uuid) -> Result<Option<Member>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.members.iter().find(|m| m.id == id).cloned())
    }

    async fn building_members(&self, building_id: Uuid) -> Result<Vec<Member>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .members
            .iter()
            .filter(|m| m.building_id == building_id)
            .cloned()
            .collect())
    }

    async fn active_members(&self, building_id: Uuid) -> Result<Vec<Member>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .members
            .iter()
            .filter(|m| m.building_id == building_id && m.is_active)
            .cloned()
            .collect())
    }

    async fn insert_members(&self, members: &[Member]) -> Result<(), StoreError> {
        self.tables.lock().await.members.extend_from_slice(members);
        Ok(())
    }

    async fn update_member(&self, member: &Member) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.members.iter_mut().find(|m| m.id == member.id) {
            *existing = member.clone();
        }
        Ok(())
    }

    async fn delete_member(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables.lock().await.members.retain(|m| m.id != id);
        Ok(())
    }

    async fn vote(&self, id: Uuid) -> Result<Option<Vote>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.votes.iter().find(|v| v.id == id).cloned())
    }

    async fn building_votes(&self, building_id: Uuid) -> Result<Vec<Vote>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.building_id == building_id)
            .cloned()
            .collect())
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        self.tables.lock().await.votes.push(vote.clone());
        Ok(())
    }

    async fn set_vote_status(
        &self,
        id: Uuid,
        status: VoteStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(vote) = tables.votes.iter_mut().find(|v| v.id == id) {
            vote.status = status;
            vote.updated_at = updated_at;
        }
        Ok(())
    }

    async fn insert_link(&self, link: &PersonalizedVotingLink) -> Result<(), StoreError> {
        self.tables.lock().await.links.push(link.clone());
        Ok(())
    }

    async fn active_link_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PersonalizedVotingLink>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .iter()
            .find(|l| l.token == token && l.is_active)
            .cloned())
    }

    async fn has_user_vote(&self, vote_id: Uuid, member_id: Uuid) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_votes
            .iter()
            .any(|uv| uv.vote_id == vote_id && uv.member_id == member_id))
    }

    async fn user_votes(&self, vote_id: Uuid) -> Result<Vec<UserVote>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_votes
            .iter()
            .filter(|uv| uv.vote_id == vote_id)
            .cloned()
            .collect())
    }

    async fn record_submission(
        &self,
        link_id: Uuid,
        rows: &[UserVote],
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;

        let consumed = match tables
            .links
            .iter_mut()
            .find(|l| l.id == link_id && l.is_active)
        {
            Some(link) => {
                link.is_active = false;
                link.used_at = Some(used_at);
                true
            }
            None => false,
        };

        if !consumed {
            return Ok(false);
        }

        tables.user_votes.extend_from_slice(rows);

        Ok(true)
    }

    async fn increment_votes_received(&self, vote_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.sessions.iter_mut().find(|s| s.vote_id == vote_id) {
            Some(session) => session.votes_received += 1,
            None => tables.sessions.push(VotingSession {
                vote_id,
                total_members: 0,
                emails_sent: 0,
                votes_received: 1,
                last_reminder_sent: None,
            }),
        }
        Ok(())
    }

    async fn template(&self, id: Uuid) -> Result<Option<EmailTemplate>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.templates.iter().find(|t| t.id == id).cloned())
    }

    async fn default_template(
        &self,
        category: TemplateCategory,
    ) -> Result<Option<EmailTemplate>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .templates
            .iter()
            .find(|t| t.category == category && t.is_default)
            .cloned())
    }

    async fn insert_template(&self, template: &EmailTemplate) -> Result<(), StoreError> {
        self.tables.lock().await.templates.push(template.clone());
        Ok(())
    }

    async fn append_delivery_log(&self, log: &EmailDeliveryLog) -> Result<(), StoreError> {
        self.tables.lock().await.delivery_logs.push(log.clone());
        Ok(())
    }

    async fn upsert_session(&self, session: &VotingSession) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match tables
            .sessions
            .iter_mut()
            .find(|s| s.vote_id == session.vote_id)
        {
            Some(existing) => {
                existing.total_members = session.total_members;
                existing.emails_sent = session.emails_sent;
            }
            None => tables.sessions.push(session.clone()),
        }
        Ok(())
    }

    async fn stamp_reminder(&self, vote_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(session) = tables.sessions.iter_mut().find(|s| s.vote_id == vote_id) {
            session.last_reminder_sent = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{active_vote, building, member, reminder_template, template};

    #[tokio::test]
    async fn test_roster_crud() {
        let store = MemoryStore::new();
        let b = building();
        store.insert_building(&b).await.unwrap();
        assert_eq!(store.list_buildings().await.unwrap().len(), 1);

        let mut m = member(b.id, "jana@example.cz");
        store.insert_members(&[m.clone()]).await.unwrap();

        m.is_active = false;
        store.update_member(&m).await.unwrap();
        assert!(store.active_members(b.id).await.unwrap().is_empty());
        assert_eq!(store.building_members(b.id).await.unwrap().len(), 1);

        store.delete_member(m.id).await.unwrap();
        assert!(store.building_members(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vote_listing_and_status() {
        let store = MemoryStore::new();
        let b = building();
        let v = active_vote(b.id);
        store.insert_vote(&v).await.unwrap();

        assert_eq!(store.building_votes(b.id).await.unwrap().len(), 1);

        let later = Utc::now();
        store
            .set_vote_status(v.id, VoteStatus::Completed, later)
            .await
            .unwrap();
        let stored = store.vote(v.id).await.unwrap().unwrap();
        assert_eq!(stored.status, VoteStatus::Completed);
        assert_eq!(stored.updated_at, later);
    }

    #[tokio::test]
    async fn test_default_template_is_per_category() {
        let store = MemoryStore::new();
        store.insert_template(&template(true)).await.unwrap();
        store.insert_template(&reminder_template()).await.unwrap();

        let voting = store
            .default_template(TemplateCategory::Voting)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voting.category, TemplateCategory::Voting);

        let none = store
            .default_template(TemplateCategory::Notification)
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
