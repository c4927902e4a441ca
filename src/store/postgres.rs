//! Postgres backend. Plain runtime-bound queries over a connection pool; the
//! schema lives in `db/schema.sql`.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgPool,
    postgres::PgPoolOptions,
    types::Json,
};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::{
    Building, EmailDeliveryLog, EmailTemplate, Member, PersonalizedVotingLink, TemplateCategory,
    UserVote, Vote, VoteQuestion, VoteStatus, VotingSession,
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }
}

/// Votes carry their questions as a JSON column, so the row type wraps them.
#[derive(sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    building_id: Uuid,
    title: String,
    description: String,
    status: VoteStatus,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    questions: Json<Vec<VoteQuestion>>,
    observers: Option<Vec<String>>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Vote {
            id: row.id,
            building_id: row.building_id,
            title: row.title,
            description: row.description,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            questions: row.questions.0,
            observers: row.observers,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn building(&self, id: Uuid) -> Result<Option<Building>, StoreError> {
        let row = sqlx::query_as::<_, Building>("SELECT * FROM buildings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_buildings(&self) -> Result<Vec<Building>, StoreError> {
        let rows = sqlx::query_as::<_, Building>("SELECT * FROM buildings ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn insert_building(&self, building: &Building) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO buildings (id, name, address, description, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(building.id)
        .bind(&building.name)
        .bind(&building.address)
        .bind(&building.description)
        .bind(building.is_active)
        .bind(building.created_at)
        .bind(building.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn member(&self, id: Uuid) -> Result<Option<Member>, StoreError> {
        let row = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn building_members(&self, building_id: Uuid) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE building_id = $1 ORDER BY created_at DESC",
        )
        .bind(building_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn active_members(&self, building_id: Uuid) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE building_id = $1 AND is_active = TRUE",
        )
        .bind(building_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_members(&self, members: &[Member]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for member in members {
            sqlx::query(
                "INSERT INTO members
                 (id, building_id, email, first_name, last_name, phone, unit_number,
                  ownership_share, role, is_active, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(member.id)
            .bind(member.building_id)
            .bind(&member.email)
            .bind(&member.first_name)
            .bind(&member.last_name)
            .bind(&member.phone)
            .bind(&member.unit_number)
            .bind(member.ownership_share)
            .bind(member.role)
            .bind(member.is_active)
            .bind(member.created_at)
            .bind(member.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn update_member(&self, member: &Member) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE members SET email = $2, first_name = $3, last_name = $4, phone = $5,
             unit_number = $6, ownership_share = $7, role = $8, is_active = $9, updated_at = $10
             WHERE id = $1",
        )
        .bind(member.id)
        .bind(&member.email)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.phone)
        .bind(&member.unit_number)
        .bind(member.ownership_share)
        .bind(member.role)
        .bind(member.is_active)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_member(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn vote(&self, id: Uuid) -> Result<Option<Vote>, StoreError> {
        let row = sqlx::query_as::<_, VoteRow>("SELECT * FROM votes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Vote::from))
    }

    async fn building_votes(&self, building_id: Uuid) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query_as::<_, VoteRow>(
            "SELECT * FROM votes WHERE building_id = $1 ORDER BY created_at DESC",
        )
        .bind(building_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Vote::from).collect())
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO votes
             (id, building_id, title, description, status, start_date, end_date,
              questions, observers, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(vote.id)
        .bind(vote.building_id)
        .bind(&vote.title)
        .bind(&vote.description)
        .bind(vote.status)
        .bind(vote.start_date)
        .bind(vote.end_date)
        .bind(Json(&vote.questions))
        .bind(&vote.observers)
        .bind(vote.created_by)
        .bind(vote.created_at)
        .bind(vote.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_vote_status(
        &self,
        id: Uuid,
        status: VoteStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE votes SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status)
            .bind(updated_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_link(&self, link: &PersonalizedVotingLink) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO personalized_voting_links
             (id, vote_id, member_id, token, is_active, expires_at, used_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(link.id)
        .bind(link.vote_id)
        .bind(link.member_id)
        .bind(&link.token)
        .bind(link.is_active)
        .bind(link.expires_at)
        .bind(link.used_at)
        .bind(link.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_link_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PersonalizedVotingLink>, StoreError> {
        let row = sqlx::query_as::<_, PersonalizedVotingLink>(
            "SELECT * FROM personalized_voting_links WHERE token = $1 AND is_active = TRUE",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn has_user_vote(&self, vote_id: Uuid, member_id: Uuid) -> Result<bool, StoreError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM user_votes WHERE vote_id = $1 AND member_id = $2)",
        )
        .bind(vote_id)
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    async fn user_votes(&self, vote_id: Uuid) -> Result<Vec<UserVote>, StoreError> {
        let rows = sqlx::query_as::<_, UserVote>("SELECT * FROM user_votes WHERE vote_id = $1")
            .bind(vote_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn record_submission(
        &self,
        link_id: Uuid,
        rows: &[UserVote],
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Conditional consume: loses the race cleanly if another submission
        // burned the link first.
        let consumed = sqlx::query(
            "UPDATE personalized_voting_links
             SET is_active = FALSE, used_at = $2
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(link_id)
        .bind(used_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if consumed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for row in rows {
            sqlx::query(
                "INSERT INTO user_votes (id, vote_id, member_id, question_id, option_ids, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id)
            .bind(row.vote_id)
            .bind(row.member_id)
            .bind(&row.question_id)
            .bind(&row.option_ids)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }

    async fn increment_votes_received(&self, vote_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO voting_sessions (vote_id, total_members, emails_sent, votes_received)
             VALUES ($1, 0, 0, 1)
             ON CONFLICT (vote_id)
             DO UPDATE SET votes_received = voting_sessions.votes_received + 1",
        )
        .bind(vote_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn template(&self, id: Uuid) -> Result<Option<EmailTemplate>, StoreError> {
        let row = sqlx::query_as::<_, EmailTemplate>("SELECT * FROM email_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn default_template(
        &self,
        category: TemplateCategory,
    ) -> Result<Option<EmailTemplate>, StoreError> {
        let row = sqlx::query_as::<_, EmailTemplate>(
            "SELECT * FROM email_templates WHERE category = $1 AND is_default = TRUE LIMIT 1",
        )
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn insert_template(&self, template: &EmailTemplate) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO email_templates
             (id, name, category, subject, content, variables, is_default, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(template.category)
        .bind(&template.subject)
        .bind(&template.content)
        .bind(&template.variables)
        .bind(template.is_default)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_delivery_log(&self, log: &EmailDeliveryLog) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO email_delivery_logs
             (id, vote_id, member_id, template_id, recipient_email, subject, status,
              error_message, sent_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(log.id)
        .bind(log.vote_id)
        .bind(log.member_id)
        .bind(log.template_id)
        .bind(&log.recipient_email)
        .bind(&log.subject)
        .bind(log.status)
        .bind(&log.error_message)
        .bind(log.sent_at)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_session(&self, session: &VotingSession) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO voting_sessions
             (vote_id, total_members, emails_sent, votes_received, last_reminder_sent)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (vote_id)
             DO UPDATE SET total_members = EXCLUDED.total_members,
                           emails_sent = EXCLUDED.emails_sent",
        )
        .bind(session.vote_id)
        .bind(session.total_members)
        .bind(session.emails_sent)
        .bind(session.votes_received)
        .bind(session.last_reminder_sent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stamp_reminder(&self, vote_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE voting_sessions SET last_reminder_sent = $2 WHERE vote_id = $1")
            .bind(vote_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
