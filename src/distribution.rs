//! # Distribution Orchestrator
//!
//! Fans out link issuance and personalized email over a member set. Each
//! member is handled independently: a failed send is recorded in the result
//! list and the loop carries on, so one bad address never blocks a ballot
//! mailing. Every attempt lands in the append-only delivery log.
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::EmailSettings,
    error::AppError,
    links::issue_link,
    mailer::{Mailer, OutgoingEmail, render_template},
    model::{
        DeliveryStatus, EmailDeliveryLog, EmailTemplate, Member, TemplateCategory, Vote,
        VotingSession,
    },
    store::{Store, StoreError},
    tally,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub message_id: String,
    pub voting_link: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSendResult {
    pub member_id: Uuid,
    pub email: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionReport {
    pub total_members: usize,
    pub emails_sent: usize,
    pub results: Vec<MemberSendResult>,
}

async fn resolve_template(
    store: &dyn Store,
    template_id: Option<Uuid>,
    category: TemplateCategory,
) -> Result<EmailTemplate, AppError> {
    let template = match template_id {
        Some(id) => store.template(id).await?,
        None => store.default_template(category).await?,
    };

    template.ok_or(AppError::TemplateNotFound)
}

fn personalized_variables(
    vote: &Vote,
    member: &Member,
    building_name: &str,
    voting_link: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("recipient_name", member.full_name()),
        ("vote_title", vote.title.clone()),
        ("vote_description", vote.description.clone()),
        ("vote_start_date", vote.start_date.format("%d.%m.%Y").to_string()),
        ("vote_end_date", vote.end_date.format("%d.%m.%Y").to_string()),
        ("voting_link", voting_link.to_string()),
        ("building_name", building_name.to_string()),
    ]
}

/// Issues a link for one member, renders the template, sends the email and
/// appends the delivery-log row. The original `send-voting-email` function.
pub async fn send_voting_email(
    store: &dyn Store,
    mailer: &dyn Mailer,
    email_cfg: &EmailSettings,
    vote_id: Uuid,
    member_id: Uuid,
    template_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<SendOutcome, AppError> {
    let vote = store.vote(vote_id).await?.ok_or(AppError::VoteNotFound)?;

    let building = store
        .building(vote.building_id)
        .await?
        .ok_or(StoreError::MissingRow("building referenced by vote"))?;

    let member = store
        .member(member_id)
        .await?
        .ok_or(AppError::MemberNotFound)?;

    let link = issue_link(store, vote_id, member_id, now).await?;
    let voting_link = format!("{}/vote/{}", email_cfg.frontend_url, link.token);

    let template = resolve_template(store, template_id, TemplateCategory::Voting).await?;
    let variables = personalized_variables(&vote, &member, &building.name, &voting_link);
    let (subject, content) = render_template(&template, &variables);

    let outgoing = OutgoingEmail {
        from_name: email_cfg.from_name.clone(),
        from_email: email_cfg.from_email.clone(),
        to_name: member.full_name(),
        to_email: member.email.clone(),
        subject: subject.clone(),
        html_body: content,
    };

    let sent = mailer.send(&outgoing).await;

    let log = EmailDeliveryLog {
        id: Uuid::new_v4(),
        vote_id,
        member_id,
        template_id: template.id,
        recipient_email: member.email.clone(),
        subject,
        status: if sent.is_ok() {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        },
        error_message: sent.as_ref().err().map(|e| e.to_string()),
        sent_at: sent.as_ref().ok().map(|_| now),
        created_at: now,
    };
    if let Err(e) = store.append_delivery_log(&log).await {
        warn!("Failed to log email delivery: {e}");
    }

    let message_id = sent.map_err(|e| AppError::SendFailed(e.to_string()))?;

    Ok(SendOutcome {
        message_id,
        voting_link,
    })
}

/// Sends a personalized ballot email to every targeted member.
///
/// Targets the explicit member list when given, otherwise all active members
/// of the vote's building. Partial failure is the normal case: the report
/// carries one entry per member and the caller decides about retries.
pub async fn distribute(
    store: &dyn Store,
    mailer: &dyn Mailer,
    email_cfg: &EmailSettings,
    vote_id: Uuid,
    member_ids: Option<&[Uuid]>,
    template_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<DistributionReport, AppError> {
    let vote = store.vote(vote_id).await?.ok_or(AppError::VoteNotFound)?;

    let mut members = store.active_members(vote.building_id).await?;
    if let Some(ids) = member_ids {
        members.retain(|m| ids.contains(&m.id));
    }

    let template = resolve_template(store, template_id, TemplateCategory::Voting).await?;

    let mut results = Vec::with_capacity(members.len());
    for member in &members {
        let outcome = send_voting_email(
            store,
            mailer,
            email_cfg,
            vote_id,
            member.id,
            Some(template.id),
            now,
        )
        .await;

        results.push(MemberSendResult {
            member_id: member.id,
            email: member.email.clone(),
            success: outcome.is_ok(),
            error: outcome.err().map(|e| e.to_string()),
        });
    }

    let emails_sent = results.iter().filter(|r| r.success).count();
    info!(
        "Distributed voting emails for vote {vote_id}: {emails_sent}/{} sent",
        members.len()
    );

    let session = VotingSession {
        vote_id,
        total_members: members.len() as i64,
        emails_sent: emails_sent as i64,
        votes_received: 0,
        last_reminder_sent: None,
    };
    if let Err(e) = store.upsert_session(&session).await {
        warn!("Failed to update voting session: {e}");
    }

    Ok(DistributionReport {
        total_members: members.len(),
        emails_sent,
        results,
    })
}

/// Re-mails only the members who have not voted yet, using the default
/// reminder template, and stamps the session.
pub async fn send_reminders(
    store: &dyn Store,
    mailer: &dyn Mailer,
    email_cfg: &EmailSettings,
    vote_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DistributionReport, AppError> {
    let vote = store.vote(vote_id).await?.ok_or(AppError::VoteNotFound)?;

    let members = store.active_members(vote.building_id).await?;
    let user_votes = store.user_votes(vote_id).await?;
    let pending: Vec<Uuid> = tally::progress(&members, &user_votes, vote_id)
        .member_details
        .pending
        .iter()
        .map(|m| m.id)
        .collect();

    let report = if pending.is_empty() {
        DistributionReport {
            total_members: 0,
            emails_sent: 0,
            results: Vec::new(),
        }
    } else {
        let template = resolve_template(store, None, TemplateCategory::Reminder).await?;
        distribute(
            store,
            mailer,
            email_cfg,
            vote_id,
            Some(&pending),
            Some(template.id),
            now,
        )
        .await?
    };

    if let Err(e) = store.stamp_reminder(vote_id, now).await {
        warn!("Failed to stamp reminder timestamp: {e}");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mailer::RecordingMailer,
        store::memory::MemoryStore,
        testutil::{active_vote, building, email_settings, member, reminder_template, template, user_vote},
    };

    async fn seeded(members: &[&str]) -> (MemoryStore, Uuid, Vec<Uuid>) {
        let store = MemoryStore::new();
        let b = building();
        let v = active_vote(b.id);
        let vote_id = v.id;

        store.insert_building(&b).await.unwrap();
        store.insert_vote(&v).await.unwrap();
        store.insert_template(&template(true)).await.unwrap();

        let mut ids = Vec::new();
        for email in members {
            let m = member(b.id, email);
            ids.push(m.id);
            store.insert_members(&[m]).await.unwrap();
        }

        (store, vote_id, ids)
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let (store, vote_id, _) = seeded(&["a@example.cz", "b@example.cz", "c@example.cz"]).await;
        let mailer = RecordingMailer::failing_for(&["b@example.cz"]);

        let report = distribute(
            &store,
            &mailer,
            &email_settings(),
            vote_id,
            None,
            None,
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(report.total_members, 3);
        assert_eq!(report.emails_sent, 2);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results.iter().filter(|r| !r.success).count(), 1);

        let failed = report.results.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed.email, "b@example.cz");
        assert!(failed.error.is_some());

        // Every attempt is logged, success or not.
        assert_eq!(store.delivery_log_count().await, 3);

        let session = store.session(vote_id).await.unwrap();
        assert_eq!(session.total_members, 3);
        assert_eq!(session.emails_sent, 2);
    }

    #[tokio::test]
    async fn test_missing_template_fails_before_any_send() {
        let store = MemoryStore::new();
        let b = building();
        let v = active_vote(b.id);
        store.insert_building(&b).await.unwrap();
        store.insert_vote(&v).await.unwrap();
        store
            .insert_members(&[member(b.id, "a@example.cz")])
            .await
            .unwrap();

        let mailer = RecordingMailer::new();
        let err = distribute(&store, &mailer, &email_settings(), v.id, None, None, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TemplateNotFound));
        assert!(mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_member_subset_is_honored() {
        let (store, vote_id, ids) = seeded(&["a@example.cz", "b@example.cz"]).await;
        let mailer = RecordingMailer::new();

        let report = distribute(
            &store,
            &mailer,
            &email_settings(),
            vote_id,
            Some(&ids[..1]),
            None,
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(report.total_members, 1);
        assert_eq!(mailer.sent.lock().await.len(), 1);
        assert_eq!(mailer.sent.lock().await[0].to_email, "a@example.cz");
    }

    #[tokio::test]
    async fn test_sent_email_contains_personalized_link() {
        let (store, vote_id, ids) = seeded(&["a@example.cz"]).await;
        let mailer = RecordingMailer::new();

        let outcome = send_voting_email(
            &store,
            &mailer,
            &email_settings(),
            vote_id,
            ids[0],
            None,
            Utc::now(),
        )
        .await
        .unwrap();

        let sent = mailer.sent.lock().await;
        assert!(sent[0].html_body.contains(&outcome.voting_link));
        assert!(!sent[0].html_body.contains("{{"));

        // The link in the email resolves to this member's ballot.
        let token = outcome.voting_link.rsplit('/').next().unwrap();
        let issued = store.active_link_by_token(token).await.unwrap().unwrap();
        assert_eq!(issued.member_id, ids[0]);
    }

    #[tokio::test]
    async fn test_reminders_target_pending_members_only() {
        let (store, vote_id, ids) = seeded(&["a@example.cz", "b@example.cz"]).await;
        store.insert_template(&reminder_template()).await.unwrap();

        // First member already voted.
        let link = issue_link(&store, vote_id, ids[0], Utc::now()).await.unwrap();
        let row = user_vote(vote_id, ids[0], "q1", &["a"]);
        assert!(store
            .record_submission(link.id, &[row], Utc::now())
            .await
            .unwrap());

        let mailer = RecordingMailer::new();
        let report = send_reminders(&store, &mailer, &email_settings(), vote_id, Utc::now())
            .await
            .unwrap();

        assert_eq!(report.total_members, 1);
        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "b@example.cz");
    }
}
