//! End-to-end flow over the in-memory store: activate and distribute a vote,
//! open the emailed link, submit a ballot, and watch progress and results.
use chrono::Utc;
use svj_voting::{
    distribution, tally,
    error::AppError,
    mailer::RecordingMailer,
    model::VoteStatus,
    store::{Store, memory::MemoryStore},
    testutil::{building, email_settings, member, multiple_choice_vote, template},
    voting::{self, VoteAnswer},
};

fn extract_token(html: &str) -> String {
    // The template links to {frontend_url}/vote/{token}.
    let start = html.find("/vote/").unwrap() + "/vote/".len();
    let rest = &html[start..];
    let end = rest.find('"').unwrap_or(rest.len());
    rest[..end].to_string()
}

#[tokio::test]
async fn full_email_voting_flow() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let cfg = email_settings();
    let now = Utc::now();

    let b = building();
    let mut vote = multiple_choice_vote(b.id);
    vote.status = VoteStatus::Draft;
    let voters = vec![
        member(b.id, "jana@example.cz"),
        member(b.id, "petr@example.cz"),
        member(b.id, "eva@example.cz"),
    ];

    store.insert_building(&b).await.unwrap();
    store.insert_vote(&vote).await.unwrap();
    store.insert_members(&voters).await.unwrap();
    store.insert_template(&template(true)).await.unwrap();

    // Draft votes reject resolution even with a freshly issued link.
    let early = svj_voting::links::issue_link(&store, vote.id, voters[0].id, now)
        .await
        .unwrap();
    assert!(matches!(
        voting::resolve(&store, &early.token, now).await,
        Err(AppError::VoteNotActive)
    ));

    // Admin activates the vote and fans out the emails.
    store
        .set_vote_status(vote.id, VoteStatus::Active, now)
        .await
        .unwrap();
    let report = distribution::distribute(&store, &mailer, &cfg, vote.id, None, None, now)
        .await
        .unwrap();
    assert_eq!(report.total_members, 3);
    assert_eq!(report.emails_sent, 3);

    // First voter opens their link and submits a ballot.
    let sent = mailer.sent.lock().await.clone();
    let token = extract_token(&sent[0].html_body);
    let voter_email = sent[0].to_email.clone();

    let data = voting::resolve(&store, &token, now).await.unwrap();
    assert!(!data.has_voted);
    assert_eq!(data.member.email, voter_email);
    assert_eq!(data.building.id, b.id);
    assert_eq!(data.vote.questions.len(), 2);

    let answers = vec![
        VoteAnswer {
            question_id: "q1".into(),
            option_ids: vec!["a".into(), "c".into()],
        },
        VoteAnswer {
            question_id: "q2".into(),
            option_ids: vec!["b".into()],
        },
    ];
    let submission = voting::submit(&store, &token, &answers, now).await.unwrap();
    assert_eq!(submission.member.email, voter_email);

    // The link is burned; replaying it fails.
    assert!(matches!(
        voting::submit(&store, &token, &answers, now).await,
        Err(AppError::LinkInvalid)
    ));

    // Progress reflects one of three members having voted.
    let members = store.building_members(b.id).await.unwrap();
    let user_votes = store.user_votes(vote.id).await.unwrap();
    let progress = tally::progress(&members, &user_votes, vote.id);
    assert_eq!(progress.voted_members, 1);
    assert_eq!(progress.pending_members, 2);
    assert!((progress.participation_rate - 100.0 / 3.0).abs() < 1e-9);

    // Results count the submitted options.
    let refreshed = store.vote(vote.id).await.unwrap().unwrap();
    let results = tally::results(&refreshed, &user_votes);
    assert_eq!(results[0].total_votes, 1);
    let q1_counts: Vec<usize> = results[0].options.iter().map(|o| o.votes).collect();
    assert_eq!(q1_counts, vec![1, 0, 1]);
    assert_eq!(results[1].total_votes, 1);

    // Session counters tracked the distribution and the submission.
    let session = store.session(vote.id).await.unwrap();
    assert_eq!(session.total_members, 3);
    assert_eq!(session.emails_sent, 3);
    assert_eq!(session.votes_received, 1);
}

#[tokio::test]
async fn reminder_flow_skips_voters() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let cfg = email_settings();
    let now = Utc::now();

    let b = building();
    let vote = multiple_choice_vote(b.id);
    let voters = vec![
        member(b.id, "jana@example.cz"),
        member(b.id, "petr@example.cz"),
    ];

    store.insert_building(&b).await.unwrap();
    store.insert_vote(&vote).await.unwrap();
    store.insert_members(&voters).await.unwrap();
    store.insert_template(&template(true)).await.unwrap();
    store
        .insert_template(&svj_voting::testutil::reminder_template())
        .await
        .unwrap();

    distribution::distribute(&store, &mailer, &cfg, vote.id, None, None, now)
        .await
        .unwrap();

    // jana votes through her emailed link.
    let jana_email = "jana@example.cz";
    let sent = mailer.sent.lock().await.clone();
    let jana_mail = sent.iter().find(|m| m.to_email == jana_email).unwrap();
    let token = extract_token(&jana_mail.html_body);
    let answers = vec![VoteAnswer {
        question_id: "q1".into(),
        option_ids: vec!["b".into()],
    }];
    voting::submit(&store, &token, &answers, now).await.unwrap();

    let reminder_mailer = RecordingMailer::new();
    let report =
        distribution::send_reminders(&store, &reminder_mailer, &cfg, vote.id, now)
            .await
            .unwrap();

    assert_eq!(report.total_members, 1);
    let reminded = reminder_mailer.sent.lock().await;
    assert_eq!(reminded.len(), 1);
    assert_eq!(reminded[0].to_email, "petr@example.cz");

    let session = store.session(vote.id).await.unwrap();
    assert_eq!(session.last_reminder_sent, Some(now));
}
