//! Fixture builders shared by unit and integration tests.
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::EmailSettings,
    model::{
        Building, EmailTemplate, Member, MemberRole, QuestionType, TemplateCategory, UserVote,
        Vote, VoteOption, VoteQuestion, VoteStatus,
    },
};

pub fn building() -> Building {
    let now = Utc::now();
    Building {
        id: Uuid::new_v4(),
        name: "Dům U Lípy".to_string(),
        address: "Lipová 12, Praha".to_string(),
        description: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn member(building_id: Uuid, email: &str) -> Member {
    let now = Utc::now();
    Member {
        id: Uuid::new_v4(),
        building_id,
        email: email.to_string(),
        first_name: "Jana".to_string(),
        last_name: "Nováková".to_string(),
        phone: None,
        unit_number: "4".to_string(),
        ownership_share: 12.5,
        role: MemberRole::Member,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn vote_with_questions(building_id: Uuid, questions: Vec<VoteQuestion>) -> Vote {
    let now = Utc::now();
    Vote {
        id: Uuid::new_v4(),
        building_id,
        title: "Výměna střechy".to_string(),
        description: "Hlasování o rekonstrukci střechy".to_string(),
        status: VoteStatus::Active,
        start_date: now,
        end_date: now + Duration::days(14),
        questions,
        observers: None,
        created_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    }
}

fn options(ids: &[&str]) -> Vec<VoteOption> {
    ids.iter()
        .map(|id| VoteOption {
            id: id.to_string(),
            text: format!("Option {id}"),
        })
        .collect()
}

/// Active vote with one single-choice question `q1` (options `a`, `b`).
pub fn active_vote(building_id: Uuid) -> Vote {
    vote_with_questions(
        building_id,
        vec![VoteQuestion {
            id: "q1".to_string(),
            question: "Souhlasíte s rekonstrukcí?".to_string(),
            question_type: QuestionType::Single,
            options: options(&["a", "b"]),
        }],
    )
}

/// Active vote with a multiple-choice question `q1` (options `a`, `b`, `c`)
/// and a single-choice question `q2`.
pub fn multiple_choice_vote(building_id: Uuid) -> Vote {
    vote_with_questions(
        building_id,
        vec![
            VoteQuestion {
                id: "q1".to_string(),
                question: "Které úpravy podporujete?".to_string(),
                question_type: QuestionType::Multiple,
                options: options(&["a", "b", "c"]),
            },
            VoteQuestion {
                id: "q2".to_string(),
                question: "Souhlasíte s financováním?".to_string(),
                question_type: QuestionType::Single,
                options: options(&["a", "b"]),
            },
        ],
    )
}

pub fn user_vote(vote_id: Uuid, member_id: Uuid, question_id: &str, option_ids: &[&str]) -> UserVote {
    UserVote {
        id: Uuid::new_v4(),
        vote_id,
        member_id,
        question_id: question_id.to_string(),
        option_ids: option_ids.iter().map(|o| o.to_string()).collect(),
        created_at: Utc::now(),
    }
}

/// Voting-category template using the full fixed variable set.
pub fn template(is_default: bool) -> EmailTemplate {
    let now = Utc::now();
    EmailTemplate {
        id: Uuid::new_v4(),
        name: "Pozvánka k hlasování".to_string(),
        category: TemplateCategory::Voting,
        subject: "{{vote_title}} — {{building_name}}".to_string(),
        content: "<p>Dobrý den {{recipient_name}},</p>\
                  <p>{{vote_description}}</p>\
                  <p>Hlasování probíhá od {{vote_start_date}} do {{vote_end_date}}.</p>\
                  <p><a href=\"{{voting_link}}\">Hlasovat</a></p>"
            .to_string(),
        variables: vec![
            "recipient_name".to_string(),
            "vote_title".to_string(),
            "vote_description".to_string(),
            "vote_start_date".to_string(),
            "vote_end_date".to_string(),
            "voting_link".to_string(),
            "building_name".to_string(),
        ],
        is_default,
        created_at: now,
        updated_at: now,
    }
}

pub fn reminder_template() -> EmailTemplate {
    let mut t = template(true);
    t.name = "Připomínka hlasování".to_string();
    t.category = TemplateCategory::Reminder;
    t
}

pub fn email_settings() -> EmailSettings {
    EmailSettings {
        from_email: "noreply@onlinesprava.cz".to_string(),
        from_name: "OnlineSprava".to_string(),
        frontend_url: "http://localhost:5173".to_string(),
    }
}
