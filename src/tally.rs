//! # Tally Engine
//!
//! Pure read projections over already-fetched members and user-vote rows.
//! Nothing here touches the store or mutates state, so both functions are
//! safe to recompute on every admin poll.
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Member, UserVote, Vote};

#[derive(Debug, Clone, Serialize)]
pub struct OptionTally {
    pub id: String,
    pub text: String,
    pub votes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question: String,
    pub options: Vec<OptionTally>,
    pub total_votes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDetails {
    pub voted: Vec<Member>,
    pub pending: Vec<Member>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VotingProgress {
    pub total_members: i64,
    pub voted_members: i64,
    pub pending_members: i64,
    pub participation_rate: f64,
    pub member_details: MemberDetails,
}

/// Per-question option counts. `total_votes` is the number of rows recorded
/// for that question (one per respondent who answered it); an option's count
/// is the number of those rows choosing it, so options of a `multiple`
/// question can sum past `total_votes`.
pub fn results(vote: &Vote, user_votes: &[UserVote]) -> Vec<QuestionResult> {
    let responses: Vec<&UserVote> = user_votes
        .iter()
        .filter(|uv| uv.vote_id == vote.id)
        .collect();

    vote.questions
        .iter()
        .map(|question| {
            let question_responses: Vec<&&UserVote> = responses
                .iter()
                .filter(|uv| uv.question_id == question.id)
                .collect();

            let options = question
                .options
                .iter()
                .map(|option| OptionTally {
                    id: option.id.clone(),
                    text: option.text.clone(),
                    votes: question_responses
                        .iter()
                        .filter(|uv| uv.option_ids.contains(&option.id))
                        .count(),
                })
                .collect();

            QuestionResult {
                question: question.question.clone(),
                options,
                total_votes: question_responses.len(),
            }
        })
        .collect()
}

/// Vote-level participation, independent of per-question tallies: a member
/// counts as voted once any row exists for the (vote, member) pair.
pub fn progress(members: &[Member], user_votes: &[UserVote], vote_id: Uuid) -> VotingProgress {
    let voted_ids: Vec<Uuid> = {
        let mut ids: Vec<Uuid> = user_votes
            .iter()
            .filter(|uv| uv.vote_id == vote_id)
            .map(|uv| uv.member_id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    };

    let voted: Vec<Member> = members
        .iter()
        .filter(|m| voted_ids.contains(&m.id))
        .cloned()
        .collect();
    let pending: Vec<Member> = members
        .iter()
        .filter(|m| !voted_ids.contains(&m.id))
        .cloned()
        .collect();

    let participation_rate = if members.is_empty() {
        0.0
    } else {
        voted.len() as f64 / members.len() as f64 * 100.0
    };

    VotingProgress {
        total_members: members.len() as i64,
        voted_members: voted.len() as i64,
        pending_members: pending.len() as i64,
        participation_rate,
        member_details: MemberDetails { voted, pending },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{building, member, multiple_choice_vote, user_vote};

    #[test]
    fn test_multiple_choice_counts() {
        let b = building();
        let vote = multiple_choice_vote(b.id);
        let m1 = member(b.id, "a@example.cz");
        let m2 = member(b.id, "b@example.cz");
        let m3 = member(b.id, "c@example.cz");

        let rows = vec![
            user_vote(vote.id, m1.id, "q1", &["a", "b"]),
            user_vote(vote.id, m2.id, "q1", &["b"]),
            user_vote(vote.id, m3.id, "q1", &["c"]),
        ];

        let tallied = results(&vote, &rows);
        assert_eq!(tallied.len(), 1);
        assert_eq!(tallied[0].total_votes, 3);

        let counts: Vec<usize> = tallied[0].options.iter().map(|o| o.votes).collect();
        assert_eq!(counts, vec![1, 2, 1]);
    }

    #[test]
    fn test_rows_from_other_votes_are_ignored() {
        let b = building();
        let vote = multiple_choice_vote(b.id);
        let other = multiple_choice_vote(b.id);
        let m = member(b.id, "a@example.cz");

        let rows = vec![user_vote(other.id, m.id, "q1", &["a"])];

        let tallied = results(&vote, &rows);
        assert_eq!(tallied[0].total_votes, 0);
        assert!(tallied[0].options.iter().all(|o| o.votes == 0));
    }

    #[test]
    fn test_participation_rate_two_of_five() {
        let b = building();
        let vote = multiple_choice_vote(b.id);
        let members: Vec<_> = (0..5)
            .map(|i| member(b.id, &format!("m{i}@example.cz")))
            .collect();

        // One of the two voters answered twice; they still count once.
        let rows = vec![
            user_vote(vote.id, members[0].id, "q1", &["a"]),
            user_vote(vote.id, members[0].id, "q2", &["b"]),
            user_vote(vote.id, members[1].id, "q1", &["c"]),
        ];

        let p = progress(&members, &rows, vote.id);
        assert_eq!(p.total_members, 5);
        assert_eq!(p.voted_members, 2);
        assert_eq!(p.pending_members, 3);
        assert_eq!(p.participation_rate, 40.0);
        assert_eq!(p.member_details.pending.len(), 3);
    }

    #[test]
    fn test_empty_building_has_zero_rate() {
        let vote_id = uuid::Uuid::new_v4();
        let p = progress(&[], &[], vote_id);
        assert_eq!(p.total_members, 0);
        assert_eq!(p.participation_rate, 0.0);
    }
}
