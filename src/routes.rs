//! HTTP adapters over the voting core. Handlers stay thin: decode the JSON
//! payload, stamp the current time, call the core, encode the envelope. The
//! checks themselves all live in [`crate::voting`] and
//! [`crate::distribution`].
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    distribution::{self, DistributionReport, MemberSendResult},
    error::AppError,
    model::{Building, Member, Vote},
    state::AppState,
    tally::{self, QuestionResult, VotingProgress},
    voting::{self, VoteAnswer},
};

#[derive(Deserialize)]
pub struct TokenRequest {
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingDataResponse {
    success: bool,
    vote: Vote,
    member: Member,
    building: Building,
    has_voted: bool,
    link_id: Uuid,
}

async fn voting_data(
    state: &AppState,
    token: &str,
) -> Result<Json<VotingDataResponse>, AppError> {
    let data = voting::resolve(state.store.as_ref(), token, Utc::now()).await?;

    Ok(Json(VotingDataResponse {
        success: true,
        vote: data.vote,
        member: data.member,
        building: data.building,
        has_voted: data.has_voted,
        link_id: data.link_id,
    }))
}

pub async fn get_voting_data(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<VotingDataResponse>, AppError> {
    voting_data(&state, &payload.token).await
}

pub async fn get_voting_data_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TokenRequest>,
) -> Result<Json<VotingDataResponse>, AppError> {
    voting_data(&state, &params.token).await
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    token: String,
    answers: Vec<VoteAnswer>,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    success: bool,
    message: String,
    member: Member,
    vote: Vote,
}

/// The submission route reports every voting failure as 400, keeping the
/// original wire contract; only store outages surface as 500.
fn submission_error(err: AppError) -> Response {
    match err {
        AppError::Store(_) => err.into_response(),
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": other.to_string() })),
        )
            .into_response(),
    }
}

pub async fn process_email_vote(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, Response> {
    let submission = voting::submit(
        state.store.as_ref(),
        &payload.token,
        &payload.answers,
        Utc::now(),
    )
    .await
    .map_err(submission_error)?;

    Ok(Json(SubmitResponse {
        success: true,
        message: "Vote recorded successfully".to_string(),
        member: submission.member,
        vote: submission.vote,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    vote_id: Uuid,
    member_id: Uuid,
    template_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    success: bool,
    message_id: String,
    voting_link: String,
}

pub async fn send_voting_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>, AppError> {
    let outcome = distribution::send_voting_email(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &state.config.email,
        payload.vote_id,
        payload.member_id,
        payload.template_id,
        Utc::now(),
    )
    .await?;

    Ok(Json(SendResponse {
        success: true,
        message_id: outcome.message_id,
        voting_link: outcome.voting_link,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeRequest {
    vote_id: Uuid,
    member_ids: Option<Vec<Uuid>>,
    template_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeResponse {
    success: bool,
    total_members: usize,
    emails_sent: usize,
    results: Vec<MemberSendResult>,
}

impl From<DistributionReport> for DistributeResponse {
    fn from(report: DistributionReport) -> Self {
        Self {
            success: true,
            total_members: report.total_members,
            emails_sent: report.emails_sent,
            results: report.results,
        }
    }
}

pub async fn distribute_voting_emails(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DistributeRequest>,
) -> Result<Json<DistributeResponse>, AppError> {
    let report = distribution::distribute(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &state.config.email,
        payload.vote_id,
        payload.member_ids.as_deref(),
        payload.template_id,
        Utc::now(),
    )
    .await?;

    Ok(Json(DistributeResponse::from(report)))
}

pub async fn vote_results(
    State(state): State<Arc<AppState>>,
    Path(vote_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionResult>>, AppError> {
    let vote = state
        .store
        .vote(vote_id)
        .await?
        .ok_or(AppError::VoteNotFound)?;
    let user_votes = state.store.user_votes(vote_id).await?;

    Ok(Json(tally::results(&vote, &user_votes)))
}

pub async fn vote_progress(
    State(state): State<Arc<AppState>>,
    Path(vote_id): Path<Uuid>,
) -> Result<Json<VotingProgress>, AppError> {
    let vote = state
        .store
        .vote(vote_id)
        .await?
        .ok_or(AppError::VoteNotFound)?;
    let members = state.store.building_members(vote.building_id).await?;
    let user_votes = state.store.user_votes(vote_id).await?;

    Ok(Json(tally::progress(&members, &user_votes, vote_id)))
}
