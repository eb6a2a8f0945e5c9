use actix_web::{web, HttpResponse};

use crate::auth::identity::Identity;
use crate::auth::validate::parse_id;
use crate::errors::AppError;
use crate::lifecycle::Lifecycle;
use crate::models::vote::{CastVote, CastVoteRequest, VoteListQuery};

/// POST /api/v1/votes - Cast the caller's vote in a decision round.
pub async fn create(
    app: web::Data<Lifecycle>,
    caller: Identity,
    body: web::Json<CastVoteRequest>,
) -> Result<HttpResponse, AppError> {
    if body.decision_id.is_empty() {
        return Err(AppError::Validation("Valid decision ID is required".to_string()));
    }
    let body = body.into_inner();
    let request = CastVote {
        decision_id: parse_id(&body.decision_id, "decision")?,
        decision: body.decision,
        voting_logic: body.voting_logic,
        agent_vote: body.agent_vote,
    };

    let vote = app.votes.cast(&request, &caller).await?;
    Ok(HttpResponse::Created().json(vote))
}

/// GET /api/v1/votes?decision_id= - Votes of a round, oldest first.
pub async fn list(
    app: web::Data<Lifecycle>,
    _caller: Identity,
    query: web::Query<VoteListQuery>,
) -> Result<HttpResponse, AppError> {
    let decision_id = match query.decision_id.as_deref() {
        Some(id) => parse_id(id, "decision")?,
        None => return Err(AppError::Validation("decision_id is required".to_string())),
    };
    let votes = app.votes.list_votes(decision_id).await?;
    Ok(HttpResponse::Ok().json(votes))
}
