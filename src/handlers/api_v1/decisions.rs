use actix_web::{web, HttpResponse};

use crate::auth::identity::Identity;
use crate::auth::validate::parse_id;
use crate::errors::AppError;
use crate::lifecycle::Lifecycle;
use crate::models::decision::{CreateRoundRequest, RoundListQuery, RoundOutcomeUpdate};

/// POST /api/v1/decisions - Current round of a proposal (200), creating the
/// first one if needed (201). With `"new_round": true` always appends (201).
pub async fn create(
    app: web::Data<Lifecycle>,
    caller: Identity,
    body: web::Json<CreateRoundRequest>,
) -> Result<HttpResponse, AppError> {
    if body.proposal_id.is_empty() {
        return Err(AppError::Validation("Valid proposal ID is required".to_string()));
    }
    let proposal_id = parse_id(&body.proposal_id, "proposal")?;

    if body.new_round {
        let round = app.decisions.create_round(proposal_id, caller.id).await?;
        return Ok(HttpResponse::Created().json(round));
    }

    let (round, created) = app.decisions.get_or_create_round(proposal_id, caller.id).await?;
    if created {
        Ok(HttpResponse::Created().json(round))
    } else {
        Ok(HttpResponse::Ok().json(round))
    }
}

/// GET /api/v1/decisions?proposal_id= - Rounds of a proposal, latest decision
/// point first. Without the parameter, every round newest first.
pub async fn list(
    app: web::Data<Lifecycle>,
    _caller: Identity,
    query: web::Query<RoundListQuery>,
) -> Result<HttpResponse, AppError> {
    let proposal_id = query
        .proposal_id
        .as_deref()
        .map(|id| parse_id(id, "proposal"))
        .transpose()?;
    let rounds = app.decisions.list_rounds(proposal_id).await?;
    Ok(HttpResponse::Ok().json(rounds))
}

/// GET /api/v1/decisions/{id}
pub async fn read(
    app: web::Data<Lifecycle>,
    _caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let round_id = parse_id(&path, "decision")?;
    let round = app.decisions.get_round(round_id).await?;
    Ok(HttpResponse::Ok().json(round))
}

/// PATCH /api/v1/decisions/{id} - Set success / percent_approval / vote_links.
pub async fn update(
    app: web::Data<Lifecycle>,
    caller: Identity,
    path: web::Path<String>,
    body: web::Json<RoundOutcomeUpdate>,
) -> Result<HttpResponse, AppError> {
    let round_id = parse_id(&path, "decision")?;
    let round = app.decisions.update_outcome(round_id, &body, caller.id).await?;
    Ok(HttpResponse::Ok().json(round))
}

/// GET /api/v1/decisions/{id}/tally - Vote counts and approval percentage.
pub async fn tally(
    app: web::Data<Lifecycle>,
    _caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let round_id = parse_id(&path, "decision")?;
    let tally = app.decisions.tally(round_id).await?;
    Ok(HttpResponse::Ok().json(tally))
}
