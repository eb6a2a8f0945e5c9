use actix_web::{web, HttpResponse};

use crate::auth::identity::Identity;
use crate::auth::validate::parse_id;
use crate::errors::AppError;
use crate::lifecycle::{Lifecycle, ProposalScope};
use crate::models::proposal::ProposalRequest;

/// POST /api/v1/proposals - Create a proposal owned by the caller.
pub async fn create(
    app: web::Data<Lifecycle>,
    caller: Identity,
    body: web::Json<ProposalRequest>,
) -> Result<HttpResponse, AppError> {
    let proposal = app
        .proposals
        .create(&body.title, &body.description, caller.id)
        .await?;
    Ok(HttpResponse::Created().json(proposal))
}

/// GET /api/v1/proposals - Every proposal, newest first.
pub async fn list_all(app: web::Data<Lifecycle>, caller: Identity) -> Result<HttpResponse, AppError> {
    list(app, caller, ProposalScope::All).await
}

/// GET /api/v1/proposals/active - Open proposals, newest first.
pub async fn list_active(app: web::Data<Lifecycle>, caller: Identity) -> Result<HttpResponse, AppError> {
    list(app, caller, ProposalScope::Active).await
}

/// GET /api/v1/proposals/me - The caller's own proposals, newest first.
pub async fn list_mine(app: web::Data<Lifecycle>, caller: Identity) -> Result<HttpResponse, AppError> {
    list(app, caller, ProposalScope::Mine).await
}

async fn list(
    app: web::Data<Lifecycle>,
    caller: Identity,
    scope: ProposalScope,
) -> Result<HttpResponse, AppError> {
    let proposals = app.proposals.list(scope, caller.id).await?;
    Ok(HttpResponse::Ok().json(proposals))
}

/// GET /api/v1/proposals/{id}
pub async fn read(
    app: web::Data<Lifecycle>,
    _caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let proposal_id = parse_id(&path, "proposal")?;
    let proposal = app.proposals.get(proposal_id).await?;
    Ok(HttpResponse::Ok().json(proposal))
}

/// PUT /api/v1/proposals/{id} - Edit title and description (owner, open only).
pub async fn update(
    app: web::Data<Lifecycle>,
    caller: Identity,
    path: web::Path<String>,
    body: web::Json<ProposalRequest>,
) -> Result<HttpResponse, AppError> {
    let proposal_id = parse_id(&path, "proposal")?;
    let proposal = app
        .proposals
        .edit(proposal_id, &body.title, &body.description, caller.id)
        .await?;
    Ok(HttpResponse::Ok().json(proposal))
}

/// PATCH /api/v1/proposals/{id}/close - Close for good (owner only).
pub async fn close(
    app: web::Data<Lifecycle>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let proposal_id = parse_id(&path, "proposal")?;
    let proposal = app.proposals.close(proposal_id, caller.id).await?;
    Ok(HttpResponse::Ok().json(proposal))
}
