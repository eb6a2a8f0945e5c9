use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::vote::{CastVote, NewVote, Vote, VoteDecision};
use crate::store::{Store, StoreError};

const ALREADY_VOTED: &str = "You have already voted on this decision";

pub struct VoteManager {
    store: Arc<dyn Store>,
}

impl VoteManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record one ballot for `caller` in a round.
    ///
    /// The decision value is checked before anything is read, so an unknown
    /// value is a validation error whatever the round's state. After that:
    /// round exists, proposal exists and is open, caller has not voted yet.
    pub async fn cast(&self, request: &CastVote, caller: &Identity) -> Result<Vote, AppError> {
        let decision: VoteDecision = request.decision.parse().map_err(AppError::Validation)?;
        let voting_logic = request
            .voting_logic
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(logic) = voting_logic {
            validate::check([validate::validate_voting_logic(logic)])?;
        }

        let round = self
            .store
            .find_round(request.decision_id)
            .await?
            .ok_or(AppError::NotFound("Decision"))?;

        let proposal = self
            .store
            .find_proposal(round.proposal_id)
            .await?
            .ok_or(AppError::NotFound("Associated proposal"))?;
        if !proposal.is_open() {
            return Err(closed_proposal());
        }

        if self.store.find_vote_by_caster(round.id, caller.id).await?.is_some() {
            log::debug!("vote rejected: {} already voted on {}", caller.id, round.id);
            return Err(AppError::Conflict(ALREADY_VOTED.to_string()));
        }

        let new_vote = NewVote {
            decision_id: round.id,
            user_id: caller.id,
            username: caller.username.clone(),
            decision,
            voting_logic: voting_logic.map(String::from),
            agent_vote: request.agent_vote,
            created_at: Utc::now(),
        };

        let vote = match self.store.insert_vote(&new_vote).await {
            Ok(Some(vote)) => vote,
            // Closed between the status read above and the insert.
            Ok(None) => return Err(closed_proposal()),
            // Lost a race with an identical request between check and insert.
            Err(StoreError::Duplicate(_)) => return Err(AppError::Conflict(ALREADY_VOTED.to_string())),
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "vote.cast id={} decision={} user={} choice={}",
            vote.id,
            vote.decision_id,
            vote.user_id,
            vote.decision
        );
        Ok(vote)
    }

    /// Votes of a round in cast order (oldest first). An unknown round simply
    /// has no votes.
    pub async fn list_votes(&self, round_id: Uuid) -> Result<Vec<Vote>, AppError> {
        Ok(self.store.list_votes(round_id).await?)
    }
}

fn closed_proposal() -> AppError {
    AppError::InvalidState("Cannot vote on a closed proposal".to_string())
}
