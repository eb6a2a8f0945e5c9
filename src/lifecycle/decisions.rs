use std::sync::Arc;
use uuid::Uuid;

use crate::auth::validate;
use crate::errors::AppError;
use crate::models::decision::{DecisionRound, RoundOutcomeUpdate, RoundTally};
use crate::models::proposal::Proposal;
use crate::store::Store;

pub struct DecisionManager {
    store: Arc<dyn Store>,
}

impl DecisionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Current round of the proposal, opening the first one if needed.
    /// The flag is true when a round was created by this call.
    pub async fn get_or_create_round(
        &self,
        proposal_id: Uuid,
        caller: Uuid,
    ) -> Result<(DecisionRound, bool), AppError> {
        self.open_proposal(proposal_id).await?;

        let (round, created) = self
            .store
            .latest_or_append_round(proposal_id)
            .await?
            .ok_or_else(closed_proposal)?;

        if created {
            log::info!(
                "decision.created id={} proposal={} point={} by={}",
                round.id,
                proposal_id,
                round.decision_point,
                caller
            );
        }
        Ok((round, created))
    }

    /// Always open a new round with the next decision point.
    pub async fn create_round(&self, proposal_id: Uuid, caller: Uuid) -> Result<DecisionRound, AppError> {
        self.open_proposal(proposal_id).await?;

        let round = self
            .store
            .append_round(proposal_id)
            .await?
            .ok_or_else(closed_proposal)?;

        log::info!(
            "decision.created id={} proposal={} point={} by={}",
            round.id,
            proposal_id,
            round.decision_point,
            caller
        );
        Ok(round)
    }

    pub async fn get_round(&self, round_id: Uuid) -> Result<DecisionRound, AppError> {
        self.store
            .find_round(round_id)
            .await?
            .ok_or(AppError::NotFound("Decision"))
    }

    pub async fn list_rounds(&self, proposal_id: Option<Uuid>) -> Result<Vec<DecisionRound>, AppError> {
        Ok(self.store.list_rounds(proposal_id).await?)
    }

    /// Record outcome fields. Only the proposal's creator may do this, and it
    /// stays allowed after the proposal is closed.
    pub async fn update_outcome(
        &self,
        round_id: Uuid,
        update: &RoundOutcomeUpdate,
        caller: Uuid,
    ) -> Result<DecisionRound, AppError> {
        let round = self.get_round(round_id).await?;
        let proposal = self
            .store
            .find_proposal(round.proposal_id)
            .await?
            .ok_or(AppError::NotFound("Associated proposal"))?;

        if !proposal.is_owned_by(caller) {
            return Err(AppError::Forbidden(
                "Only the proposal creator can update decisions".to_string(),
            ));
        }
        if let Some(Some(percent)) = update.percent_approval {
            validate::check([validate::validate_percent(percent)])?;
        }
        if update.is_empty() {
            return Ok(round);
        }

        let updated = self
            .store
            .update_round_outcome(round_id, update)
            .await?
            .ok_or(AppError::NotFound("Decision"))?;

        log::info!(
            "decision.outcome id={} success={:?} percent_approval={:?}",
            round_id,
            updated.success,
            updated.percent_approval
        );
        Ok(updated)
    }

    /// Counts over the round's votes. The votes table is authoritative,
    /// not `vote_links`.
    pub async fn tally(&self, round_id: Uuid) -> Result<RoundTally, AppError> {
        let round = self.get_round(round_id).await?;
        let votes = self.store.list_votes(round.id).await?;
        Ok(RoundTally::from_votes(round.id, &votes))
    }

    async fn open_proposal(&self, proposal_id: Uuid) -> Result<Proposal, AppError> {
        let proposal = self
            .store
            .find_proposal(proposal_id)
            .await?
            .ok_or(AppError::NotFound("Proposal"))?;
        if !proposal.is_open() {
            return Err(closed_proposal());
        }
        Ok(proposal)
    }
}

fn closed_proposal() -> AppError {
    AppError::InvalidState("Cannot create decision for a closed proposal".to_string())
}
