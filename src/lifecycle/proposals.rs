use std::sync::Arc;
use uuid::Uuid;

use crate::auth::validate;
use crate::errors::AppError;
use crate::models::proposal::{NewProposal, Proposal, ProposalFilter};
use crate::store::Store;

/// Which listing the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalScope {
    All,
    Active,
    Mine,
}

pub struct ProposalManager {
    store: Arc<dyn Store>,
}

impl ProposalManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        title: &str,
        description: &str,
        owner: Uuid,
    ) -> Result<Proposal, AppError> {
        validate::check([
            validate::validate_title(title),
            validate::validate_description(description),
        ])?;

        let proposal = self
            .store
            .insert_proposal(&NewProposal {
                created_by: owner,
                title: title.trim().to_string(),
                description: description.trim().to_string(),
            })
            .await?;

        log::info!("proposal.created id={} owner={}", proposal.id, owner);
        Ok(proposal)
    }

    pub async fn get(&self, proposal_id: Uuid) -> Result<Proposal, AppError> {
        self.store
            .find_proposal(proposal_id)
            .await?
            .ok_or(AppError::NotFound("Proposal"))
    }

    pub async fn edit(
        &self,
        proposal_id: Uuid,
        title: &str,
        description: &str,
        caller: Uuid,
    ) -> Result<Proposal, AppError> {
        self.owned_open_proposal(proposal_id, caller).await?;
        validate::check([
            validate::validate_title(title),
            validate::validate_description(description),
        ])?;

        let updated = self
            .store
            .update_open_proposal(proposal_id, title.trim(), description.trim())
            .await?
            .ok_or_else(no_longer_active)?;

        log::info!("proposal.updated id={proposal_id}");
        Ok(updated)
    }

    pub async fn close(&self, proposal_id: Uuid, caller: Uuid) -> Result<Proposal, AppError> {
        self.owned_open_proposal(proposal_id, caller).await?;

        let closed = self
            .store
            .close_open_proposal(proposal_id)
            .await?
            .ok_or_else(no_longer_active)?;

        log::info!("proposal.closed id={proposal_id}");
        Ok(closed)
    }

    pub async fn list(&self, scope: ProposalScope, caller: Uuid) -> Result<Vec<Proposal>, AppError> {
        let filter = match scope {
            ProposalScope::All => ProposalFilter::All,
            ProposalScope::Active => ProposalFilter::Active,
            ProposalScope::Mine => ProposalFilter::CreatedBy(caller),
        };
        Ok(self.store.list_proposals(filter).await?)
    }

    /// Existence, then ownership, then state.
    async fn owned_open_proposal(&self, proposal_id: Uuid, caller: Uuid) -> Result<Proposal, AppError> {
        let proposal = self.get(proposal_id).await?;

        if !proposal.is_owned_by(caller) {
            log::debug!("proposal {proposal_id}: {caller} is not the owner");
            return Err(AppError::Forbidden(
                "You do not have permission to modify this proposal".to_string(),
            ));
        }
        if !proposal.is_open() {
            return Err(no_longer_active());
        }
        Ok(proposal)
    }
}

fn no_longer_active() -> AppError {
    AppError::InvalidState("This proposal is no longer active".to_string())
}
