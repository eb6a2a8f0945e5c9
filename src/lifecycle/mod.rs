//! Business rules for proposals, decision rounds and votes.

pub mod decisions;
pub mod proposals;
pub mod votes;

use std::sync::Arc;

use crate::store::Store;

pub use decisions::DecisionManager;
pub use proposals::{ProposalManager, ProposalScope};
pub use votes::VoteManager;

/// The three managers, sharing one store.
pub struct Lifecycle {
    pub proposals: ProposalManager,
    pub decisions: DecisionManager,
    pub votes: VoteManager,
}

impl Lifecycle {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            proposals: ProposalManager::new(store.clone()),
            decisions: DecisionManager::new(store.clone()),
            votes: VoteManager::new(store),
        }
    }
}
