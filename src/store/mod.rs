//! Persistence boundary for users, proposals, decision rounds and votes.
//!
//! Managers only ever see `Arc<dyn Store>`. Compound operations that carry an
//! invariant (next decision point, get-or-create, vote insert plus
//! `vote_links` append, status-gated updates) are single store calls so each
//! implementation can make them atomic.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::models::decision::{DecisionRound, RoundOutcomeUpdate};
use crate::models::proposal::{NewProposal, Proposal, ProposalFilter};
use crate::models::user::User;
use crate::models::vote::{NewVote, Vote};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    /// A unique constraint rejected the write; carries the constraint name.
    Duplicate(String),
    /// A persisted value could not be mapped back onto the domain model.
    Corrupt(String),
    Internal(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {e}"),
            StoreError::Duplicate(c) => write!(f, "Duplicate row rejected by {c}"),
            StoreError::Corrupt(e) => write!(f, "Corrupt row: {e}"),
            StoreError::Internal(e) => write!(f, "Internal store error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let constraint = db.constraint().unwrap_or("unique constraint").to_string();
                return StoreError::Duplicate(constraint);
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Insert the user if absent. Returns the stored row and whether it was created.
    async fn ensure_user(
        &self,
        id: Uuid,
        email: Option<&str>,
        username: Option<&str>,
    ) -> StoreResult<(User, bool)>;

    async fn insert_proposal(&self, new: &NewProposal) -> StoreResult<Proposal>;

    async fn find_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>>;

    /// Proposals matching `filter`, newest first.
    async fn list_proposals(&self, filter: ProposalFilter) -> StoreResult<Vec<Proposal>>;

    /// Update title/description only while the proposal is open.
    /// `None` when the proposal is missing or no longer open.
    async fn update_open_proposal(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> StoreResult<Option<Proposal>>;

    /// Transition open -> closed. `None` when missing or already closed.
    async fn close_open_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>>;

    /// Append a round with the proposal's next decision point.
    /// `None` when the proposal is missing or closed.
    async fn append_round(&self, proposal_id: Uuid) -> StoreResult<Option<DecisionRound>>;

    /// Latest round of the proposal, creating the first one if there is none.
    /// The flag is true when a round was created. `None` when the proposal is
    /// missing or closed.
    async fn latest_or_append_round(
        &self,
        proposal_id: Uuid,
    ) -> StoreResult<Option<(DecisionRound, bool)>>;

    async fn find_round(&self, id: Uuid) -> StoreResult<Option<DecisionRound>>;

    /// Rounds of one proposal by decision point descending, or every round
    /// newest first when `proposal_id` is `None`.
    async fn list_rounds(&self, proposal_id: Option<Uuid>) -> StoreResult<Vec<DecisionRound>>;

    async fn update_round_outcome(
        &self,
        id: Uuid,
        update: &RoundOutcomeUpdate,
    ) -> StoreResult<Option<DecisionRound>>;

    async fn find_vote_by_caster(&self, decision_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>>;

    /// Insert the vote and append its id to the round's `vote_links` as one unit.
    /// `None` when the round is missing or its proposal is no longer open.
    /// A second vote for the same (round, user) fails with `StoreError::Duplicate`.
    async fn insert_vote(&self, new: &NewVote) -> StoreResult<Option<Vote>>;

    /// Votes of a round in cast order, with the caster's current username.
    async fn list_votes(&self, decision_id: Uuid) -> StoreResult<Vec<Vote>>;
}
