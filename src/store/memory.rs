use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::decision::{DecisionRound, RoundOutcomeUpdate};
use crate::models::proposal::{NewProposal, Proposal, ProposalFilter, ProposalStatus};
use crate::models::user::User;
use crate::models::vote::{NewVote, Vote};

struct ProposalEntry {
    proposal: Proposal,
    round_counter: i32,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    proposals: Vec<ProposalEntry>,
    rounds: Vec<DecisionRound>,
    votes: Vec<Vote>,
}

impl Tables {
    fn proposal_mut(&mut self, id: Uuid) -> Option<&mut ProposalEntry> {
        self.proposals.iter_mut().find(|e| e.proposal.id == id)
    }

    fn open_proposal_mut(&mut self, id: Uuid) -> Option<&mut ProposalEntry> {
        self.proposal_mut(id).filter(|e| e.proposal.is_open())
    }

    fn append_round(&mut self, proposal_id: Uuid) -> Option<DecisionRound> {
        let entry = self.open_proposal_mut(proposal_id)?;
        entry.round_counter += 1;
        let round = DecisionRound {
            id: Uuid::new_v4(),
            proposal_id,
            decision_point: entry.round_counter,
            success: None,
            percent_approval: None,
            vote_links: Vec::new(),
            created_at: Utc::now(),
        };
        self.rounds.push(round.clone());
        Some(round)
    }
}

/// In-process store with the same atomicity as `PgStore`: every trait call
/// runs under a single lock guard. Rows are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn ensure_user(
        &self,
        id: Uuid,
        email: Option<&str>,
        username: Option<&str>,
    ) -> StoreResult<(User, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.users.get(&id) {
            return Ok((existing.clone(), false));
        }
        let user = User {
            id,
            username: username.map(String::from),
            email: email.map(String::from),
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok((user, true))
    }

    async fn insert_proposal(&self, new: &NewProposal) -> StoreResult<Proposal> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.created_by) {
            return Err(StoreError::Internal(format!(
                "proposal owner {} is not a known user",
                new.created_by
            )));
        }
        let now = Utc::now();
        let proposal = Proposal {
            id: Uuid::new_v4(),
            created_by: new.created_by,
            title: new.title.clone(),
            description: new.description.clone(),
            status: ProposalStatus::Open,
            created_at: now,
            updated_at: now,
        };
        tables.proposals.push(ProposalEntry { proposal: proposal.clone(), round_counter: 0 });
        Ok(proposal)
    }

    async fn find_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .proposals
            .iter()
            .find(|e| e.proposal.id == id)
            .map(|e| e.proposal.clone()))
    }

    async fn list_proposals(&self, filter: ProposalFilter) -> StoreResult<Vec<Proposal>> {
        let tables = self.tables.read().await;
        // Reverse insertion order first so equal timestamps still list newest first.
        let mut proposals: Vec<Proposal> = tables
            .proposals
            .iter()
            .rev()
            .map(|e| e.proposal.clone())
            .filter(|p| filter.matches(p))
            .collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn update_open_proposal(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> StoreResult<Option<Proposal>> {
        let mut tables = self.tables.write().await;
        Ok(tables.open_proposal_mut(id).map(|entry| {
            entry.proposal.title = title.to_string();
            entry.proposal.description = description.to_string();
            entry.proposal.updated_at = Utc::now();
            entry.proposal.clone()
        }))
    }

    async fn close_open_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let mut tables = self.tables.write().await;
        Ok(tables.open_proposal_mut(id).map(|entry| {
            entry.proposal.status = ProposalStatus::Closed;
            entry.proposal.updated_at = Utc::now();
            entry.proposal.clone()
        }))
    }

    async fn append_round(&self, proposal_id: Uuid) -> StoreResult<Option<DecisionRound>> {
        Ok(self.tables.write().await.append_round(proposal_id))
    }

    async fn latest_or_append_round(
        &self,
        proposal_id: Uuid,
    ) -> StoreResult<Option<(DecisionRound, bool)>> {
        let mut tables = self.tables.write().await;
        if tables.open_proposal_mut(proposal_id).is_none() {
            return Ok(None);
        }
        let latest = tables
            .rounds
            .iter()
            .filter(|r| r.proposal_id == proposal_id)
            .max_by_key(|r| r.decision_point)
            .cloned();
        match latest {
            Some(round) => Ok(Some((round, false))),
            None => Ok(tables.append_round(proposal_id).map(|round| (round, true))),
        }
    }

    async fn find_round(&self, id: Uuid) -> StoreResult<Option<DecisionRound>> {
        let tables = self.tables.read().await;
        Ok(tables.rounds.iter().find(|r| r.id == id).cloned())
    }

    async fn list_rounds(&self, proposal_id: Option<Uuid>) -> StoreResult<Vec<DecisionRound>> {
        let tables = self.tables.read().await;
        let mut rounds: Vec<DecisionRound> = match proposal_id {
            Some(pid) => tables.rounds.iter().filter(|r| r.proposal_id == pid).cloned().collect(),
            None => tables.rounds.iter().rev().cloned().collect(),
        };
        match proposal_id {
            Some(_) => rounds.sort_by(|a, b| b.decision_point.cmp(&a.decision_point)),
            None => rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        Ok(rounds)
    }

    async fn update_round_outcome(
        &self,
        id: Uuid,
        update: &RoundOutcomeUpdate,
    ) -> StoreResult<Option<DecisionRound>> {
        let mut tables = self.tables.write().await;
        Ok(tables.rounds.iter_mut().find(|r| r.id == id).map(|round| {
            update.apply_to(round);
            round.clone()
        }))
    }

    async fn find_vote_by_caster(&self, decision_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .find(|v| v.decision_id == decision_id && v.user_id == user_id)
            .cloned())
    }

    async fn insert_vote(&self, new: &NewVote) -> StoreResult<Option<Vote>> {
        let mut tables = self.tables.write().await;
        let Some(proposal_id) = tables
            .rounds
            .iter()
            .find(|r| r.id == new.decision_id)
            .map(|r| r.proposal_id)
        else {
            return Ok(None);
        };
        if tables.open_proposal_mut(proposal_id).is_none() {
            return Ok(None);
        }
        if tables
            .votes
            .iter()
            .any(|v| v.decision_id == new.decision_id && v.user_id == new.user_id)
        {
            return Err(StoreError::Duplicate("votes_decision_user_key".to_string()));
        }
        let vote = Vote {
            id: Uuid::new_v4(),
            decision_id: new.decision_id,
            user_id: new.user_id,
            username: new.username.clone(),
            decision: new.decision,
            voting_logic: new.voting_logic.clone(),
            agent_vote: new.agent_vote,
            created_at: new.created_at,
        };
        if let Some(round) = tables.rounds.iter_mut().find(|r| r.id == new.decision_id) {
            round.vote_links.push(vote.id);
        }
        tables.votes.push(vote.clone());
        Ok(Some(vote))
    }

    async fn list_votes(&self, decision_id: Uuid) -> StoreResult<Vec<Vote>> {
        let tables = self.tables.read().await;
        let mut votes: Vec<Vote> = tables
            .votes
            .iter()
            .filter(|v| v.decision_id == decision_id)
            .map(|v| {
                let mut vote = v.clone();
                if let Some(name) = tables.users.get(&v.user_id).and_then(|u| u.username.clone()) {
                    vote.username = Some(name);
                }
                vote
            })
            .collect();
        votes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(votes)
    }
}
