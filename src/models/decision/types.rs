use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::vote::{Vote, VoteDecision};

/// One voting round on a proposal ("decision" on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRound {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub decision_point: i32,
    pub success: Option<bool>,
    pub percent_approval: Option<f64>,
    /// Ids of the round's votes in cast order. Derived from the votes table.
    pub vote_links: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Partial outcome update. The outer `Option` is "field present in the
/// request"; for `success` and `percent_approval` an explicit `null` clears.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoundOutcomeUpdate {
    #[serde(default, deserialize_with = "present")]
    pub success: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub percent_approval: Option<Option<f64>>,
    #[serde(default)]
    pub vote_links: Option<Vec<Uuid>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RoundOutcomeUpdate {
    pub fn is_empty(&self) -> bool {
        self.success.is_none() && self.percent_approval.is_none() && self.vote_links.is_none()
    }

    /// Apply the provided fields onto `round`, leaving the rest untouched.
    pub fn apply_to(&self, round: &mut DecisionRound) {
        if let Some(success) = self.success {
            round.success = success;
        }
        if let Some(percent) = self.percent_approval {
            round.percent_approval = percent;
        }
        if let Some(links) = &self.vote_links {
            round.vote_links = links.clone();
        }
    }
}

/// Body of `POST /decisions`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoundRequest {
    #[serde(default)]
    pub proposal_id: String,
    /// Append a fresh round instead of returning the current one.
    #[serde(default)]
    pub new_round: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundListQuery {
    pub proposal_id: Option<String>,
}

/// Aggregated counts for a round, computed from its votes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTally {
    pub decision_id: Uuid,
    pub approve: i64,
    pub deny: i64,
    pub abstain: i64,
    pub total: i64,
    /// approve / (approve + deny), as a percentage. Abstentions don't count.
    pub percent_approval: Option<f64>,
}

impl RoundTally {
    pub fn from_votes(decision_id: Uuid, votes: &[Vote]) -> Self {
        let count = |d: VoteDecision| votes.iter().filter(|v| v.decision == d).count() as i64;
        let approve = count(VoteDecision::Approve);
        let deny = count(VoteDecision::Deny);
        let abstain = count(VoteDecision::Abstain);

        let decisive = approve + deny;
        let percent_approval = (decisive > 0)
            .then(|| (approve as f64 / decisive as f64 * 10_000.0).round() / 100.0);

        RoundTally {
            decision_id,
            approve,
            deny,
            abstain,
            total: votes.len() as i64,
            percent_approval,
        }
    }
}
