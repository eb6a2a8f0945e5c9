use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDecision {
    Approve,
    Deny,
    Abstain,
}

impl VoteDecision {
    pub const ALL: [VoteDecision; 3] = [VoteDecision::Approve, VoteDecision::Deny, VoteDecision::Abstain];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDecision::Approve => "approve",
            VoteDecision::Deny => "deny",
            VoteDecision::Abstain => "abstain",
        }
    }
}

impl fmt::Display for VoteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoteDecision::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| "Decision must be one of: approve, deny, abstain".to_string())
    }
}

/// A single ballot. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub decision: VoteDecision,
    pub voting_logic: Option<String>,
    pub agent_vote: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub decision_id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub decision: VoteDecision,
    pub voting_logic: Option<String>,
    pub agent_vote: bool,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /votes`. `decision` stays a string so unknown values
/// surface as a validation error rather than a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct CastVoteRequest {
    #[serde(default)]
    pub decision_id: String,
    #[serde(default)]
    pub decision: String,
    pub voting_logic: Option<String>,
    #[serde(default)]
    pub agent_vote: bool,
}

/// A validated cast request as seen by the vote manager.
#[derive(Debug, Clone)]
pub struct CastVote {
    pub decision_id: Uuid,
    pub decision: String,
    pub voting_logic: Option<String>,
    pub agent_vote: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteListQuery {
    pub decision_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parse() {
        assert_eq!("approve".parse::<VoteDecision>(), Ok(VoteDecision::Approve));
        assert_eq!("deny".parse::<VoteDecision>(), Ok(VoteDecision::Deny));
        assert_eq!("abstain".parse::<VoteDecision>(), Ok(VoteDecision::Abstain));
        assert!("maybe".parse::<VoteDecision>().is_err());
        assert!("Approve".parse::<VoteDecision>().is_err());
    }
}
