use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a proposal. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Open,
    Closed,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Open => "open",
            ProposalStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ProposalStatus::Open),
            "closed" => Ok(ProposalStatus::Closed),
            other => Err(format!("unknown proposal status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn is_open(&self) -> bool {
        self.status == ProposalStatus::Open
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }
}

/// Insert payload; the store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
}

/// Which proposals a listing returns. Listings are always newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalFilter {
    All,
    Active,
    CreatedBy(Uuid),
}

impl ProposalFilter {
    pub fn matches(&self, proposal: &Proposal) -> bool {
        match self {
            ProposalFilter::All => true,
            ProposalFilter::Active => proposal.is_open(),
            ProposalFilter::CreatedBy(owner) => proposal.created_by == *owner,
        }
    }
}

/// Body of `POST /proposals` and `PUT /proposals/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}
