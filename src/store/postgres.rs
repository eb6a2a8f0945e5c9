use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::decision::{DecisionRound, RoundOutcomeUpdate};
use crate::models::proposal::{NewProposal, Proposal, ProposalFilter};
use crate::models::user::User;
use crate::models::vote::{NewVote, Vote};

const PROPOSAL_COLUMNS: &str =
    "id, created_by, title, description, status, created_at, updated_at";
const ROUND_COLUMNS: &str =
    "id, proposal_id, decision_point, success, percent_approval, vote_links, created_at";
const VOTE_COLUMNS: &str =
    "id, decision_id, user_id, username, decision, voting_logic, agent_vote, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProposalRow {
    id: Uuid,
    created_by: Uuid,
    title: String,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = StoreError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        Ok(Proposal {
            id: row.id,
            created_by: row.created_by,
            title: row.title,
            description: row.description,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoundRow {
    id: Uuid,
    proposal_id: Uuid,
    decision_point: i32,
    success: Option<bool>,
    percent_approval: Option<f64>,
    vote_links: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<RoundRow> for DecisionRound {
    fn from(row: RoundRow) -> Self {
        DecisionRound {
            id: row.id,
            proposal_id: row.proposal_id,
            decision_point: row.decision_point,
            success: row.success,
            percent_approval: row.percent_approval,
            vote_links: row.vote_links,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    decision_id: Uuid,
    user_id: Uuid,
    username: Option<String>,
    decision: String,
    voting_logic: Option<String>,
    agent_vote: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = StoreError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        Ok(Vote {
            id: row.id,
            decision_id: row.decision_id,
            user_id: row.user_id,
            username: row.username,
            decision: row.decision.parse().map_err(StoreError::Corrupt)?,
            voting_logic: row.voting_logic,
            agent_vote: row.agent_vote,
            created_at: row.created_at,
        })
    }
}

fn into_proposals(rows: Vec<ProposalRow>) -> StoreResult<Vec<Proposal>> {
    rows.into_iter().map(Proposal::try_from).collect()
}

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bump the proposal's round counter and insert the round, inside `tx`.
    /// The `status = 'open'` guard makes closing and round creation exclusive.
    async fn append_round_tx(
        tx: &mut Transaction<'_, Postgres>,
        proposal_id: Uuid,
    ) -> StoreResult<Option<DecisionRound>> {
        let next_point: Option<i32> = sqlx::query_scalar(
            "UPDATE proposals SET round_counter = round_counter + 1 \
             WHERE id = $1 AND status = 'open' \
             RETURNING round_counter",
        )
        .bind(proposal_id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(decision_point) = next_point else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, RoundRow>(&format!(
            "INSERT INTO decision_rounds (proposal_id, decision_point, created_at) \
             VALUES ($1, $2, $3) RETURNING {ROUND_COLUMNS}"
        ))
        .bind(proposal_id)
        .bind(decision_point)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(Some(row.into()))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn ensure_user(
        &self,
        id: Uuid,
        email: Option<&str>,
        username: Option<&str>,
    ) -> StoreResult<(User, bool)> {
        let inserted = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, username, email, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING id, username, email, created_at",
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = self
            .find_user(id)
            .await?
            .ok_or_else(|| StoreError::Internal(format!("user {id} vanished after upsert")))?;
        Ok((existing, false))
    }

    async fn insert_proposal(&self, new: &NewProposal) -> StoreResult<Proposal> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "INSERT INTO proposals (created_by, title, description, status, created_at, updated_at) \
             VALUES ($1, $2, $3, 'open', $4, $4) RETURNING {PROPOSAL_COLUMNS}"
        ))
        .bind(new.created_by)
        .bind(&new.title)
        .bind(&new.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn list_proposals(&self, filter: ProposalFilter) -> StoreResult<Vec<Proposal>> {
        let rows = match filter {
            ProposalFilter::All => {
                sqlx::query_as::<_, ProposalRow>(&format!(
                    "SELECT {PROPOSAL_COLUMNS} FROM proposals ORDER BY created_at DESC, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            ProposalFilter::Active => {
                sqlx::query_as::<_, ProposalRow>(&format!(
                    "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE status = 'open' \
                     ORDER BY created_at DESC, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            ProposalFilter::CreatedBy(owner) => {
                sqlx::query_as::<_, ProposalRow>(&format!(
                    "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE created_by = $1 \
                     ORDER BY created_at DESC, id"
                ))
                .bind(owner)
                .fetch_all(&self.pool)
                .await?
            }
        };
        into_proposals(rows)
    }

    async fn update_open_proposal(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> StoreResult<Option<Proposal>> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "UPDATE proposals SET title = $1, description = $2, updated_at = $3 \
             WHERE id = $4 AND status = 'open' RETURNING {PROPOSAL_COLUMNS}"
        ))
        .bind(title)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn close_open_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let row = sqlx::query_as::<_, ProposalRow>(&format!(
            "UPDATE proposals SET status = 'closed', updated_at = $1 \
             WHERE id = $2 AND status = 'open' RETURNING {PROPOSAL_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Proposal::try_from).transpose()
    }

    async fn append_round(&self, proposal_id: Uuid) -> StoreResult<Option<DecisionRound>> {
        let mut tx = self.pool.begin().await?;
        let round = Self::append_round_tx(&mut tx, proposal_id).await?;
        tx.commit().await?;
        Ok(round)
    }

    async fn latest_or_append_round(
        &self,
        proposal_id: Uuid,
    ) -> StoreResult<Option<(DecisionRound, bool)>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent get-or-create calls for one proposal.
        let open: Option<bool> = sqlx::query_scalar(
            "SELECT status = 'open' FROM proposals WHERE id = $1 FOR UPDATE",
        )
        .bind(proposal_id)
        .fetch_optional(&mut *tx)
        .await?;

        if open != Some(true) {
            tx.rollback().await?;
            return Ok(None);
        }

        let latest = sqlx::query_as::<_, RoundRow>(&format!(
            "SELECT {ROUND_COLUMNS} FROM decision_rounds WHERE proposal_id = $1 \
             ORDER BY decision_point DESC LIMIT 1"
        ))
        .bind(proposal_id)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match latest {
            Some(row) => Some((row.into(), false)),
            None => Self::append_round_tx(&mut tx, proposal_id)
                .await?
                .map(|round| (round, true)),
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn find_round(&self, id: Uuid) -> StoreResult<Option<DecisionRound>> {
        let row = sqlx::query_as::<_, RoundRow>(&format!(
            "SELECT {ROUND_COLUMNS} FROM decision_rounds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DecisionRound::from))
    }

    async fn list_rounds(&self, proposal_id: Option<Uuid>) -> StoreResult<Vec<DecisionRound>> {
        let rows = match proposal_id {
            Some(pid) => {
                sqlx::query_as::<_, RoundRow>(&format!(
                    "SELECT {ROUND_COLUMNS} FROM decision_rounds WHERE proposal_id = $1 \
                     ORDER BY decision_point DESC"
                ))
                .bind(pid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RoundRow>(&format!(
                    "SELECT {ROUND_COLUMNS} FROM decision_rounds ORDER BY created_at DESC, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(DecisionRound::from).collect())
    }

    async fn update_round_outcome(
        &self,
        id: Uuid,
        update: &RoundOutcomeUpdate,
    ) -> StoreResult<Option<DecisionRound>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, RoundRow>(&format!(
            "SELECT {ROUND_COLUMNS} FROM decision_rounds WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut round = DecisionRound::from(current);
        update.apply_to(&mut round);

        let row = sqlx::query_as::<_, RoundRow>(&format!(
            "UPDATE decision_rounds SET success = $1, percent_approval = $2, vote_links = $3 \
             WHERE id = $4 RETURNING {ROUND_COLUMNS}"
        ))
        .bind(round.success)
        .bind(round.percent_approval)
        .bind(&round.vote_links)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn find_vote_by_caster(&self, decision_id: Uuid, user_id: Uuid) -> StoreResult<Option<Vote>> {
        let row = sqlx::query_as::<_, VoteRow>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE decision_id = $1 AND user_id = $2"
        ))
        .bind(decision_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Vote::try_from).transpose()
    }

    async fn insert_vote(&self, new: &NewVote) -> StoreResult<Option<Vote>> {
        let mut tx = self.pool.begin().await?;

        // Shared lock on the proposal row: a concurrent close waits for this
        // transaction, and a committed close is seen here.
        let open: Option<bool> = sqlx::query_scalar(
            "SELECT p.status = 'open' FROM decision_rounds r \
             JOIN proposals p ON p.id = r.proposal_id \
             WHERE r.id = $1 FOR SHARE OF p",
        )
        .bind(new.decision_id)
        .fetch_optional(&mut *tx)
        .await?;

        if open != Some(true) {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, VoteRow>(&format!(
            "INSERT INTO votes \
                 (decision_id, user_id, username, decision, voting_logic, agent_vote, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {VOTE_COLUMNS}"
        ))
        .bind(new.decision_id)
        .bind(new.user_id)
        .bind(&new.username)
        .bind(new.decision.as_str())
        .bind(&new.voting_logic)
        .bind(new.agent_vote)
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE decision_rounds SET vote_links = array_append(vote_links, $1) WHERE id = $2",
        )
        .bind(row.id)
        .bind(new.decision_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into().map(Some)
    }

    async fn list_votes(&self, decision_id: Uuid) -> StoreResult<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            "SELECT v.id, v.decision_id, v.user_id, \
                    COALESCE(u.username, v.username) AS username, \
                    v.decision, v.voting_logic, v.agent_vote, v.created_at \
             FROM votes v \
             LEFT JOIN users u ON u.id = v.user_id \
             WHERE v.decision_id = $1 \
             ORDER BY v.created_at ASC, v.id ASC",
        )
        .bind(decision_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Vote::try_from).collect()
    }
}
