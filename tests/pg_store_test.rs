//! PostgreSQL store tests. Each test runs in its own schema; all are skipped
//! when TEST_DATABASE_URL is not set.

mod common;

use common::*;
use daovote::models::decision::RoundOutcomeUpdate;
use daovote::models::proposal::{NewProposal, ProposalFilter, ProposalStatus};
use daovote::models::vote::{NewVote, VoteDecision};
use daovote::store::{PgStore, Store, StoreError};
use std::sync::Arc;
use uuid::Uuid;

fn new_vote(decision_id: Uuid, user_id: Uuid, decision: VoteDecision) -> NewVote {
    NewVote {
        decision_id,
        user_id,
        username: None,
        decision,
        voting_logic: None,
        agent_vote: false,
        created_at: chrono::Utc::now(),
    }
}

async fn store_with_proposal(store: &PgStore) -> (Uuid, Uuid) {
    let owner = register(store, Uuid::new_v4(), "owner").await.id;
    let proposal = store
        .insert_proposal(&NewProposal {
            created_by: owner,
            title: "Title".to_string(),
            description: VALID_DESCRIPTION.to_string(),
        })
        .await
        .expect("insert proposal");
    (owner, proposal.id)
}

#[tokio::test]
async fn test_pg_ensure_user_is_idempotent() {
    let Some(db) = setup_test_db().await else { return };
    let store = PgStore::new(db.pool().clone());
    let id = Uuid::new_v4();

    let (user, created) = store.ensure_user(id, Some("a@test.com"), Some("a")).await.unwrap();
    assert!(created);
    assert_eq!(user.username.as_deref(), Some("a"));

    let (again, created) = store.ensure_user(id, Some("other@test.com"), None).await.unwrap();
    assert!(!created);
    assert_eq!(again.email.as_deref(), Some("a@test.com"));
}

#[tokio::test]
async fn test_pg_proposal_conditional_updates() {
    let Some(db) = setup_test_db().await else { return };
    let store = PgStore::new(db.pool().clone());
    let (owner, proposal_id) = store_with_proposal(&store).await;

    let edited = store
        .update_open_proposal(proposal_id, "New", "New description")
        .await
        .unwrap()
        .expect("open proposal is editable");
    assert_eq!(edited.title, "New");

    let closed = store.close_open_proposal(proposal_id).await.unwrap().expect("close");
    assert_eq!(closed.status, ProposalStatus::Closed);

    assert!(store.close_open_proposal(proposal_id).await.unwrap().is_none());
    assert!(store.update_open_proposal(proposal_id, "X", "Again").await.unwrap().is_none());

    let mine = store.list_proposals(ProposalFilter::CreatedBy(owner)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(store.list_proposals(ProposalFilter::Active).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pg_round_points_and_latest() {
    let Some(db) = setup_test_db().await else { return };
    let store = PgStore::new(db.pool().clone());
    let (_, proposal_id) = store_with_proposal(&store).await;

    let (first, created) = store.latest_or_append_round(proposal_id).await.unwrap().unwrap();
    assert!(created);
    assert_eq!(first.decision_point, 1);

    let (same, created) = store.latest_or_append_round(proposal_id).await.unwrap().unwrap();
    assert!(!created);
    assert_eq!(same.id, first.id);

    let second = store.append_round(proposal_id).await.unwrap().unwrap();
    assert_eq!(second.decision_point, 2);

    let listed = store.list_rounds(Some(proposal_id)).await.unwrap();
    assert_eq!(listed.iter().map(|r| r.decision_point).collect::<Vec<_>>(), vec![2, 1]);

    store.close_open_proposal(proposal_id).await.unwrap();
    assert!(store.append_round(proposal_id).await.unwrap().is_none());
    assert!(store.latest_or_append_round(proposal_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pg_concurrent_rounds_are_unique() {
    let Some(db) = setup_test_db().await else { return };
    let store = Arc::new(PgStore::new(db.pool().clone()));
    let (_, proposal_id) = store_with_proposal(&store).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.append_round(proposal_id).await }));
    }
    let mut points = Vec::new();
    for handle in handles {
        points.push(handle.await.unwrap().unwrap().unwrap().decision_point);
    }
    points.sort();
    assert_eq!(points, (1..=6).collect::<Vec<i32>>());
}

#[tokio::test]
async fn test_pg_votes_and_links() {
    let Some(db) = setup_test_db().await else { return };
    let store = PgStore::new(db.pool().clone());
    let (owner, proposal_id) = store_with_proposal(&store).await;
    let voter = register(&store, Uuid::new_v4(), "voter").await.id;
    let round = store.append_round(proposal_id).await.unwrap().unwrap();

    let first = store
        .insert_vote(&new_vote(round.id, owner, VoteDecision::Approve))
        .await
        .unwrap()
        .expect("open proposal accepts votes");
    let second = store
        .insert_vote(&new_vote(round.id, voter, VoteDecision::Deny))
        .await
        .unwrap()
        .expect("open proposal accepts votes");

    let err = store
        .insert_vote(&new_vote(round.id, voter, VoteDecision::Approve))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));

    let round = store.find_round(round.id).await.unwrap().unwrap();
    assert_eq!(round.vote_links, vec![first.id, second.id]);

    let votes = store.list_votes(round.id).await.unwrap();
    assert_eq!(votes.iter().map(|v| v.id).collect::<Vec<_>>(), vec![first.id, second.id]);
    assert_eq!(votes[1].username.as_deref(), Some("voter"), "username joined from users");

    assert!(store.find_vote_by_caster(round.id, voter).await.unwrap().is_some());
    assert!(store.list_votes(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pg_round_outcome_update() {
    let Some(db) = setup_test_db().await else { return };
    let store = PgStore::new(db.pool().clone());
    let (_, proposal_id) = store_with_proposal(&store).await;
    let round = store.append_round(proposal_id).await.unwrap().unwrap();

    let update = RoundOutcomeUpdate {
        success: Some(Some(true)),
        percent_approval: Some(Some(62.5)),
        vote_links: None,
    };
    let updated = store.update_round_outcome(round.id, &update).await.unwrap().unwrap();
    assert_eq!(updated.success, Some(true));
    assert_eq!(updated.percent_approval, Some(62.5));

    let clear = RoundOutcomeUpdate { success: Some(None), ..Default::default() };
    let updated = store.update_round_outcome(round.id, &clear).await.unwrap().unwrap();
    assert_eq!(updated.success, None);
    assert_eq!(updated.percent_approval, Some(62.5));

    assert!(store.update_round_outcome(Uuid::new_v4(), &clear).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pg_vote_rejected_once_proposal_closed() {
    let Some(db) = setup_test_db().await else { return };
    let store = PgStore::new(db.pool().clone());
    let (owner, proposal_id) = store_with_proposal(&store).await;
    let round = store.append_round(proposal_id).await.unwrap().unwrap();
    store.close_open_proposal(proposal_id).await.unwrap();

    let vote = store
        .insert_vote(&new_vote(round.id, owner, VoteDecision::Approve))
        .await
        .unwrap();
    assert!(vote.is_none());
    assert!(store.find_round(round.id).await.unwrap().unwrap().vote_links.is_empty());
    assert!(store.list_votes(round.id).await.unwrap().is_empty());
}
