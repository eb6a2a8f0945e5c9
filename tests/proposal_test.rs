//! Proposal lifecycle tests against the in-memory store.
//!
//! Covers creation rules, listing scopes, and the
//! existence -> ownership -> state order of edit and close.

mod common;

use common::*;
use daovote::errors::AppError;
use daovote::lifecycle::ProposalScope;
use daovote::models::proposal::ProposalStatus;
use uuid::Uuid;

#[tokio::test]
async fn test_create_trims_and_opens() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;

    let proposal = env
        .lifecycle
        .proposals
        .create("  Fund the garden  ", "  Buy seeds and tools  ", alice.id)
        .await
        .expect("create proposal");

    assert_eq!(proposal.title, "Fund the garden");
    assert_eq!(proposal.description, "Buy seeds and tools");
    assert_eq!(proposal.status, ProposalStatus::Open);
    assert_eq!(proposal.created_by, alice.id);
    assert_eq!(proposal.created_at, proposal.updated_at);
}

#[tokio::test]
async fn test_create_rejects_short_description() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;

    let err = env
        .lifecycle
        .proposals
        .create("Title", "abcd", alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Whitespace does not count toward the minimum.
    let err = env
        .lifecycle
        .proposals
        .create("Title", "   abcd   ", alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    env.lifecycle
        .proposals
        .create("Title", "abcde", alice.id)
        .await
        .expect("five characters is enough");
}

#[tokio::test]
async fn test_create_rejects_blank_title() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;

    let err = env
        .lifecycle
        .proposals
        .create("   ", VALID_DESCRIPTION, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(env.lifecycle.proposals.list(ProposalScope::All, alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_long_title_and_description_accepted() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;
    let proposals = &env.lifecycle.proposals;

    let title = "T".repeat(201);
    let description = "d".repeat(10_001);
    let created = proposals
        .create(&title, &description, alice.id)
        .await
        .expect("no upper bound on title or description");
    assert_eq!(created.title.len(), 201);
    assert_eq!(created.description.len(), 10_001);

    let edited = proposals
        .edit(created.id, &"E".repeat(500), "valid desc", alice.id)
        .await
        .expect("edit follows the same rules");
    assert_eq!(edited.title.len(), 500);
}

#[tokio::test]
async fn test_get_unknown_is_not_found() {
    let env = TestEnv::new();
    let err = env.lifecycle.proposals.get(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Proposal")));
}

#[tokio::test]
async fn test_list_scopes() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;
    let bob = env.register(BOB, "bob").await;
    let proposals = &env.lifecycle.proposals;

    let first = proposals.create("First", VALID_DESCRIPTION, alice.id).await.unwrap();
    let second = proposals.create("Second", VALID_DESCRIPTION, bob.id).await.unwrap();
    let third = proposals.create("Third", VALID_DESCRIPTION, alice.id).await.unwrap();
    proposals.close(first.id, alice.id).await.unwrap();

    let all = proposals.list(ProposalScope::All, alice.id).await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id], "newest first");

    let active = proposals.list(ProposalScope::Active, alice.id).await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|p| p.status == ProposalStatus::Open));

    let mine = proposals.list(ProposalScope::Mine, bob.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, second.id);
}

#[tokio::test]
async fn test_edit_by_owner() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;
    let proposals = &env.lifecycle.proposals;

    let created = proposals.create("Old title", VALID_DESCRIPTION, alice.id).await.unwrap();
    let edited = proposals
        .edit(created.id, "New title", "A better rationale", alice.id)
        .await
        .expect("owner edits");

    assert_eq!(edited.title, "New title");
    assert_eq!(edited.description, "A better rationale");
    assert!(edited.updated_at >= created.updated_at);
    assert_eq!(edited.created_at, created.created_at);
}

#[tokio::test]
async fn test_edit_validates_description() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;
    let proposals = &env.lifecycle.proposals;

    let created = proposals.create("Title", VALID_DESCRIPTION, alice.id).await.unwrap();
    let err = proposals.edit(created.id, "Title", "tiny", alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let unchanged = proposals.get(created.id).await.unwrap();
    assert_eq!(unchanged.description, VALID_DESCRIPTION);
}

#[tokio::test]
async fn test_edit_by_non_owner_is_forbidden() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;
    let bob = env.register(BOB, "bob").await;
    let proposals = &env.lifecycle.proposals;

    let created = proposals.create("Title", VALID_DESCRIPTION, alice.id).await.unwrap();
    let err = proposals
        .edit(created.id, "Hijacked", VALID_DESCRIPTION, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = proposals.close(created.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(proposals.get(created.id).await.unwrap().is_open());
}

#[tokio::test]
async fn test_closed_proposal_is_immutable() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;
    let bob = env.register(BOB, "bob").await;
    let proposals = &env.lifecycle.proposals;

    let created = proposals.create("Title", VALID_DESCRIPTION, alice.id).await.unwrap();
    let closed = proposals.close(created.id, alice.id).await.expect("close");
    assert_eq!(closed.status, ProposalStatus::Closed);

    let err = proposals.close(created.id, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "closing twice");

    let err = proposals
        .edit(created.id, "Too late", VALID_DESCRIPTION, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Ownership is checked before state.
    let err = proposals.close(created.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_edit_unknown_is_not_found() {
    let env = TestEnv::new();
    let alice = env.register(ALICE, "alice").await;

    let err = env
        .lifecycle
        .proposals
        .edit(Uuid::new_v4(), "Title", VALID_DESCRIPTION, alice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Proposal")));
}
