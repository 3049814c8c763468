#![cfg(feature = "inmem-store")]

mod common;

use common::*;
use phreddit::error::ForumError;
use phreddit::models::VoteDirection;
use phreddit::repo::{CommentRepo, PostRepo, UserRepo};
use phreddit::VoteTarget;

#[tokio::test]
async fn up_then_none_restores_everything() {
    let (repo, svc) = setup();
    let author = register(&svc, "author").await;
    let voter = register(&svc, "voter").await;
    let c = community(&svc, &author, "votes").await;
    let p = post(&svc, &author, c.id, "Rate me", "please").await;

    let up = svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::Up).await.unwrap();
    assert_eq!(up.vote_count, 1);
    assert_eq!(up.author_reputation, 105);
    assert_eq!(up.voter_reputation, 100);
    assert_eq!(up.user_vote, VoteDirection::Up);

    let none = svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::None).await.unwrap();
    assert_eq!(none.vote_count, 0);
    assert_eq!(none.author_reputation, 100);

    let stored = repo.get_post(p.id).await.unwrap();
    assert_eq!(stored.vote_count, 0);
    assert!(stored.voters.is_empty());
    assert_eq!(repo.get_user(author.user_id).await.unwrap().reputation, 100);
}

#[tokio::test]
async fn repeating_a_vote_is_rejected_without_changes() {
    let (repo, svc) = setup();
    let author = register(&svc, "author").await;
    let voter = register(&svc, "voter").await;
    let c = community(&svc, &author, "repeat").await;
    let p = post(&svc, &author, c.id, "Again", "and again").await;
    let comment = reply_to_post(&svc, &author, p.id, "hello").await;

    svc.vote(&voter, VoteTarget::Comment(comment.id), VoteDirection::Up).await.unwrap();
    let err = svc.vote(&voter, VoteTarget::Comment(comment.id), VoteDirection::Up).await.unwrap_err();
    assert!(matches!(err, ForumError::NoOpVote));

    let stored = repo.get_comment(comment.id).await.unwrap();
    assert_eq!(stored.vote_count, 1);
    assert_eq!(stored.voters.len(), 1);
    assert_eq!(repo.get_user(author.user_id).await.unwrap().reputation, 105);

    // neutral on a never-voted entity is also a no-op
    let err = svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::None).await.unwrap_err();
    assert!(matches!(err, ForumError::NoOpVote));
}

#[tokio::test]
async fn low_reputation_cannot_vote() {
    let (repo, svc) = setup();
    let author = register(&svc, "author").await;
    let voter = register(&svc, "voter").await;
    let voter = set_reputation(&repo, &voter, 40).await;
    let c = community(&svc, &author, "gate").await;
    let p = post(&svc, &author, c.id, "Locked", "out").await;

    let err = svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::Up).await.unwrap_err();
    assert!(matches!(err, ForumError::InsufficientReputation { required: 50, actual: 40 }));
    assert_eq!(repo.get_post(p.id).await.unwrap().vote_count, 0);
    assert_eq!(repo.get_user(author.user_id).await.unwrap().reputation, 100);

    // exactly at the threshold is enough
    let voter = set_reputation(&repo, &voter, 50).await;
    assert!(svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::Up).await.is_ok());
}

#[tokio::test]
async fn direct_switch_applies_both_halves() {
    let (_repo, svc) = setup();
    let author = register(&svc, "author").await;
    let voter = register(&svc, "voter").await;
    let c = community(&svc, &author, "swing").await;
    let p = post(&svc, &author, c.id, "Swing", "both ways").await;

    svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::Up).await.unwrap();
    let down = svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::Down).await.unwrap();
    assert_eq!(down.vote_count, -1);
    assert_eq!(down.author_reputation, 100 + 5 - 15);

    let back = svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::None).await.unwrap();
    assert_eq!(back.vote_count, 0);
    assert_eq!(back.author_reputation, 100);
}

#[tokio::test]
async fn votes_from_different_users_are_tracked_separately() {
    let (repo, svc) = setup();
    let author = register(&svc, "author").await;
    let a = register(&svc, "a").await;
    let b = register(&svc, "b").await;
    let c = community(&svc, &author, "crowd").await;
    let p = post(&svc, &author, c.id, "Crowd", "vote").await;

    svc.vote(&a, VoteTarget::Post(p.id), VoteDirection::Up).await.unwrap();
    let out = svc.vote(&b, VoteTarget::Post(p.id), VoteDirection::Down).await.unwrap();
    assert_eq!(out.vote_count, 0);
    assert_eq!(out.author_reputation, 95);
    assert_eq!(repo.get_post(p.id).await.unwrap().voters.len(), 2);
}

#[tokio::test]
async fn self_vote_reports_updated_reputation() {
    let (_repo, svc) = setup();
    let author = register(&svc, "author").await;
    let c = community(&svc, &author, "mirror").await;
    let p = post(&svc, &author, c.id, "Me", "myself").await;

    let out = svc.vote(&author, VoteTarget::Post(p.id), VoteDirection::Up).await.unwrap();
    assert_eq!(out.author_reputation, 105);
    assert_eq!(out.voter_reputation, 105);
    assert_eq!(refresh(&svc, &author).await.reputation, 105);
}

#[tokio::test]
async fn voting_on_missing_entity_is_not_found() {
    let (_repo, svc) = setup();
    let voter = register(&svc, "voter").await;
    let err = svc.vote(&voter, VoteTarget::Comment(404), VoteDirection::Up).await.unwrap_err();
    assert!(matches!(err, ForumError::NotFound("comment")));
}

#[tokio::test]
async fn vote_saved_but_author_update_failed_is_partial() {
    let (repo, faulty, svc) = setup_faulty();
    let author = register(&svc, "author").await;
    let voter = register(&svc, "voter").await;
    let c = community(&svc, &author, "flaky").await;
    let p = post(&svc, &author, c.id, "Half", "applied").await;

    faulty.fail(Fault::PutUser(author.user_id));
    let err = svc.vote(&voter, VoteTarget::Post(p.id), VoteDirection::Up).await.unwrap_err();
    assert!(matches!(err, ForumError::PartialCascadeFailure(_)), "got {err:?}");

    assert_eq!(repo.get_post(p.id).await.unwrap().vote_count, 1);
    assert_eq!(repo.get_user(author.user_id).await.unwrap().reputation, 100);
}
