#![cfg(feature = "inmem-store")]

use chrono::Utc;
use phreddit::{
    models::{Comment, Community, LinkFlair, User},
    repo::{inmem::InMemRepo, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use phreddit::repo::{CommentRepo, CommunityRepo, LinkFlairRepo, UserRepo};

fn community(name: &str) -> Community {
    Community {
        id: 0,
        name: name.into(),
        description: "about things".into(),
        created_at: Utc::now(),
        members: vec!["alice".into()],
        creators: vec!["alice".into()],
        post_ids: vec![],
    }
}

fn user(email: &str, display_name: &str) -> User {
    User {
        id: 0,
        email: email.into(),
        display_name: display_name.into(),
        first_name: "A".into(),
        last_name: "B".into(),
        password_hash: "x".into(),
        reputation: 100,
        joined_at: Utc::now(),
        is_admin: false,
    }
}

#[tokio::test]
async fn community_crud_and_conflict() {
    let r = InMemRepo::ephemeral();

    // starts empty
    assert!(r.list_communities().await.unwrap().is_empty());

    let c = r.insert_community(community("rust")).await.unwrap();
    assert!(c.id > 0);
    assert_eq!(r.get_community(c.id).await.unwrap().name, "rust");

    // duplicate name
    match r.insert_community(community("rust")).await {
        Err(RepoError::Conflict(what)) => assert_eq!(what, "community name"),
        other => panic!("expected conflict, got {other:?}"),
    }

    // renaming onto another community's name conflicts too
    let other = r.insert_community(community("go")).await.unwrap();
    let mut renamed = other.clone();
    renamed.name = "rust".into();
    assert!(matches!(r.put_community(renamed).await, Err(RepoError::Conflict(_))));

    // but re-saving under its own name is fine
    let mut same = c.clone();
    same.description = "updated".into();
    assert_eq!(r.put_community(same).await.unwrap().description, "updated");

    r.delete_community(other.id).await.unwrap();
    assert!(matches!(r.get_community(other.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.delete_community(other.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn ids_are_assigned_by_the_store() {
    let r = InMemRepo::ephemeral();
    let seed = Comment {
        id: 999,
        content: "hi".into(),
        author_name: "alice".into(),
        created_at: Utc::now(),
        child_comment_ids: vec![],
        vote_count: 0,
        voters: vec![],
    };
    let a = r.insert_comment(seed.clone()).await.unwrap();
    let b = r.insert_comment(seed).await.unwrap();
    assert_ne!(a.id, 999);
    assert_ne!(a.id, b.id);
    assert_eq!(r.list_comments().await.unwrap().len(), 2);
}

#[tokio::test]
async fn put_of_missing_document_is_not_found() {
    let r = InMemRepo::ephemeral();
    let mut c = community("ghost");
    c.id = 41;
    assert!(matches!(r.put_community(c).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn users_unique_by_email_and_display_name() {
    let r = InMemRepo::ephemeral();
    let u = r.insert_user(user("a@x.io", "alice")).await.unwrap();

    assert!(matches!(r.insert_user(user("a@x.io", "other")).await, Err(RepoError::Conflict(w)) if w == "email"));
    assert!(matches!(r.insert_user(user("b@x.io", "alice")).await, Err(RepoError::Conflict(w)) if w == "display name"));

    assert_eq!(r.find_user_by_email("a@x.io").await.unwrap().unwrap().id, u.id);
    assert_eq!(r.find_user_by_display_name("alice").await.unwrap().unwrap().id, u.id);
    assert!(r.find_user_by_display_name("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn link_flairs_listed() {
    let r = InMemRepo::ephemeral();
    r.insert_link_flair(LinkFlair { id: 0, content: "Discussion".into() }).await.unwrap();
    r.insert_link_flair(LinkFlair { id: 0, content: "News".into() }).await.unwrap();
    let flairs = r.list_link_flairs().await.unwrap();
    assert_eq!(flairs.len(), 2);
    assert!(r.get_link_flair(flairs[0].id).await.is_ok());
}

#[tokio::test]
async fn snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let r = InMemRepo::with_data_dir(dir.path());
        r.insert_community(community("persisted")).await.unwrap().id
    };
    let reopened = InMemRepo::with_data_dir(dir.path());
    assert_eq!(reopened.get_community(id).await.unwrap().name, "persisted");
    // id counter continues past the loaded documents
    let next = reopened.insert_community(community("next")).await.unwrap();
    assert!(next.id > id);
}

#[tokio::test]
async fn failed_snapshot_write_leaves_memory_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let r = InMemRepo::with_data_dir(dir.path());
    let kept = r.insert_community(community("kept")).await.unwrap();

    // a directory where the snapshot file should be makes every write fail
    let snapshot = dir.path().join("state.json");
    std::fs::remove_file(&snapshot).unwrap();
    std::fs::create_dir(&snapshot).unwrap();

    let err = r.insert_community(community("lost")).await.unwrap_err();
    assert!(matches!(err, RepoError::Internal(_)));
    assert_eq!(r.list_communities().await.unwrap().len(), 1);

    let mut renamed = kept.clone();
    renamed.name = "renamed".into();
    assert!(matches!(r.put_community(renamed).await, Err(RepoError::Internal(_))));
    assert_eq!(r.get_community(kept.id).await.unwrap().name, "kept");

    assert!(matches!(r.delete_community(kept.id).await, Err(RepoError::Internal(_))));
    assert_eq!(r.get_community(kept.id).await.unwrap().name, "kept");
}
