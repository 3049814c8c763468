#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use phreddit::models::*;
use phreddit::repo::inmem::InMemRepo;
use phreddit::repo::{CommentRepo, CommunityRepo, LinkFlairRepo, PostRepo, RepoError, RepoResult, UserRepo};
use phreddit::ForumService;

pub const PASSWORD: &str = "correct horse";
/// Keeps bcrypt fast in tests.
pub const TEST_COST: u32 = 4;

pub fn setup() -> (Arc<InMemRepo>, ForumService) {
    let repo = Arc::new(InMemRepo::ephemeral());
    let svc = ForumService::new(repo.clone());
    (repo, svc)
}

pub async fn register(svc: &ForumService, name: &str) -> Caller {
    let user = svc
        .register(
            RegisterUser {
                email: format!("{name}@example.com"),
                display_name: name.into(),
                first_name: name.into(),
                last_name: "Tester".into(),
                password: PASSWORD.into(),
            },
            TEST_COST,
        )
        .await
        .unwrap();
    Caller::from(&user)
}

/// Re-reads the caller so reputation reflects earlier votes.
pub async fn refresh(svc: &ForumService, caller: &Caller) -> Caller {
    Caller::from(&svc.user(caller.user_id).await.unwrap())
}

pub async fn set_reputation(repo: &InMemRepo, caller: &Caller, reputation: i64) -> Caller {
    let mut user = repo.get_user(caller.user_id).await.unwrap();
    user.reputation = reputation;
    Caller::from(&repo.put_user(user).await.unwrap())
}

pub async fn make_admin(repo: &InMemRepo, caller: &Caller) -> Caller {
    let mut user = repo.get_user(caller.user_id).await.unwrap();
    user.is_admin = true;
    Caller::from(&repo.put_user(user).await.unwrap())
}

pub async fn community(svc: &ForumService, caller: &Caller, name: &str) -> Community {
    svc.create_community(caller, NewCommunity { name: name.into(), description: format!("all about {name}") })
        .await
        .unwrap()
}

pub async fn post(svc: &ForumService, caller: &Caller, community_id: Id, title: &str, content: &str) -> Post {
    svc.create_post(
        caller,
        NewPost { community_id, title: title.into(), content: content.into(), flair_id: None },
    )
    .await
    .unwrap()
}

/// Waits a moment first so sibling timestamps are strictly ordered.
pub async fn reply_to_post(svc: &ForumService, caller: &Caller, post_id: Id, content: &str) -> Comment {
    tokio::time::sleep(Duration::from_millis(3)).await;
    svc.create_comment(caller, NewComment { content: content.into(), post_id: Some(post_id), parent_comment_id: None })
        .await
        .unwrap()
}

pub async fn reply_to_comment(svc: &ForumService, caller: &Caller, parent: Id, content: &str) -> Comment {
    tokio::time::sleep(Duration::from_millis(3)).await;
    svc.create_comment(caller, NewComment { content: content.into(), post_id: None, parent_comment_id: Some(parent) })
        .await
        .unwrap()
}

pub fn set_secret() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

/// Settings for in-process apps: cheap hashing, no rate limits.
pub fn test_settings() -> phreddit::Settings {
    phreddit::Settings { bcrypt_cost: TEST_COST, rate_limit_enabled: false, ..phreddit::Settings::from_env() }
}

pub fn test_state() -> phreddit::AppState {
    set_secret();
    phreddit::AppState::new(Arc::new(InMemRepo::ephemeral()), test_settings())
}

/// A store write that [`FaultyRepo`] refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    DeleteComment(Id),
    DeletePost(Id),
    PutCommunity(Id),
    PutUser(Id),
}

/// Passes everything to an [`InMemRepo`] except the writes listed in `faults`.
pub struct FaultyRepo {
    inner: Arc<InMemRepo>,
    faults: Mutex<Vec<Fault>>,
}

impl FaultyRepo {
    pub fn fail(&self, fault: Fault) {
        self.faults.lock().unwrap().push(fault);
    }

    fn check(&self, op: Fault) -> RepoResult<()> {
        if self.faults.lock().unwrap().contains(&op) {
            return Err(RepoError::Internal(format!("store unavailable for {op:?}")));
        }
        Ok(())
    }
}

/// Like [`setup`], but the service writes through a [`FaultyRepo`]. The plain
/// repo reads the same data without faults.
pub fn setup_faulty() -> (Arc<InMemRepo>, Arc<FaultyRepo>, ForumService) {
    let repo = Arc::new(InMemRepo::ephemeral());
    let faulty = Arc::new(FaultyRepo { inner: repo.clone(), faults: Mutex::new(Vec::new()) });
    let svc = ForumService::new(faulty.clone());
    (repo, faulty, svc)
}

#[async_trait]
impl CommunityRepo for FaultyRepo {
    async fn list_communities(&self) -> RepoResult<Vec<Community>> { self.inner.list_communities().await }
    async fn get_community(&self, id: Id) -> RepoResult<Community> { self.inner.get_community(id).await }
    async fn insert_community(&self, community: Community) -> RepoResult<Community> {
        self.inner.insert_community(community).await
    }
    async fn put_community(&self, community: Community) -> RepoResult<Community> {
        self.check(Fault::PutCommunity(community.id))?;
        self.inner.put_community(community).await
    }
    async fn delete_community(&self, id: Id) -> RepoResult<()> { self.inner.delete_community(id).await }
}

#[async_trait]
impl PostRepo for FaultyRepo {
    async fn list_posts(&self) -> RepoResult<Vec<Post>> { self.inner.list_posts().await }
    async fn get_post(&self, id: Id) -> RepoResult<Post> { self.inner.get_post(id).await }
    async fn insert_post(&self, post: Post) -> RepoResult<Post> { self.inner.insert_post(post).await }
    async fn put_post(&self, post: Post) -> RepoResult<Post> { self.inner.put_post(post).await }
    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        self.check(Fault::DeletePost(id))?;
        self.inner.delete_post(id).await
    }
}

#[async_trait]
impl CommentRepo for FaultyRepo {
    async fn list_comments(&self) -> RepoResult<Vec<Comment>> { self.inner.list_comments().await }
    async fn get_comment(&self, id: Id) -> RepoResult<Comment> { self.inner.get_comment(id).await }
    async fn insert_comment(&self, comment: Comment) -> RepoResult<Comment> { self.inner.insert_comment(comment).await }
    async fn put_comment(&self, comment: Comment) -> RepoResult<Comment> { self.inner.put_comment(comment).await }
    async fn delete_comment(&self, id: Id) -> RepoResult<()> {
        self.check(Fault::DeleteComment(id))?;
        self.inner.delete_comment(id).await
    }
}

#[async_trait]
impl LinkFlairRepo for FaultyRepo {
    async fn list_link_flairs(&self) -> RepoResult<Vec<LinkFlair>> { self.inner.list_link_flairs().await }
    async fn get_link_flair(&self, id: Id) -> RepoResult<LinkFlair> { self.inner.get_link_flair(id).await }
    async fn insert_link_flair(&self, flair: LinkFlair) -> RepoResult<LinkFlair> { self.inner.insert_link_flair(flair).await }
}

#[async_trait]
impl UserRepo for FaultyRepo {
    async fn list_users(&self) -> RepoResult<Vec<User>> { self.inner.list_users().await }
    async fn get_user(&self, id: Id) -> RepoResult<User> { self.inner.get_user(id).await }
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
    async fn find_user_by_display_name(&self, name: &str) -> RepoResult<Option<User>> {
        self.inner.find_user_by_display_name(name).await
    }
    async fn insert_user(&self, user: User) -> RepoResult<User> { self.inner.insert_user(user).await }
    async fn put_user(&self, user: User) -> RepoResult<User> {
        self.check(Fault::PutUser(user.id))?;
        self.inner.put_user(user).await
    }
    async fn delete_user(&self, id: Id) -> RepoResult<()> { self.inner.delete_user(id).await }
}

/// Every id held by a surviving post, comment or community still resolves.
pub async fn assert_no_dangling(repo: &InMemRepo) {
    let comments = repo.list_comments().await.unwrap();
    let posts = repo.list_posts().await.unwrap();
    let comment_ids: HashSet<Id> = comments.iter().map(|c| c.id).collect();
    let post_ids: HashSet<Id> = posts.iter().map(|p| p.id).collect();
    for c in &comments {
        for child in &c.child_comment_ids {
            assert!(comment_ids.contains(child), "comment {} lists deleted reply {child}", c.id);
        }
    }
    for p in &posts {
        for child in &p.child_comment_ids {
            assert!(comment_ids.contains(child), "post {} lists deleted comment {child}", p.id);
        }
    }
    for community in repo.list_communities().await.unwrap() {
        for post in &community.post_ids {
            assert!(post_ids.contains(post), "community {} lists deleted post {post}", community.id);
        }
    }
}
