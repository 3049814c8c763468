//! Forum operations over a document store.
//!
//! A [`ForumService`] is cheap to build and is constructed per request around a shared
//! repository handle. Multi-document writes are not transactional. Creation writes a
//! child before the parent reference that points at it. Deletion drops the reference
//! to a document before removing it and removes parents before their children, so an
//! interrupted operation can leave unreachable documents behind but no live
//! reference to a deleted one. Once some writes have landed, later failures surface as
//! [`ForumError::PartialCascadeFailure`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::auth::{self, Claims};
use crate::error::{ForumError, ForumResult};
use crate::models::*;
use crate::repo::{Repo, RepoError};
use crate::search::{self, Query};
use crate::tree::{CommentArena, ParentRef};
use crate::vote::{self, VoteDelta};

pub const INITIAL_REPUTATION: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(Id),
    Comment(Id),
}

fn check_text(field: &str, value: &str, max: Option<usize>) -> ForumResult<()> {
    if value.trim().is_empty() {
        return Err(ForumError::Validation(format!("{field} is required")));
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(ForumError::Validation(format!("{field} must be at most {max} characters")));
        }
    }
    Ok(())
}

fn ensure_author(caller: &Caller, author_name: &str) -> ForumResult<()> {
    if caller.is_admin || caller.display_name == author_name {
        Ok(())
    } else {
        Err(ForumError::Forbidden)
    }
}

/// Upgrades a failure to a partial-cascade one once `done` writes have already landed.
fn escalate(done: usize, what: &str, e: impl Into<ForumError>) -> ForumError {
    let e = e.into();
    if done == 0 || matches!(e, ForumError::PartialCascadeFailure(_)) {
        return e;
    }
    error!(completed_writes = done, error = %e, "{what} interrupted");
    ForumError::PartialCascadeFailure(format!("{what} after {done} writes: {e}"))
}

fn summarize(posts: Vec<Post>, arena: &CommentArena, communities: &[Community], order: PostOrder) -> Vec<PostSummary> {
    let mut out: Vec<PostSummary> = posts
        .into_iter()
        .map(|post| {
            let last_activity = arena
                .most_recent_descendant(&post)
                .map(|c| c.created_at)
                .unwrap_or(post.created_at);
            PostSummary {
                community_id: communities.iter().find(|c| c.post_ids.contains(&post.id)).map(|c| c.id),
                comment_count: arena.count_descendants(&post),
                last_activity,
                post,
            }
        })
        .collect();
    match order {
        PostOrder::Newest => out.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at)),
        PostOrder::Oldest => out.sort_by(|a, b| a.post.created_at.cmp(&b.post.created_at)),
        PostOrder::Active => out.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then_with(|| b.post.created_at.cmp(&a.post.created_at))
        }),
    }
    out
}

#[derive(Clone)]
pub struct ForumService {
    repo: Arc<dyn Repo>,
}

impl ForumService {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    pub async fn arena(&self) -> ForumResult<CommentArena> {
        Ok(CommentArena::new(self.repo.list_comments().await?))
    }

    // ---------------- users ----------------

    pub async fn register(&self, new: RegisterUser, bcrypt_cost: u32) -> ForumResult<User> {
        let email = new.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ForumError::Validation("email is not valid".into()));
        }
        check_text("display name", &new.display_name, None)?;
        check_text("password", &new.password, None)?;
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(ForumError::DuplicateName("email".into()));
        }
        if self.repo.find_user_by_display_name(&new.display_name).await?.is_some() {
            return Err(ForumError::DuplicateName("display name".into()));
        }
        let password_hash = auth::hash_password(&new.password, bcrypt_cost)
            .map_err(|e| ForumError::Store(e.to_string()))?;
        let user = self
            .repo
            .insert_user(User {
                id: 0,
                email,
                display_name: new.display_name,
                first_name: new.first_name,
                last_name: new.last_name,
                password_hash,
                reputation: INITIAL_REPUTATION,
                joined_at: Utc::now(),
                is_admin: false,
            })
            .await?;
        info!(user_id = user.id, display_name = %user.display_name, "registered user");
        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> ForumResult<User> {
        let email = req.email.trim().to_lowercase();
        let user = self.repo.find_user_by_email(&email).await?.ok_or(ForumError::Unauthorized)?;
        if !auth::verify_password(&req.password, &user.password_hash) {
            return Err(ForumError::Unauthorized);
        }
        Ok(user)
    }

    pub async fn user(&self, id: Id) -> ForumResult<User> {
        self.repo.get_user(id).await.map_err(ForumError::missing("user"))
    }

    /// Resolves token claims to the current user record.
    pub async fn caller(&self, claims: &Claims) -> ForumResult<Caller> {
        let id = claims.user_id().ok_or(ForumError::Unauthorized)?;
        match self.repo.get_user(id).await {
            Ok(u) => Ok(Caller::from(&u)),
            Err(RepoError::NotFound) => Err(ForumError::Unauthorized),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_users(&self, caller: &Caller) -> ForumResult<Vec<User>> {
        if !caller.is_admin {
            return Err(ForumError::Forbidden);
        }
        Ok(self.repo.list_users().await?)
    }

    /// Removes a user with the communities they created, their posts and their
    /// comments (each with everything beneath it).
    pub async fn delete_user(&self, caller: &Caller, id: Id) -> ForumResult<()> {
        if !caller.is_admin && caller.user_id != id {
            return Err(ForumError::Forbidden);
        }
        let user = self.user(id).await?;
        let name = user.display_name.as_str();
        let mut done = 0;

        for community in self.repo.list_communities().await? {
            if community.creators.iter().any(|c| c == name) {
                done += self
                    .purge_community(&community)
                    .await
                    .map_err(|e| escalate(done, "user deletion", e))?;
            }
        }
        let arena = self.arena().await.map_err(|e| escalate(done, "user deletion", e))?;
        for post in self.repo.list_posts().await.map_err(|e| escalate(done, "user deletion", e))? {
            if post.author_name == name {
                done += self
                    .purge_post(&arena, &post)
                    .await
                    .map_err(|e| escalate(done, "user deletion", e))?;
            }
        }
        let authored: Vec<Id> = self
            .arena()
            .await
            .map_err(|e| escalate(done, "user deletion", e))?
            .comments()
            .filter(|c| c.author_name == name)
            .map(|c| c.id)
            .collect();
        for comment_id in authored {
            // an earlier subtree may already have taken this one with it
            done += self
                .delete_subtree(comment_id)
                .await
                .map_err(|e| escalate(done, "user deletion", e))?;
        }
        self.repo
            .delete_user(id)
            .await
            .map_err(|e| escalate(done, "user deletion", ForumError::missing("user")(e)))?;
        info!(user_id = id, writes = done + 1, "deleted user and content");
        Ok(())
    }

    // ---------------- communities ----------------

    pub async fn list_communities(&self) -> ForumResult<Vec<Community>> {
        Ok(self.repo.list_communities().await?)
    }

    pub async fn community(&self, id: Id) -> ForumResult<Community> {
        self.repo.get_community(id).await.map_err(ForumError::missing("community"))
    }

    pub async fn community_of_post(&self, post_id: Id) -> ForumResult<Option<Community>> {
        Ok(self
            .repo
            .list_communities()
            .await?
            .into_iter()
            .find(|c| c.post_ids.contains(&post_id)))
    }

    pub async fn create_community(&self, caller: &Caller, new: NewCommunity) -> ForumResult<Community> {
        check_text("name", &new.name, Some(COMMUNITY_NAME_MAX))?;
        check_text("description", &new.description, Some(COMMUNITY_DESCRIPTION_MAX))?;
        let community = self
            .repo
            .insert_community(Community {
                id: 0,
                name: new.name.trim().to_string(),
                description: new.description,
                created_at: Utc::now(),
                members: vec![caller.display_name.clone()],
                creators: vec![caller.display_name.clone()],
                post_ids: vec![],
            })
            .await?;
        info!(community_id = community.id, name = %community.name, "created community");
        Ok(community)
    }

    fn ensure_creator(caller: &Caller, community: &Community) -> ForumResult<()> {
        if caller.is_admin || community.creators.contains(&caller.display_name) {
            Ok(())
        } else {
            Err(ForumError::Forbidden)
        }
    }

    pub async fn update_community(&self, caller: &Caller, id: Id, upd: UpdateCommunity) -> ForumResult<Community> {
        let mut community = self.community(id).await?;
        Self::ensure_creator(caller, &community)?;
        if let Some(name) = upd.name {
            check_text("name", &name, Some(COMMUNITY_NAME_MAX))?;
            community.name = name.trim().to_string();
        }
        if let Some(description) = upd.description {
            check_text("description", &description, Some(COMMUNITY_DESCRIPTION_MAX))?;
            community.description = description;
        }
        Ok(self.repo.put_community(community).await?)
    }

    pub async fn delete_community(&self, caller: &Caller, id: Id) -> ForumResult<()> {
        let community = self.community(id).await?;
        Self::ensure_creator(caller, &community)?;
        self.purge_community(&community).await?;
        Ok(())
    }

    pub async fn join_community(&self, caller: &Caller, id: Id) -> ForumResult<Community> {
        let mut community = self.community(id).await?;
        if community.members.contains(&caller.display_name) {
            return Err(ForumError::Validation("already a member of this community".into()));
        }
        community.members.push(caller.display_name.clone());
        Ok(self.repo.put_community(community).await?)
    }

    pub async fn leave_community(&self, caller: &Caller, id: Id) -> ForumResult<Community> {
        let mut community = self.community(id).await?;
        if !community.members.contains(&caller.display_name) {
            return Err(ForumError::Validation("not a member of this community".into()));
        }
        community.members.retain(|m| m != &caller.display_name);
        Ok(self.repo.put_community(community).await?)
    }

    /// Posts (with their comment trees) first, the community document last.
    async fn purge_community(&self, community: &Community) -> ForumResult<usize> {
        let arena = self.arena().await?;
        let mut done = 0;
        for post_id in &community.post_ids {
            let post = match self.repo.get_post(*post_id).await {
                Ok(p) => p,
                Err(RepoError::NotFound) => continue,
                Err(e) => return Err(escalate(done, "community deletion", e)),
            };
            done += self
                .purge_post(&arena, &post)
                .await
                .map_err(|e| escalate(done, "community deletion", e))?;
        }
        match self.repo.delete_community(community.id).await {
            Ok(()) | Err(RepoError::NotFound) => {}
            Err(e) => return Err(escalate(done, "community deletion", e)),
        }
        info!(community_id = community.id, writes = done + 1, "deleted community");
        Ok(done + 1)
    }

    // ---------------- link flairs ----------------

    pub async fn list_link_flairs(&self) -> ForumResult<Vec<LinkFlair>> {
        Ok(self.repo.list_link_flairs().await?)
    }

    pub async fn create_link_flair(&self, new: NewLinkFlair) -> ForumResult<LinkFlair> {
        check_text("flair", &new.content, Some(FLAIR_CONTENT_MAX))?;
        Ok(self.repo.insert_link_flair(LinkFlair { id: 0, content: new.content }).await?)
    }

    async fn ensure_flair(&self, flair_id: Option<Id>) -> ForumResult<()> {
        if let Some(id) = flair_id {
            self.repo.get_link_flair(id).await.map_err(ForumError::missing("link flair"))?;
        }
        Ok(())
    }

    // ---------------- posts ----------------

    pub async fn list_posts(&self, order: PostOrder) -> ForumResult<Vec<PostSummary>> {
        let posts = self.repo.list_posts().await?;
        let arena = self.arena().await?;
        let communities = self.repo.list_communities().await?;
        Ok(summarize(posts, &arena, &communities, order))
    }

    /// Fetches a post, counting a view unless `count_view` is false.
    pub async fn get_post(&self, id: Id, count_view: bool) -> ForumResult<PostSummary> {
        let mut post = self.repo.get_post(id).await.map_err(ForumError::missing("post"))?;
        if count_view {
            post.view_count += 1;
            post = self.repo.put_post(post).await.map_err(ForumError::missing("post"))?;
        }
        let arena = self.arena().await?;
        let communities = self.repo.list_communities().await?;
        Ok(summarize(vec![post], &arena, &communities, PostOrder::Newest).remove(0))
    }

    pub async fn create_post(&self, caller: &Caller, new: NewPost) -> ForumResult<Post> {
        check_text("title", &new.title, Some(POST_TITLE_MAX))?;
        check_text("content", &new.content, None)?;
        let mut community = self.community(new.community_id).await?;
        self.ensure_flair(new.flair_id).await?;
        let post = self
            .repo
            .insert_post(Post {
                id: 0,
                title: new.title,
                content: new.content,
                author_name: caller.display_name.clone(),
                created_at: Utc::now(),
                flair_id: new.flair_id,
                view_count: 0,
                child_comment_ids: vec![],
                vote_count: 0,
                voters: vec![],
            })
            .await?;
        community.post_ids.push(post.id);
        if !community.members.contains(&caller.display_name) {
            community.members.push(caller.display_name.clone());
        }
        self.repo
            .put_community(community)
            .await
            .map_err(|e| escalate(1, "post creation", e))?;
        info!(post_id = post.id, community_id = new.community_id, "created post");
        Ok(post)
    }

    pub async fn update_post(&self, caller: &Caller, id: Id, upd: UpdatePost) -> ForumResult<Post> {
        let mut post = self.repo.get_post(id).await.map_err(ForumError::missing("post"))?;
        ensure_author(caller, &post.author_name)?;
        if let Some(title) = upd.title {
            check_text("title", &title, Some(POST_TITLE_MAX))?;
            post.title = title;
        }
        if let Some(content) = upd.content {
            check_text("content", &content, None)?;
            post.content = content;
        }
        if upd.flair_id.is_some() {
            self.ensure_flair(upd.flair_id).await?;
            post.flair_id = upd.flair_id;
        }
        Ok(self.repo.put_post(post).await?)
    }

    pub async fn delete_post(&self, caller: &Caller, id: Id) -> ForumResult<()> {
        let post = self.repo.get_post(id).await.map_err(ForumError::missing("post"))?;
        ensure_author(caller, &post.author_name)?;
        let arena = self.arena().await?;
        self.purge_post(&arena, &post).await?;
        Ok(())
    }

    /// Its community's reference first, then the comment trees, then the post.
    async fn purge_post(&self, arena: &CommentArena, post: &Post) -> ForumResult<usize> {
        let mut done = 0;
        for mut community in self
            .repo
            .list_communities()
            .await?
            .into_iter()
            .filter(|c| c.post_ids.contains(&post.id))
        {
            community.post_ids.retain(|p| *p != post.id);
            self.repo
                .put_community(community)
                .await
                .map_err(|e| escalate(done, "post deletion", e))?;
            done += 1;
        }
        for comment_id in &post.child_comment_ids {
            let (_, writes) = self
                .cascade_comment(arena, *comment_id, Some(ParentRef::Post(post.id)))
                .await
                .map_err(|e| escalate(done, "post deletion", e))?;
            done += writes;
        }
        match self.repo.delete_post(post.id).await {
            Ok(()) => done += 1,
            Err(RepoError::NotFound) => {}
            Err(e) => return Err(escalate(done, "post deletion", e)),
        }
        debug!(post_id = post.id, writes = done, "purged post");
        Ok(done)
    }

    pub async fn post_thread(&self, post_id: Id) -> ForumResult<Vec<CommentNode>> {
        let post = self.repo.get_post(post_id).await.map_err(ForumError::missing("post"))?;
        Ok(self.arena().await?.thread(&post))
    }

    /// Most recently created comment anywhere under the post.
    pub async fn latest_post_activity(&self, post_id: Id) -> ForumResult<Option<Comment>> {
        let post = self.repo.get_post(post_id).await.map_err(ForumError::missing("post"))?;
        Ok(self.arena().await?.most_recent_descendant(&post).cloned())
    }

    // ---------------- comments ----------------

    pub async fn list_comments(&self) -> ForumResult<Vec<Comment>> {
        Ok(self.repo.list_comments().await?)
    }

    pub async fn comment(&self, id: Id) -> ForumResult<Comment> {
        self.repo.get_comment(id).await.map_err(ForumError::missing("comment"))
    }

    /// Stores the comment, then appends it to its post's or parent comment's reply list.
    pub async fn create_comment(&self, caller: &Caller, new: NewComment) -> ForumResult<Comment> {
        check_text("content", &new.content, Some(COMMENT_CONTENT_MAX))?;
        let parent = match (new.post_id, new.parent_comment_id) {
            (Some(p), None) => ParentRef::Post(p),
            (None, Some(c)) => ParentRef::Comment(c),
            _ => {
                return Err(ForumError::Validation(
                    "exactly one of post_id or parent_comment_id is required".into(),
                ))
            }
        };
        match parent {
            ParentRef::Post(id) => {
                self.repo.get_post(id).await.map_err(ForumError::missing("post"))?;
            }
            ParentRef::Comment(id) => {
                self.comment(id).await?;
            }
        }
        let comment = self
            .repo
            .insert_comment(Comment {
                id: 0,
                content: new.content,
                author_name: caller.display_name.clone(),
                created_at: Utc::now(),
                child_comment_ids: vec![],
                vote_count: 0,
                voters: vec![],
            })
            .await?;
        self.attach(parent, comment.id).await.map_err(|e| escalate(1, "comment creation", e))?;
        debug!(comment_id = comment.id, ?parent, "created comment");
        Ok(comment)
    }

    pub async fn update_comment(&self, caller: &Caller, id: Id, upd: UpdateComment) -> ForumResult<Comment> {
        let mut comment = self.comment(id).await?;
        ensure_author(caller, &comment.author_name)?;
        check_text("content", &upd.content, Some(COMMENT_CONTENT_MAX))?;
        comment.content = upd.content;
        Ok(self.repo.put_comment(comment).await?)
    }

    pub async fn delete_comment(&self, caller: &Caller, id: Id) -> ForumResult<usize> {
        let comment = self.comment(id).await?;
        ensure_author(caller, &comment.author_name)?;
        self.delete_subtree(id).await
    }

    /// Detaches `comment_id` from its parent, then deletes it with every reply beneath
    /// it. Returns how many comments were removed; an absent id removes none.
    pub async fn delete_subtree(&self, comment_id: Id) -> ForumResult<usize> {
        let arena = self.arena().await?;
        let posts = self.repo.list_posts().await?;
        let parent = arena.parent_of(&posts, comment_id);
        let (deleted, _) = self.cascade_comment(&arena, comment_id, parent).await?;
        Ok(deleted)
    }

    /// Returns `(comments deleted, store writes made)`. Comments go in walk order,
    /// each before its replies, once `root` no longer hangs off `parent`.
    async fn cascade_comment(
        &self,
        arena: &CommentArena,
        root: Id,
        parent: Option<ParentRef>,
    ) -> ForumResult<(usize, usize)> {
        let doomed = arena.walk(&[root]);
        let mut writes = 0;
        match parent {
            Some(ParentRef::Comment(pid)) if doomed.order.contains(&pid) => {}
            Some(parent) => {
                self.detach(parent, root).await?;
                writes += 1;
            }
            None => {}
        }
        let mut deleted = 0;
        for id in &doomed.order {
            match self.repo.delete_comment(*id).await {
                Ok(()) => deleted += 1,
                Err(RepoError::NotFound) => {}
                Err(e) => return Err(escalate(writes + deleted, "comment deletion", e)),
            }
        }
        if deleted > 0 {
            metrics::counter!("phreddit_comments_deleted_total", deleted as u64);
            info!(comment_id = root, deleted, "deleted comment subtree");
        }
        Ok((deleted, writes + deleted))
    }

    async fn attach(&self, parent: ParentRef, child: Id) -> Result<(), RepoError> {
        match parent {
            ParentRef::Post(id) => {
                let mut post = self.repo.get_post(id).await?;
                post.child_comment_ids.push(child);
                self.repo.put_post(post).await?;
            }
            ParentRef::Comment(id) => {
                let mut comment = self.repo.get_comment(id).await?;
                comment.child_comment_ids.push(child);
                self.repo.put_comment(comment).await?;
            }
        }
        Ok(())
    }

    /// A parent that has since disappeared needs no detaching.
    async fn detach(&self, parent: ParentRef, child: Id) -> Result<(), RepoError> {
        let res = match parent {
            ParentRef::Post(id) => match self.repo.get_post(id).await {
                Ok(mut post) => {
                    post.child_comment_ids.retain(|c| *c != child);
                    self.repo.put_post(post).await.map(drop)
                }
                Err(e) => Err(e),
            },
            ParentRef::Comment(id) => match self.repo.get_comment(id).await {
                Ok(mut comment) => {
                    comment.child_comment_ids.retain(|c| *c != child);
                    self.repo.put_comment(comment).await.map(drop)
                }
                Err(e) => Err(e),
            },
        };
        match res {
            Err(RepoError::NotFound) => Ok(()),
            other => other,
        }
    }

    pub async fn owning_post(&self, comment_id: Id) -> ForumResult<Option<Post>> {
        let posts = self.repo.list_posts().await?;
        Ok(self.arena().await?.owning_post(&posts, comment_id).cloned())
    }

    pub async fn reply_count(&self, comment_id: Id) -> ForumResult<usize> {
        let arena = self.arena().await?;
        let comment = arena.get(comment_id).ok_or(ForumError::NotFound("comment"))?;
        Ok(arena.count_descendants(comment))
    }

    pub async fn comment_thread(&self, comment_id: Id) -> ForumResult<Vec<CommentNode>> {
        let arena = self.arena().await?;
        let comment = arena.get(comment_id).ok_or(ForumError::NotFound("comment"))?;
        Ok(arena.thread(comment))
    }

    // ---------------- votes ----------------

    /// Records `caller`'s vote and moves the author's reputation accordingly.
    pub async fn vote(&self, caller: &Caller, target: VoteTarget, direction: VoteDirection) -> ForumResult<VoteOutcome> {
        vote::ensure_eligible(caller.reputation)?;
        match target {
            VoteTarget::Post(id) => {
                let mut post = self.repo.get_post(id).await.map_err(ForumError::missing("post"))?;
                let author = self.author(&post.author_name).await?;
                let delta = vote::apply(&mut post, caller.user_id, direction)?;
                let post = self.repo.put_post(post).await?;
                self.settle_vote(caller, author, delta, post.vote_count, direction).await
            }
            VoteTarget::Comment(id) => {
                let mut comment = self.comment(id).await?;
                let author = self.author(&comment.author_name).await?;
                let delta = vote::apply(&mut comment, caller.user_id, direction)?;
                let comment = self.repo.put_comment(comment).await?;
                self.settle_vote(caller, author, delta, comment.vote_count, direction).await
            }
        }
    }

    async fn author(&self, display_name: &str) -> ForumResult<User> {
        self.repo
            .find_user_by_display_name(display_name)
            .await?
            .ok_or(ForumError::NotFound("author"))
    }

    async fn settle_vote(
        &self,
        caller: &Caller,
        mut author: User,
        delta: VoteDelta,
        vote_count: i64,
        direction: VoteDirection,
    ) -> ForumResult<VoteOutcome> {
        author.reputation += delta.reputation;
        let author = self
            .repo
            .put_user(author)
            .await
            .map_err(|e| escalate(1, "vote", e))?;
        let voter_reputation = if author.id == caller.user_id { author.reputation } else { caller.reputation };
        let label = match direction {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
            VoteDirection::None => "none",
        };
        metrics::increment_counter!("phreddit_votes_total", "direction" => label);
        debug!(voter = caller.user_id, author = author.id, ?delta, "applied vote");
        Ok(VoteOutcome {
            vote_count,
            author_reputation: author.reputation,
            voter_reputation,
            user_vote: direction,
        })
    }

    // ---------------- search ----------------

    /// Posts matching `text` in their own title/content or through any comment
    /// beneath them, each once.
    pub async fn search_posts(&self, text: &str) -> ForumResult<Vec<Post>> {
        let query = Query::parse(text);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let posts = self.repo.list_posts().await?;
        let arena = self.arena().await?;
        Ok(search::matching_posts(&query, &posts, &arena).into_iter().cloned().collect())
    }

    pub async fn search(&self, text: &str, order: PostOrder) -> ForumResult<Vec<PostSummary>> {
        let posts = self.search_posts(text).await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let arena = self.arena().await?;
        let communities = self.repo.list_communities().await?;
        Ok(summarize(posts, &arena, &communities, order))
    }
}
