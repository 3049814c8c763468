use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("{0} already in use")] Conflict(String),
    #[error("store failure: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// A record kept in one of the store's collections.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;
    fn id(&self) -> Id;
    fn assign_id(&mut self, id: Id);
}

macro_rules! document {
    ($ty:ty, $collection:literal) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;
            fn id(&self) -> Id { self.id }
            fn assign_id(&mut self, id: Id) { self.id = id; }
        }
    };
}

document!(Community, "communities");
document!(Post, "posts");
document!(Comment, "comments");
document!(LinkFlair, "linkflairs");
document!(User, "users");

// Inserts ignore the incoming `id` and return the document with its store-assigned id.
// `put_*` replaces the whole document.

#[async_trait]
pub trait CommunityRepo: Send + Sync {
    async fn list_communities(&self) -> RepoResult<Vec<Community>>;
    async fn get_community(&self, id: Id) -> RepoResult<Community>;
    async fn insert_community(&self, community: Community) -> RepoResult<Community>;
    async fn put_community(&self, community: Community) -> RepoResult<Community>;
    async fn delete_community(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn list_posts(&self) -> RepoResult<Vec<Post>>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    async fn insert_post(&self, post: Post) -> RepoResult<Post>;
    async fn put_post(&self, post: Post) -> RepoResult<Post>;
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn list_comments(&self) -> RepoResult<Vec<Comment>>;
    async fn get_comment(&self, id: Id) -> RepoResult<Comment>;
    async fn insert_comment(&self, comment: Comment) -> RepoResult<Comment>;
    async fn put_comment(&self, comment: Comment) -> RepoResult<Comment>;
    async fn delete_comment(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait LinkFlairRepo: Send + Sync {
    async fn list_link_flairs(&self) -> RepoResult<Vec<LinkFlair>>;
    async fn get_link_flair(&self, id: Id) -> RepoResult<LinkFlair>;
    async fn insert_link_flair(&self, flair: LinkFlair) -> RepoResult<LinkFlair>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_display_name(&self, name: &str) -> RepoResult<Option<User>>;
    async fn insert_user(&self, user: User) -> RepoResult<User>;
    async fn put_user(&self, user: User) -> RepoResult<User>;
    async fn delete_user(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo: CommunityRepo + PostRepo + CommentRepo + LinkFlairRepo + UserRepo {}

impl<T> Repo for T where T: CommunityRepo + PostRepo + CommentRepo + LinkFlairRepo + UserRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    const SNAPSHOT_FILE: &str = "state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        communities: BTreeMap<Id, Community>,
        posts: BTreeMap<Id, Post>,
        comments: BTreeMap<Id, Comment>,
        link_flairs: BTreeMap<Id, LinkFlair>,
        users: BTreeMap<Id, User>,
        next_id: Id,
    }

    trait Stored: Document {
        fn table(s: &State) -> &BTreeMap<Id, Self>;
        fn table_mut(s: &mut State) -> &mut BTreeMap<Id, Self>;
    }

    macro_rules! stored {
        ($ty:ty, $field:ident) => {
            impl Stored for $ty {
                fn table(s: &State) -> &BTreeMap<Id, Self> { &s.$field }
                fn table_mut(s: &mut State) -> &mut BTreeMap<Id, Self> { &mut s.$field }
            }
        };
    }

    stored!(Community, communities);
    stored!(Post, posts);
    stored!(Comment, comments);
    stored!(LinkFlair, link_flairs);
    stored!(User, users);

    /// Map-backed document store, optionally snapshotted to a JSON file after every write.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        /// Snapshot into `$PHREDDIT_DATA_DIR/state.json` (default `data/`).
        pub fn new() -> Self {
            let dir = std::env::var("PHREDDIT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data"));
            Self::with_data_dir(dir)
        }

        pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
            let path = dir.as_ref().join(SNAPSHOT_FILE);
            let state = Self::load_state_from(&path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(path)),
            }
        }

        /// Nothing is read from or written to disk.
        pub fn ephemeral() -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!(path = %path.display(), "loaded snapshot");
                        s
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "unparseable snapshot, starting empty");
                        State::default()
                    }
                },
                Err(e) => {
                    info!(path = %path.display(), error = %e, "no snapshot, starting empty");
                    State::default()
                }
            }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        /// Writes `s` to the snapshot file. Callers hold the write lock and undo their
        /// change when this fails, so memory never runs ahead of disk.
        fn persist(&self, s: &State) -> RepoResult<()> {
            let Some(path) = self.snapshot_path.as_deref() else { return Ok(()) };
            let bytes = serde_json::to_vec_pretty(s).map_err(|e| RepoError::Internal(e.to_string()))?;
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            std::fs::write(path, bytes).map_err(|e| {
                warn!(path = %path.display(), error = %e, "failed to write snapshot, change rolled back");
                RepoError::Internal(e.to_string())
            })
        }

        fn list<T: Stored>(&self) -> RepoResult<Vec<T>> {
            Ok(T::table(&*self.read()?).values().cloned().collect())
        }

        fn get<T: Stored>(&self, id: Id) -> RepoResult<T> {
            T::table(&*self.read()?).get(&id).cloned().ok_or(RepoError::NotFound)
        }

        fn find<T: Stored>(&self, pred: impl Fn(&T) -> bool) -> RepoResult<Option<T>> {
            Ok(T::table(&*self.read()?).values().find(|d| pred(d)).cloned())
        }

        fn insert<T: Stored>(&self, mut doc: T, unique: impl Fn(&State, &T) -> RepoResult<()>) -> RepoResult<T> {
            let mut s = self.write()?;
            unique(&s, &doc)?;
            s.next_id += 1;
            doc.assign_id(s.next_id);
            T::table_mut(&mut s).insert(doc.id(), doc.clone());
            if let Err(e) = self.persist(&s) {
                T::table_mut(&mut s).remove(&doc.id());
                return Err(e);
            }
            Ok(doc)
        }

        fn put<T: Stored>(&self, doc: T, unique: impl Fn(&State, &T) -> RepoResult<()>) -> RepoResult<T> {
            let mut s = self.write()?;
            if !T::table(&s).contains_key(&doc.id()) {
                return Err(RepoError::NotFound);
            }
            unique(&s, &doc)?;
            let previous = T::table_mut(&mut s).insert(doc.id(), doc.clone());
            if let Err(e) = self.persist(&s) {
                if let Some(previous) = previous {
                    T::table_mut(&mut s).insert(doc.id(), previous);
                }
                return Err(e);
            }
            Ok(doc)
        }

        fn delete<T: Stored>(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            let removed = T::table_mut(&mut s).remove(&id).ok_or(RepoError::NotFound)?;
            if let Err(e) = self.persist(&s) {
                T::table_mut(&mut s).insert(id, removed);
                return Err(e);
            }
            Ok(())
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    fn no_constraint<T>(_: &State, _: &T) -> RepoResult<()> { Ok(()) }

    fn unique_community_name(s: &State, c: &Community) -> RepoResult<()> {
        if s.communities.values().any(|o| o.name == c.name && o.id != c.id) {
            return Err(RepoError::Conflict("community name".into()));
        }
        Ok(())
    }

    fn unique_user(s: &State, u: &User) -> RepoResult<()> {
        if s.users.values().any(|o| o.email == u.email && o.id != u.id) {
            return Err(RepoError::Conflict("email".into()));
        }
        if s.users.values().any(|o| o.display_name == u.display_name && o.id != u.id) {
            return Err(RepoError::Conflict("display name".into()));
        }
        Ok(())
    }

    #[async_trait]
    impl CommunityRepo for InMemRepo {
        async fn list_communities(&self) -> RepoResult<Vec<Community>> { self.list() }
        async fn get_community(&self, id: Id) -> RepoResult<Community> { self.get(id) }
        async fn insert_community(&self, mut community: Community) -> RepoResult<Community> {
            // fresh inserts must not collide with an existing id during the uniqueness check
            community.id = 0;
            self.insert(community, unique_community_name)
        }
        async fn put_community(&self, community: Community) -> RepoResult<Community> {
            self.put(community, unique_community_name)
        }
        async fn delete_community(&self, id: Id) -> RepoResult<()> { self.delete::<Community>(id) }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn list_posts(&self) -> RepoResult<Vec<Post>> { self.list() }
        async fn get_post(&self, id: Id) -> RepoResult<Post> { self.get(id) }
        async fn insert_post(&self, post: Post) -> RepoResult<Post> { self.insert(post, no_constraint) }
        async fn put_post(&self, post: Post) -> RepoResult<Post> { self.put(post, no_constraint) }
        async fn delete_post(&self, id: Id) -> RepoResult<()> { self.delete::<Post>(id) }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn list_comments(&self) -> RepoResult<Vec<Comment>> { self.list() }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> { self.get(id) }
        async fn insert_comment(&self, comment: Comment) -> RepoResult<Comment> { self.insert(comment, no_constraint) }
        async fn put_comment(&self, comment: Comment) -> RepoResult<Comment> { self.put(comment, no_constraint) }
        async fn delete_comment(&self, id: Id) -> RepoResult<()> { self.delete::<Comment>(id) }
    }

    #[async_trait]
    impl LinkFlairRepo for InMemRepo {
        async fn list_link_flairs(&self) -> RepoResult<Vec<LinkFlair>> { self.list() }
        async fn get_link_flair(&self, id: Id) -> RepoResult<LinkFlair> { self.get(id) }
        async fn insert_link_flair(&self, flair: LinkFlair) -> RepoResult<LinkFlair> { self.insert(flair, no_constraint) }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn list_users(&self) -> RepoResult<Vec<User>> { self.list() }
        async fn get_user(&self, id: Id) -> RepoResult<User> { self.get(id) }
        async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
            self.find(|u: &User| u.email == email)
        }
        async fn find_user_by_display_name(&self, name: &str) -> RepoResult<Option<User>> {
            self.find(|u: &User| u.display_name == name)
        }
        async fn insert_user(&self, mut user: User) -> RepoResult<User> {
            user.id = 0;
            self.insert(user, unique_user)
        }
        async fn put_user(&self, user: User) -> RepoResult<User> { self.put(user, unique_user) }
        async fn delete_user(&self, id: Id) -> RepoResult<()> { self.delete::<User>(id) }
    }
}

// Postgres implementation (feature = "postgres-store"): every collection lives in one
// `documents` table as JSONB, see migrations/0001_documents.sql.
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::types::Json;
    use sqlx::{Pool, Postgres};

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    fn internal(e: sqlx::Error) -> RepoError {
        RepoError::Internal(e.to_string())
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> anyhow::Result<()> {
            sqlx::migrate!("./migrations").run(&self.pool).await?;
            Ok(())
        }

        async fn list<T: Document>(&self) -> RepoResult<Vec<T>> {
            let rows: Vec<(Json<T>,)> =
                sqlx::query_as("SELECT body FROM documents WHERE collection = $1 ORDER BY id")
                    .bind(T::COLLECTION)
                    .fetch_all(&self.pool).await.map_err(internal)?;
            Ok(rows.into_iter().map(|(Json(d),)| d).collect())
        }

        async fn get<T: Document>(&self, id: Id) -> RepoResult<T> {
            let row: Option<(Json<T>,)> =
                sqlx::query_as("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                    .bind(T::COLLECTION).bind(id)
                    .fetch_optional(&self.pool).await.map_err(internal)?;
            row.map(|(Json(d),)| d).ok_or(RepoError::NotFound)
        }

        async fn find_by_field<T: Document>(&self, field: &str, value: &str) -> RepoResult<Option<T>> {
            let row: Option<(Json<T>,)> = sqlx::query_as(
                "SELECT body FROM documents WHERE collection = $1 AND body ->> $2 = $3 ORDER BY id LIMIT 1",
            )
            .bind(T::COLLECTION).bind(field).bind(value)
            .fetch_optional(&self.pool).await.map_err(internal)?;
            Ok(row.map(|(Json(d),)| d))
        }

        async fn ensure_unique(&self, collection: &str, field: &str, value: &str, except: Id) -> RepoResult<()> {
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = $1 AND body ->> $2 = $3 AND id <> $4)",
            )
            .bind(collection).bind(field).bind(value).bind(except)
            .fetch_one(&self.pool).await.map_err(internal)?;
            if taken {
                let what = if collection == Community::COLLECTION {
                    format!("community {field}")
                } else {
                    field.replace('_', " ")
                };
                return Err(RepoError::Conflict(what));
            }
            Ok(())
        }

        async fn insert<T: Document>(&self, mut doc: T) -> RepoResult<T> {
            let id: Id = sqlx::query_scalar("SELECT nextval('document_ids')")
                .fetch_one(&self.pool).await.map_err(internal)?;
            doc.assign_id(id);
            sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
                .bind(T::COLLECTION).bind(id).bind(Json(&doc))
                .execute(&self.pool).await.map_err(internal)?;
            Ok(doc)
        }

        async fn put<T: Document>(&self, doc: T) -> RepoResult<T> {
            let res = sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
                .bind(T::COLLECTION).bind(doc.id()).bind(Json(&doc))
                .execute(&self.pool).await.map_err(internal)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(doc)
        }

        async fn delete<T: Document>(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                .bind(T::COLLECTION).bind(id)
                .execute(&self.pool).await.map_err(internal)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CommunityRepo for PgRepo {
        async fn list_communities(&self) -> RepoResult<Vec<Community>> { self.list().await }
        async fn get_community(&self, id: Id) -> RepoResult<Community> { self.get(id).await }
        async fn insert_community(&self, community: Community) -> RepoResult<Community> {
            self.ensure_unique(Community::COLLECTION, "name", &community.name, 0).await?;
            self.insert(community).await
        }
        async fn put_community(&self, community: Community) -> RepoResult<Community> {
            self.ensure_unique(Community::COLLECTION, "name", &community.name, community.id).await?;
            self.put(community).await
        }
        async fn delete_community(&self, id: Id) -> RepoResult<()> { self.delete::<Community>(id).await }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn list_posts(&self) -> RepoResult<Vec<Post>> { self.list().await }
        async fn get_post(&self, id: Id) -> RepoResult<Post> { self.get(id).await }
        async fn insert_post(&self, post: Post) -> RepoResult<Post> { self.insert(post).await }
        async fn put_post(&self, post: Post) -> RepoResult<Post> { self.put(post).await }
        async fn delete_post(&self, id: Id) -> RepoResult<()> { self.delete::<Post>(id).await }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn list_comments(&self) -> RepoResult<Vec<Comment>> { self.list().await }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> { self.get(id).await }
        async fn insert_comment(&self, comment: Comment) -> RepoResult<Comment> { self.insert(comment).await }
        async fn put_comment(&self, comment: Comment) -> RepoResult<Comment> { self.put(comment).await }
        async fn delete_comment(&self, id: Id) -> RepoResult<()> { self.delete::<Comment>(id).await }
    }

    #[async_trait]
    impl LinkFlairRepo for PgRepo {
        async fn list_link_flairs(&self) -> RepoResult<Vec<LinkFlair>> { self.list().await }
        async fn get_link_flair(&self, id: Id) -> RepoResult<LinkFlair> { self.get(id).await }
        async fn insert_link_flair(&self, flair: LinkFlair) -> RepoResult<LinkFlair> { self.insert(flair).await }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn list_users(&self) -> RepoResult<Vec<User>> { self.list().await }
        async fn get_user(&self, id: Id) -> RepoResult<User> { self.get(id).await }
        async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
            self.find_by_field::<User>("email", email).await
        }
        async fn find_user_by_display_name(&self, name: &str) -> RepoResult<Option<User>> {
            self.find_by_field::<User>("display_name", name).await
        }
        async fn insert_user(&self, user: User) -> RepoResult<User> {
            self.ensure_unique(User::COLLECTION, "email", &user.email, 0).await?;
            self.ensure_unique(User::COLLECTION, "display_name", &user.display_name, 0).await?;
            self.insert(user).await
        }
        async fn put_user(&self, user: User) -> RepoResult<User> {
            self.ensure_unique(User::COLLECTION, "email", &user.email, user.id).await?;
            self.ensure_unique(User::COLLECTION, "display_name", &user.display_name, user.id).await?;
            self.put(user).await
        }
        async fn delete_user(&self, id: Id) -> RepoResult<()> { self.delete::<User>(id).await }
    }
}
