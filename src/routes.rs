use std::sync::Arc;
use actix_web::{web, HttpResponse};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::{token_for, Auth};
use crate::config::Settings;
use crate::error::ApiError;
use crate::models::*;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;
use crate::service::{ForumService, VoteTarget};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/users/register").route(web::post().to(register)))
            .service(web::resource("/users/login").route(web::post().to(login)))
            .service(web::resource("/users").route(web::get().to(list_users)))
            .service(
                web::resource("/users/{id}")
                    .route(web::get().to(get_user))
                    .route(web::delete().to(delete_user)),
            )
            .service(web::resource("/auth/me").route(web::get().to(auth_me)))
            .service(web::resource("/auth/refresh").route(web::post().to(refresh_token)))
            .service(
                web::resource("/communities")
                    .route(web::get().to(list_communities))
                    .route(web::post().to(create_community)),
            )
            .service(
                web::resource("/communities/{id}")
                    .route(web::get().to(get_community))
                    .route(web::put().to(update_community))
                    .route(web::delete().to(delete_community)),
            )
            .service(web::resource("/communities/{id}/join").route(web::post().to(join_community)))
            .service(web::resource("/communities/{id}/leave").route(web::post().to(leave_community)))
            .service(
                web::resource("/linkflairs")
                    .route(web::get().to(list_link_flairs))
                    .route(web::post().to(create_link_flair)),
            )
            .service(
                web::resource("/posts")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(get_post))
                    .route(web::put().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(web::resource("/posts/{id}/comments").route(web::get().to(post_comments)))
            .service(web::resource("/posts/{id}/community").route(web::get().to(post_community)))
            .service(web::resource("/posts/{id}/vote").route(web::post().to(vote_post)))
            .service(
                web::resource("/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(create_comment)),
            )
            .service(
                web::resource("/comments/{id}")
                    .route(web::get().to(get_comment))
                    .route(web::put().to(update_comment))
                    .route(web::delete().to(delete_comment)),
            )
            .service(web::resource("/comments/{id}/post").route(web::get().to(comment_post)))
            .service(web::resource("/comments/{id}/replies").route(web::get().to(comment_replies)))
            .service(web::resource("/comments/{id}/vote").route(web::post().to(vote_comment)))
            .service(web::resource("/search").route(web::get().to(search))),
    );
    cfg.route("/metrics", web::get().to(render_metrics));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub settings: Arc<Settings>,
    pub limiter: RateLimiterFacade,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, settings: Settings) -> Self {
        let limiter = RateLimiterFacade::new(
            crate::rate_limit::InMemoryRateLimiter::new(settings.rate_limit_enabled),
            settings.rate_limits.clone(),
        );
        Self { repo, settings: Arc::new(settings), limiter, metrics: None }
    }

    /// Service handle for one request.
    pub fn service(&self) -> ForumService {
        ForumService::new(self.repo.clone())
    }

    async fn caller(&self, auth: &Auth) -> Result<(ForumService, Caller), ApiError> {
        let svc = self.service();
        let caller = svc.caller(&auth.0).await?;
        Ok((svc, caller))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// `newest` (default), `oldest` or `active`
    pub sort: Option<PostOrder>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostQuery {
    /// Set to false to read without counting a view.
    pub increment: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub sort: Option<PostOrder>,
}

fn auth_response(user: User) -> Result<AuthResponse, ApiError> {
    let token = token_for(&user).map_err(|e| {
        tracing::error!(error = %e, "failed to issue token");
        ApiError::Internal
    })?;
    Ok(AuthResponse { token, user: user.into() })
}

// ---------------- users ----------------

#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or display name already in use")
    )
)]
pub async fn register(data: web::Data<AppState>, payload: web::Json<RegisterUser>) -> Result<HttpResponse, ApiError> {
    let user = data.service().register(payload.into_inner(), data.settings.bcrypt_cost).await?;
    Ok(HttpResponse::Created().json(auth_response(user)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let user = data.service().login(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(auth_response(user)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = [PublicUser]),
        (status = 403, description = "Admins only")
    )
)]
pub async fn list_users(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    let users: Vec<PublicUser> = svc.list_users(&caller).await?.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = PublicUser),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let user = data.service().user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PublicUser::from(user)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User and all their content deleted"),
        (status = 403, description = "Admins or the user themselves only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    svc.delete_user(&caller, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn auth_me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    let user = svc.user(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(PublicUser::from(user)))
}

pub async fn refresh_token(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    let user = svc.user(caller.user_id).await?;
    let resp = auth_response(user)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": resp.token })))
}

// ---------------- communities ----------------

#[utoipa::path(
    get,
    path = "/api/v1/communities",
    responses((status = 200, description = "List communities", body = [Community]))
)]
pub async fn list_communities(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.service().list_communities().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/communities/{id}",
    params(("id" = i64, Path, description = "Community id")),
    responses(
        (status = 200, description = "Community", body = Community),
        (status = 404, description = "Community not found")
    )
)]
pub async fn get_community(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.service().community(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/communities",
    request_body = NewCommunity,
    responses(
        (status = 201, description = "Community created", body = Community),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_community(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewCommunity>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    let community = svc.create_community(&caller, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(community))
}

#[utoipa::path(
    put,
    path = "/api/v1/communities/{id}",
    request_body = UpdateCommunity,
    params(("id" = i64, Path, description = "Community id")),
    responses(
        (status = 200, description = "Community updated", body = Community),
        (status = 403, description = "Creators or admins only"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn update_community(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateCommunity>,
) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    let community = svc.update_community(&caller, path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(community))
}

#[utoipa::path(
    delete,
    path = "/api/v1/communities/{id}",
    params(("id" = i64, Path, description = "Community id")),
    responses(
        (status = 204, description = "Community, its posts and their comments deleted"),
        (status = 403, description = "Creators or admins only")
    )
)]
pub async fn delete_community(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    svc.delete_community(&caller, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn join_community(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    Ok(HttpResponse::Ok().json(svc.join_community(&caller, path.into_inner()).await?))
}

pub async fn leave_community(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    Ok(HttpResponse::Ok().json(svc.leave_community(&caller, path.into_inner()).await?))
}

// ---------------- link flairs ----------------

pub async fn list_link_flairs(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.service().list_link_flairs().await?))
}

pub async fn create_link_flair(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewLinkFlair>) -> Result<HttpResponse, ApiError> {
    let (svc, _caller) = data.caller(&auth).await?;
    Ok(HttpResponse::Created().json(svc.create_link_flair(payload.into_inner()).await?))
}

// ---------------- posts ----------------

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(ListQuery),
    responses((status = 200, description = "Post summaries", body = [PostSummary]))
)]
pub async fn list_posts(data: web::Data<AppState>, query: web::Query<ListQuery>) -> Result<HttpResponse, ApiError> {
    let posts = data.service().list_posts(query.sort.unwrap_or_default()).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post id"), PostQuery),
    responses(
        (status = 200, description = "Post", body = PostSummary),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(data: web::Data<AppState>, path: web::Path<Id>, query: web::Query<PostQuery>) -> Result<HttpResponse, ApiError> {
    let post = data.service().get_post(path.into_inner(), query.increment.unwrap_or(true)).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 404, description = "Community or flair not found"),
        (status = 429, description = "Too many posts")
    )
)]
pub async fn create_post(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewPost>) -> Result<HttpResponse, ApiError> {
    if !data.limiter.allow_post(&auth.0.sub) { return Err(ApiError::TooManyRequests); }
    let (svc, caller) = data.caller(&auth).await?;
    let post = svc.create_post(&caller, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    request_body = UpdatePost,
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 403, description = "Author or admins only")
    )
)]
pub async fn update_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<UpdatePost>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    Ok(HttpResponse::Ok().json(svc.update_post(&caller, path.into_inner(), payload.into_inner()).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post and all its comments deleted"),
        (status = 403, description = "Author or admins only")
    )
)]
pub async fn delete_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    svc.delete_post(&caller, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comment thread, newest first at every level", body = [CommentNode]),
        (status = 404, description = "Post not found")
    )
)]
pub async fn post_comments(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.service().post_thread(path.into_inner()).await?))
}

pub async fn post_community(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    match data.service().community_of_post(path.into_inner()).await? {
        Some(c) => Ok(HttpResponse::Ok().json(c)),
        None => Err(ApiError::NotFound("community not found".into())),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/vote",
    request_body = VoteRequest,
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Vote recorded", body = VoteOutcome),
        (status = 400, description = "Already voted this way"),
        (status = 403, description = "Not enough reputation to vote")
    )
)]
pub async fn vote_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<VoteRequest>) -> Result<HttpResponse, ApiError> {
    cast_vote(auth, data, VoteTarget::Post(path.into_inner()), payload.direction).await
}

// ---------------- comments ----------------

pub async fn list_comments(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.service().list_comments().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn get_comment(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.service().comment(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments",
    request_body = NewComment,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Needs exactly one parent"),
        (status = 404, description = "Parent not found"),
        (status = 429, description = "Too many comments")
    )
)]
pub async fn create_comment(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewComment>) -> Result<HttpResponse, ApiError> {
    if !data.limiter.allow_comment(&auth.0.sub) { return Err(ApiError::TooManyRequests); }
    let (svc, caller) = data.caller(&auth).await?;
    let comment = svc.create_comment(&caller, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn update_comment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<UpdateComment>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    Ok(HttpResponse::Ok().json(svc.update_comment(&caller, path.into_inner(), payload.into_inner()).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment and all its replies deleted"),
        (status = 403, description = "Author or admins only"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let (svc, caller) = data.caller(&auth).await?;
    svc.delete_comment(&caller, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/{id}/post",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Post at the root of the comment's thread", body = Post),
        (status = 404, description = "Comment has no owning post")
    )
)]
pub async fn comment_post(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    match data.service().owning_post(path.into_inner()).await? {
        Some(post) => Ok(HttpResponse::Ok().json(post)),
        None => Err(ApiError::NotFound("post not found".into())),
    }
}

pub async fn comment_replies(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.service().comment_thread(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/{id}/vote",
    request_body = VoteRequest,
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Vote recorded", body = VoteOutcome),
        (status = 400, description = "Already voted this way"),
        (status = 403, description = "Not enough reputation to vote")
    )
)]
pub async fn vote_comment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<VoteRequest>) -> Result<HttpResponse, ApiError> {
    cast_vote(auth, data, VoteTarget::Comment(path.into_inner()), payload.direction).await
}

async fn cast_vote(auth: Auth, data: web::Data<AppState>, target: VoteTarget, direction: VoteDirection) -> Result<HttpResponse, ApiError> {
    if !data.limiter.allow_vote(&auth.0.sub) { return Err(ApiError::TooManyRequests); }
    let (svc, caller) = data.caller(&auth).await?;
    let outcome = svc.vote(&caller, target, direction).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

// ---------------- search ----------------

#[utoipa::path(
    get,
    path = "/api/v1/search",
    params(SearchQuery),
    responses((status = 200, description = "Posts matching in title, content or any comment", body = [PostSummary]))
)]
pub async fn search(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse, ApiError> {
    let q = query.q.as_deref().unwrap_or("");
    let posts = data.service().search(q, query.sort.unwrap_or_default()).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn render_metrics(data: web::Data<AppState>) -> HttpResponse {
    match &data.metrics {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::NotFound().finish(),
    }
}
