use crate::models::{
    AuthResponse, Comment, CommentNode, Community, LinkFlair, LoginRequest, NewComment, NewCommunity,
    NewLinkFlair, NewPost, Post, PostOrder, PostSummary, PublicUser, RegisterUser, UpdateComment,
    UpdateCommunity, UpdatePost, VoteDirection, VoteOutcome, VoteRequest, Voter,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::register,
        crate::routes::login,
        crate::routes::list_users,
        crate::routes::get_user,
        crate::routes::delete_user,
        crate::routes::auth_me,
        crate::routes::list_communities,
        crate::routes::get_community,
        crate::routes::create_community,
        crate::routes::update_community,
        crate::routes::delete_community,
        crate::routes::list_posts,
        crate::routes::get_post,
        crate::routes::create_post,
        crate::routes::update_post,
        crate::routes::delete_post,
        crate::routes::post_comments,
        crate::routes::vote_post,
        crate::routes::get_comment,
        crate::routes::create_comment,
        crate::routes::delete_comment,
        crate::routes::comment_post,
        crate::routes::vote_comment,
        crate::routes::search,
    ),
    components(schemas(
        Community, NewCommunity, UpdateCommunity,
        Post, NewPost, UpdatePost, PostSummary, PostOrder,
        Comment, NewComment, UpdateComment, CommentNode,
        LinkFlair, NewLinkFlair,
        VoteDirection, Voter, VoteRequest, VoteOutcome,
        PublicUser, RegisterUser, LoginRequest, AuthResponse,
    )),
    tags(
        (name = "users", description = "Accounts and sessions"),
        (name = "communities", description = "Community operations"),
        (name = "posts", description = "Post operations"),
        (name = "comments", description = "Comment threads"),
        (name = "search", description = "Full-text post search"),
    )
)]
pub struct ApiDoc;
