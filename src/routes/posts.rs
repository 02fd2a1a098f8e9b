use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};

use crate::content::images::encode_image;
use crate::db::models::{CommentId, NewComment, NewPost, PostId};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::feed::{post_page, PostPage};
use crate::reactions::{Target, Vote, VoteState};
use crate::state::AppState;

// --- Forms ---

#[derive(Deserialize)]
pub struct CommentForm {
    pub content: String,
}

#[derive(Deserialize)]
pub struct ReactForm {
    pub react: String,
}

// --- Responses ---

#[derive(Serialize)]
pub struct Created<T> {
    pub id: T,
}

#[derive(Serialize)]
pub struct PostReaction {
    pub post_id: PostId,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
    pub vote: VoteState,
}

#[derive(Serialize)]
pub struct CommentReaction {
    pub post_id: PostId,
    pub comment_id: CommentId,
    pub like_count: i64,
    pub dislike_count: i64,
    pub vote: VoteState,
}

// --- Router ---

/// `max_upload_bytes` bounds the whole multipart body of a new post.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            post(create_post).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/posts/{id}", get(show_post))
        .route("/posts/{id}/comments", post(create_comment))
        .route("/posts/{id}/react", post(react_to_post))
        .route("/comments/{id}/react", post(react_to_comment))
}

// --- Handlers ---

/// POST /posts: multipart with title, content, repeated category and image fields.
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut title = None;
    let mut content = None;
    let mut categories = Vec::new();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => title = Some(field.text().await?),
            Some("content") => content = Some(field.text().await?),
            Some("category") => categories.push(field.text().await?),
            Some("image") => {
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    images.push(encode_image(&bytes, state.config.content.max_image_bytes)?);
                }
            }
            _ => {}
        }
    }

    let (Some(title), Some(content)) = (title, content) else {
        return Err(AppError::BadRequest("title and content are required".into()));
    };

    let id = state
        .content
        .create_post(NewPost {
            author_id: user.id,
            title,
            content,
            categories,
            images,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id })).into_response())
}

async fn show_post(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<PostId>,
) -> AppResult<Json<PostPage>> {
    let page = post_page(
        state.content.as_ref(),
        state.aggregates.as_ref(),
        id,
        maybe_user.id(),
    )
    .await?;
    Ok(Json(page))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<PostId>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let id = state
        .content
        .create_comment(NewComment {
            author_id: user.id,
            post_id,
            content: form.content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id })).into_response())
}

async fn react_to_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<PostId>,
    Form(form): Form<ReactForm>,
) -> AppResult<Json<PostReaction>> {
    let vote: Vote = form.react.parse()?;
    let outcome = state
        .ledger
        .toggle(user.id, Target::Post(post_id), vote)
        .await?;
    let tally = state
        .aggregates
        .post_tally(outcome.post_id, Some(user.id))
        .await?;

    Ok(Json(PostReaction {
        post_id: outcome.post_id,
        like_count: tally.like_count,
        dislike_count: tally.dislike_count,
        comment_count: tally.comment_count,
        vote: tally.vote,
    }))
}

async fn react_to_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<CommentId>,
    Form(form): Form<ReactForm>,
) -> AppResult<Json<CommentReaction>> {
    let vote: Vote = form.react.parse()?;
    let outcome = state
        .ledger
        .toggle(user.id, Target::Comment(comment_id), vote)
        .await?;
    let tally = state
        .aggregates
        .comment_tally(comment_id, Some(user.id))
        .await?;

    Ok(Json(CommentReaction {
        post_id: outcome.post_id,
        comment_id,
        like_count: tally.like_count,
        dislike_count: tally.dislike_count,
        vote: tally.vote,
    }))
}
