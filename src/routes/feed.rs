use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::content::Feed;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::feed::{assemble_feed, PostView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HomeQuery {
    pub category: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/my-posts", get(my_posts))
        .route("/liked-posts", get(liked_posts))
}

async fn list(state: &AppState, feed: Feed, viewer: MaybeUser) -> AppResult<Json<Vec<PostView>>> {
    let views = assemble_feed(
        state.content.as_ref(),
        state.aggregates.as_ref(),
        &feed,
        viewer.id(),
    )
    .await?;
    Ok(Json(views))
}

/// GET / with an optional `?category=` filter. An empty category is not a page.
async fn home(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<HomeQuery>,
) -> AppResult<Json<Vec<PostView>>> {
    let feed = match query.category {
        None => Feed::Home,
        Some(category) if category.is_empty() => return Err(AppError::NotFound),
        Some(category) => Feed::Category(category),
    };
    list(&state, feed, maybe_user).await
}

async fn my_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<PostView>>> {
    let feed = Feed::Author(user.id);
    list(&state, feed, MaybeUser(Some(user))).await
}

async fn liked_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<PostView>>> {
    let feed = Feed::Liked(user.id);
    list(&state, feed, MaybeUser(Some(user))).await
}
