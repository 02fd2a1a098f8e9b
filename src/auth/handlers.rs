use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::db::models::{NewUser, UserId};
use crate::error::AppResult;
use crate::extractors::cookie_value;
use crate::state::AppState;

// -- Request / response types --

#[derive(Deserialize)]
pub struct SignInForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
}

// -- Cookie helpers --

fn session_cookie(auth: &AuthConfig, token: &str) -> String {
    let max_age_secs = auth.session_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        auth.cookie_name, token, max_age_secs
    )
}

fn clear_session_cookie(auth: &AuthConfig) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        auth.cookie_name
    )
}

// -- Handlers --

/// POST /sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Form(form): Form<NewUser>,
) -> AppResult<Response> {
    let username = form.username.clone();
    let id = state.credentials.create_user(form).await?;

    Ok((StatusCode::CREATED, Json(UserResponse { id, username })).into_response())
}

/// POST /sign-in: verify credentials and replace any existing session.
pub async fn sign_in(
    State(state): State<AppState>,
    Form(form): Form<SignInForm>,
) -> AppResult<Response> {
    let user = state
        .credentials
        .verify(&form.username, &form.password)
        .await?;
    let session = state.sessions.create_session(user.id).await?;

    tracing::info!("User {} signed in", user.username);

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&state.config.auth, &session.token),
        )],
        Json(UserResponse {
            id: user.id,
            username: user.username,
        }),
    )
        .into_response())
}

/// POST /sign-out: drop the session (if any) and clear the cookie.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = cookie_value(&headers, &state.config.auth.cookie_name) {
        state.sessions.delete_session(token).await?;
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, clear_session_cookie(&state.config.auth)),
        ],
        "",
    )
        .into_response())
}
