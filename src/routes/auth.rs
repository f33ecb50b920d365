use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::{credentials, federated, session};
use crate::config::ProviderConfig;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{Flash, MaybeUser};
use crate::i18n::MessageKey;
use crate::notify::{flash_cookie, Notice, Severity};
use crate::routes::home::Html;
use crate::session::AuthEvent;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginTemplate {
    notice: Option<Notice>,
    google_enabled: bool,
    facebook_enabled: bool,
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
struct SignupTemplate {
    notice: Option<Notice>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login_submit))
        .route("/auth/signup", get(signup_page).post(signup_submit))
        .route("/auth/federated/{provider}", get(federated_start))
        .route(
            "/auth/federated/{provider}/callback",
            get(federated_callback),
        )
        .route("/auth/logout", post(logout))
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// 303 redirect carrying a one-shot notice.
pub(crate) fn redirect_with_flash(location: &str, key: MessageKey, severity: Severity) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, flash_cookie(key, severity)),
        ],
        "",
    )
        .into_response()
}

/// 303 to the feed that also establishes the session cookie.
fn signed_in_response(state: &AppState, token: &str, key: MessageKey) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, "/feed".to_string())],
        AppendHeaders([
            (
                header::SET_COOKIE,
                session_cookie(
                    &state.config.auth.cookie_name,
                    token,
                    state.config.auth.session_hours,
                ),
            ),
            (header::SET_COOKIE, flash_cookie(key, Severity::Info)),
        ]),
        "",
    )
        .into_response()
}

fn establish_session(state: &AppState, user: &User) -> AppResult<String> {
    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    state.auth_events.publish(&AuthEvent::SignedIn {
        token: token.clone(),
        uid: user.id.clone(),
    });
    Ok(token)
}

// -- Password handlers --

/// GET /auth/login
async fn login_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Flash(notice): Flash,
) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/feed").into_response());
    }

    let shown = notice.is_some();
    Ok(super::flash_page(
        shown,
        Html(LoginTemplate {
            notice,
            google_enabled: state.config.provider("google").is_some(),
            facebook_enabled: state.config.provider("facebook").is_some(),
        }),
    ))
}

/// POST /auth/login
async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = match credentials::sign_in(&state.db, &form.email, &form.password) {
        Ok(user) => user,
        Err(AppError::Unauthorized) => {
            return Ok(redirect_with_flash(
                "/auth/login",
                MessageKey::LoginFailed,
                Severity::Warning,
            ));
        }
        Err(e) => return Err(e),
    };

    let token = establish_session(&state, &user)?;
    Ok(signed_in_response(
        &state,
        &token,
        MessageKey::LoginSuccessfully,
    ))
}

/// GET /auth/signup
async fn signup_page(maybe_user: MaybeUser, Flash(notice): Flash) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/feed").into_response());
    }

    let shown = notice.is_some();
    Ok(super::flash_page(shown, Html(SignupTemplate { notice })))
}

/// POST /auth/signup
async fn signup_submit(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    let user = match credentials::sign_up(&state.db, &form.email, &form.password, &form.name) {
        Ok(user) => user,
        Err(AppError::BadRequest(reason)) => {
            tracing::debug!("Sign up rejected: {}", reason);
            return Ok(redirect_with_flash(
                "/auth/signup",
                MessageKey::SignUpFailed,
                Severity::Warning,
            ));
        }
        Err(e) => return Err(e),
    };

    let token = establish_session(&state, &user)?;
    Ok(signed_in_response(
        &state,
        &token,
        MessageKey::SignUpSuccessfully,
    ))
}

// -- Federated handlers --

/// GET /auth/federated/{provider}
async fn federated_start(
    State(state): State<AppState>,
    Path(provider_key): Path<String>,
) -> AppResult<Response> {
    let provider = state
        .config
        .provider(&provider_key)
        .ok_or(AppError::NotFound)?
        .clone();

    let redirect_uri = state.config.federated_redirect_uri(&provider_key);
    let nonce = { state.oauth_states.lock().await.issue(&provider_key) };
    let url = federated::authorize_url(&provider, &redirect_uri, &nonce)?;

    Ok(Redirect::to(&url).into_response())
}

/// GET /auth/federated/{provider}/callback
async fn federated_callback(
    State(state): State<AppState>,
    Path(provider_key): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Response> {
    let provider = state
        .config
        .provider(&provider_key)
        .ok_or(AppError::NotFound)?
        .clone();

    if let Some(err) = query.error {
        tracing::warn!("Provider {} reported: {}", provider_key, err);
        return Ok(login_failed());
    }

    let (code, nonce) = match (query.code, query.state) {
        (Some(code), Some(nonce)) => (code, nonce),
        _ => return Ok(login_failed()),
    };

    // The state parameter must match an outstanding flow for this provider.
    let started_for = { state.oauth_states.lock().await.consume(&nonce) };
    if started_for.as_deref() != Some(provider_key.as_str()) {
        tracing::warn!("OAuth state mismatch for provider {}", provider_key);
        return Ok(login_failed());
    }

    let redirect_uri = state.config.federated_redirect_uri(&provider_key);
    let user = match complete_federated(&state, &provider_key, &provider, &redirect_uri, &code).await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Federated sign-in via {} failed: {}", provider_key, e);
            return Ok(login_failed());
        }
    };

    let token = establish_session(&state, &user)?;
    Ok(signed_in_response(
        &state,
        &token,
        MessageKey::LoginSuccessfully,
    ))
}

async fn complete_federated(
    state: &AppState,
    provider_key: &str,
    provider: &ProviderConfig,
    redirect_uri: &str,
    code: &str,
) -> Result<User, AppError> {
    let access_token = federated::exchange_code(&state.http, provider, redirect_uri, code).await?;
    let userinfo = federated::fetch_userinfo(&state.http, provider, &access_token).await?;
    let identity = federated::extract_identity(provider_key, &userinfo)?;
    federated::find_or_create_user(&state.db, provider_key, &identity)
}

fn login_failed() -> Response {
    redirect_with_flash("/auth/login", MessageKey::LoginFailed, Severity::Warning)
}

// -- Logout --

/// POST /auth/logout
async fn logout(State(state): State<AppState>, maybe_user: MaybeUser) -> AppResult<Response> {
    if let Some(user) = maybe_user.0 {
        let _ = session::delete_session(&state.db, &user.token);
        state
            .auth_events
            .publish(&AuthEvent::SignedOut { token: user.token });
    }

    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, "/".to_string())],
        AppendHeaders([
            (
                header::SET_COOKIE,
                clear_session_cookie(&state.config.auth.cookie_name),
            ),
            (
                header::SET_COOKIE,
                flash_cookie(MessageKey::LogoutSuccessfully, Severity::Info),
            ),
        ]),
        "",
    )
        .into_response())
}
