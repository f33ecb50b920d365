pub mod assets;
pub mod auth;
pub mod feed;
pub mod home;
pub mod profile;
pub mod project;
pub mod stream;

use askama::Template;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::db::models::UserProfile;
use crate::db::profiles;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::notify;
use crate::routes::home::Html;
use crate::state::AppState;

/// Every page and action route, merged. The binary layers tracing and
/// shared state on top.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .merge(assets::router())
        .merge(auth::router())
        .merge(feed::router())
        .merge(profile::router())
        .merge(project::router())
        .merge(stream::router())
}

/// Render a page, clearing the one-shot flash cookie when the page
/// consumed one.
pub(crate) fn flash_page<T: Template>(notice_shown: bool, page: Html<T>) -> Response {
    if notice_shown {
        (
            [(header::SET_COOKIE, notify::clear_flash_cookie())],
            page,
        )
            .into_response()
    } else {
        page.into_response()
    }
}

/// Live profile for the requesting session, restoring the registry
/// entry if the server restarted since sign-in.
pub(crate) fn viewer_profile(state: &AppState, user: &CurrentUser) -> Option<UserProfile> {
    state.registry.restore(&user.token, &user.id);
    state
        .registry
        .snapshot(&user.token)
        .and_then(|s| s.profile().cloned())
}

/// Reload a profile from the database and push it to every watcher.
/// Called after the owning rows have been committed.
pub(crate) fn publish_profile(state: &AppState, uid: &str) -> AppResult<()> {
    let fresh = {
        let conn = state.db.get()?;
        profiles::load_profile(&conn, uid)?
    };
    if let Some(profile) = fresh {
        state.profiles.publish(&profile);
    }
    Ok(())
}
