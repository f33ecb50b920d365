use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::db::{profiles, projects};
use crate::error::AppResult;
use crate::extractors::{Flash, MaybeUser};
use crate::notify::Notice;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub notice: Option<Notice>,
    pub user_count: i64,
    pub project_count: i64,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Flash(notice): Flash,
) -> AppResult<Response> {
    // Signed-in visitors land on their feed
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/feed").into_response());
    }

    let conn = state.db.get()?;
    let user_count = profiles::user_count(&conn)?;
    let project_count = projects::project_count(&conn)?;

    let shown = notice.is_some();
    Ok(super::flash_page(
        shown,
        Html(HomeTemplate {
            notice,
            user_count,
            project_count,
        }),
    ))
}
