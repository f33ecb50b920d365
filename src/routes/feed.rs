use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::db::{profiles, projects};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Flash, MaybeUser};
use crate::feed::{self, FeedEntry};
use crate::i18n::MessageKey;
use crate::notify::{Notice, Severity};
use crate::routes::auth::redirect_with_flash;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/feed.html")]
struct FeedTemplate {
    notice: Option<Notice>,
    signed_in: bool,
    entries: Vec<FeedEntry>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(feed_page))
        .route("/projects/{id}/like", post(like))
        .route("/projects/{id}/unlike", post(unlike))
        .route("/projects/{id}/collect", post(collect))
        .route("/projects/{id}/uncollect", post(uncollect))
}

/// GET /feed
async fn feed_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Flash(notice): Flash,
) -> AppResult<Response> {
    let viewer = maybe_user
        .0
        .as_ref()
        .and_then(|user| super::viewer_profile(&state, user));

    let feed = {
        let conn = state.db.get()?;
        feed::compose_feed(&conn, viewer.as_ref())?
    };

    let shown = notice.is_some();
    Ok(super::flash_page(
        shown,
        Html(FeedTemplate {
            notice,
            signed_in: viewer.is_some(),
            entries: feed.entries,
        }),
    ))
}

enum MembershipOp {
    Like,
    Unlike,
    Collect,
    Uncollect,
}

/// POST /projects/{id}/like
async fn like(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    toggle(&state, maybe_user, &project_id, MembershipOp::Like)
}

/// POST /projects/{id}/unlike
async fn unlike(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    toggle(&state, maybe_user, &project_id, MembershipOp::Unlike)
}

/// POST /projects/{id}/collect
async fn collect(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    toggle(&state, maybe_user, &project_id, MembershipOp::Collect)
}

/// POST /projects/{id}/uncollect
async fn uncollect(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    toggle(&state, maybe_user, &project_id, MembershipOp::Uncollect)
}

/// Signed-out visitors get the notice and no writes at all.
fn toggle(
    state: &AppState,
    maybe_user: MaybeUser,
    project_id: &str,
    op: MembershipOp,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(redirect_with_flash(
            "/feed",
            MessageKey::PleaseLogin,
            Severity::Warning,
        ));
    };

    let changed = {
        let conn = state.db.get()?;
        if !projects::project_exists(&conn, project_id)? {
            return Err(AppError::NotFound);
        }
        match op {
            MembershipOp::Like => profiles::add_favorite(&conn, &user.id, project_id)?,
            MembershipOp::Unlike => profiles::remove_favorite(&conn, &user.id, project_id)?,
            MembershipOp::Collect => profiles::add_collection(&conn, &user.id, project_id)?,
            MembershipOp::Uncollect => profiles::remove_collection(&conn, &user.id, project_id)?,
        }
    };

    // Watchers only hear about real changes, after the row is durable.
    if changed {
        super::publish_profile(state, &user.id)?;
    }

    Ok(Redirect::to("/feed").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::create_session;
    use crate::routes::testing::test_state;
    use crate::session::AuthEvent;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use rusqlite::params;
    use tower::ServiceExt;

    fn seed(state: &AppState) {
        let conn = state.db.get().unwrap();
        for uid in ["viewer", "artist"] {
            conn.execute(
                "INSERT INTO users (id, email, name) VALUES (?1, ?1 || '@example.com', ?1)",
                params![uid],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO projects (id, owner_id, title) VALUES ('p1', 'artist', 'Poster')",
            [],
        )
        .unwrap();
    }

    fn signed_in_token(state: &AppState, uid: &str) -> String {
        let token = create_session(&state.db, uid, 24).unwrap();
        state.auth_events.publish(&AuthEvent::SignedIn {
            token: token.clone(),
            uid: uid.to_string(),
        });
        token
    }

    fn post(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie.to_string());
        }
        builder.body(Body::empty()).unwrap()
    }

    fn favorite_count(state: &AppState) -> i64 {
        let conn = state.db.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM favorites", [], |r| r.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn anonymous_like_writes_nothing() {
        let state = test_state();
        seed(&state);

        let response = router()
            .with_state(state.clone())
            .oneshot(post("/projects/p1/like", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/feed");
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.contains("please_login.warning"));
        assert_eq!(favorite_count(&state), 0);
    }

    #[tokio::test]
    async fn like_is_idempotent_and_pushes_to_the_registry() {
        let state = test_state();
        seed(&state);
        let token = signed_in_token(&state, "viewer");
        let cookie = format!("vitrina_session={}", token);
        let app = router().with_state(state.clone());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post("/projects/p1/like", Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }

        assert_eq!(favorite_count(&state), 1);
        let snapshot = state.registry.snapshot(&token).unwrap();
        assert_eq!(
            snapshot.profile().unwrap().favorite_list,
            vec!["p1".to_string()]
        );
    }

    #[tokio::test]
    async fn unlike_removes_and_tolerates_absence() {
        let state = test_state();
        seed(&state);
        let token = signed_in_token(&state, "viewer");
        let cookie = format!("vitrina_session={}", token);
        let app = router().with_state(state.clone());

        app.clone()
            .oneshot(post("/projects/p1/like", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(favorite_count(&state), 1);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post("/projects/p1/unlike", Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }
        assert_eq!(favorite_count(&state), 0);
    }

    #[tokio::test]
    async fn liking_a_missing_project_is_not_found() {
        let state = test_state();
        seed(&state);
        let token = signed_in_token(&state, "viewer");
        let cookie = format!("vitrina_session={}", token);

        let response = router()
            .with_state(state)
            .oneshot(post("/projects/ghost/like", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn collect_mirrors_like_semantics() {
        let state = test_state();
        seed(&state);
        let token = signed_in_token(&state, "viewer");
        let cookie = format!("vitrina_session={}", token);
        let app = router().with_state(state.clone());

        app.clone()
            .oneshot(post("/projects/p1/collect", Some(&cookie)))
            .await
            .unwrap();
        let snapshot = state.registry.snapshot(&token).unwrap();
        assert_eq!(
            snapshot.profile().unwrap().collection,
            vec!["p1".to_string()]
        );

        app.oneshot(post("/projects/p1/uncollect", Some(&cookie)))
            .await
            .unwrap();
        let snapshot = state.registry.snapshot(&token).unwrap();
        assert!(snapshot.profile().unwrap().collection.is_empty());
    }

    #[tokio::test]
    async fn feed_page_renders_for_anonymous_viewers() {
        let state = test_state();
        seed(&state);

        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/feed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
