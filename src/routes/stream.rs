use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt as _;

use crate::db::models::UserProfile;
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::session::SessionEvents;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/session/events", get(session_events))
}

/// SSE endpoint for live session updates. Opens with one `session`
/// event holding the full snapshot, then emits a `profile` event for
/// every push to the watched profile. Closing the response drops the
/// subscription.
async fn session_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state.registry.restore(&user.token, &user.id);
    let SessionEvents {
        initial,
        receiver,
        watch,
    } = state
        .registry
        .watch_events(&user.token)
        .ok_or(AppError::Unauthorized)?;

    let opening = serde_json::to_string(&initial)?;
    let first = stream::once(async move { Ok(Event::default().event("session").data(opening)) });

    // The subscription lives inside the closure; disconnecting the
    // client drops it and unsubscribes.
    let updates = UnboundedReceiverStream::new(receiver).map(move |profile| {
        let _hold = &watch;
        Ok(profile_event(&profile))
    });

    Ok(Sse::new(first.chain(updates)).keep_alive(KeepAlive::default()))
}

fn profile_event(profile: &UserProfile) -> Event {
    match serde_json::to_string(profile) {
        Ok(json) => Event::default().event("profile").data(json),
        Err(e) => {
            tracing::error!("Profile event serialization failed: {}", e);
            Event::default().comment("serialization failed")
        }
    }
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

    fn seed_user(state: &AppState, uid: &str) {
        let conn = state.db.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, email, name) VALUES (?1, ?1 || '@example.com', ?1)",
            params![uid],
        )
        .unwrap();
    }

    async fn open_stream(state: AppState, cookie: Option<String>) -> axum::response::Response {
        let mut builder = Request::builder().uri("/session/events");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        router()
            .with_state(state)
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn anonymous_requests_are_unauthorized() {
        let state = test_state();
        let response = open_stream(state, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signed_in_requests_get_an_event_stream() {
        let state = test_state();
        seed_user(&state, "u1");
        let token = create_session(&state.db, "u1", 24).unwrap();
        state.auth_events.publish(&AuthEvent::SignedIn {
            token: token.clone(),
            uid: "u1".to_string(),
        });

        let response = open_stream(state, Some(format!("vitrina_session={}", token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap(),
            "text/event-stream"
        );
    }

    #[tokio::test]
    async fn stream_survives_a_registry_restart() {
        let state = test_state();
        seed_user(&state, "u1");
        let token = create_session(&state.db, "u1", 24).unwrap();

        // No SignedIn event was published, as after a server restart.
        let response = open_stream(state, Some(format!("vitrina_session={}", token))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn profile_events_serialize_the_membership_lists() {
        let profile = UserProfile {
            uid: "u1".to_string(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            avatar_url: String::new(),
            introduction: String::new(),
            friend_list: vec![],
            favorite_list: vec!["p1".to_string()],
            collection: vec![],
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"favorite_list\":[\"p1\"]"));
        let _ = profile_event(&profile);
    }
}
