use askama::Template;
use axum::extract::{Form, Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{Page, Project, User};
use crate::db::{profiles, projects};
use crate::error::{AppError, AppResult};
use crate::extractors::{Flash, MaybeUser};
use crate::i18n::MessageKey;
use crate::notify::{Notice, Severity};
use crate::render::{self, PageView};
use crate::routes::auth::redirect_with_flash;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/project.html")]
struct ProjectTemplate {
    notice: Option<Notice>,
    project: Project,
    author: User,
    pages: Vec<PageView>,
    liked: bool,
    collected: bool,
    signed_in: bool,
}

#[derive(Template)]
#[template(path = "pages/project_new.html")]
struct ProjectNewTemplate {
    notice: Option<Notice>,
}

#[derive(Deserialize)]
struct ProjectForm {
    title: String,
    #[serde(default)]
    main_url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    photo_urls: String,
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lng: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", post(project_create))
        .route("/projects/new", get(project_new_page))
        .route("/projects/{id}", get(project_page))
}

/// GET /projects/{id}
async fn project_page(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    maybe_user: MaybeUser,
    Flash(notice): Flash,
) -> AppResult<Response> {
    let (project, author) = {
        let conn = state.db.get()?;
        let project = projects::find_project(&conn, &project_id)?.ok_or(AppError::NotFound)?;
        let author = profiles::find_user(&conn, &project.owner_id)?.ok_or_else(|| {
            AppError::Internal(format!("Project {} has no owner row", project.id))
        })?;
        (project, author)
    };

    let pages = render::page_views(&projects::parse_pages(&project.pages_json)?);
    let viewer = maybe_user
        .0
        .as_ref()
        .and_then(|user| super::viewer_profile(&state, user));
    let (liked, collected) = viewer
        .as_ref()
        .map(|p| (p.is_favorite(&project.id), p.is_collected(&project.id)))
        .unwrap_or((false, false));

    let shown = notice.is_some();
    Ok(super::flash_page(
        shown,
        Html(ProjectTemplate {
            notice,
            project,
            author,
            pages,
            liked,
            collected,
            signed_in: viewer.is_some(),
        }),
    ))
}

/// GET /projects/new
async fn project_new_page(maybe_user: MaybeUser, Flash(notice): Flash) -> Response {
    if maybe_user.0.is_none() {
        return redirect_with_flash("/auth/login", MessageKey::PleaseLogin, Severity::Warning);
    }
    let shown = notice.is_some();
    super::flash_page(shown, Html(ProjectNewTemplate { notice }))
}

/// POST /projects
async fn project_create(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Form(form): Form<ProjectForm>,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(redirect_with_flash(
            "/auth/login",
            MessageKey::PleaseLogin,
            Severity::Warning,
        ));
    };

    let title = form.title.trim();
    if title.is_empty() {
        return Ok(redirect_with_flash(
            "/projects/new",
            MessageKey::ActionFailed,
            Severity::Warning,
        ));
    }

    let paragraphs = lines_of(&form.description);
    let photos = lines_of(&form.photo_urls);
    let pages = compose_pages(&paragraphs, &photos, parse_location(&form.lat, &form.lng));

    // The feed card needs a cover image; fall back to the first photo.
    let main_url = match form.main_url.trim() {
        "" => photos
            .first()
            .cloned()
            .unwrap_or_else(|| render::PLACEHOLDER_PHOTO.to_string()),
        url => url.to_string(),
    };

    let project_id = Uuid::now_v7().to_string();
    {
        let conn = state.db.get()?;
        projects::insert_project(&conn, &project_id, &user.id, title, &main_url, &pages)?;
    }
    state.registry.refresh_projects(&user.token)?;
    tracing::info!(owner = %user.id, project = %project_id, "Project published");

    Ok(redirect_with_flash(
        &format!("/projects/{}", project_id),
        MessageKey::ProjectCreated,
        Severity::Info,
    ))
}

fn lines_of(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lay the submitted content out as a page sequence: a two-photo split
/// leads when there are photos, overflow text and photos follow as
/// their own sections, and an optional map location closes the page.
fn compose_pages(paragraphs: &[String], photos: &[String], location: Option<(f64, f64)>) -> Vec<Page> {
    let mut pages = Vec::new();

    if photos.is_empty() {
        if !paragraphs.is_empty() {
            pages.push(Page::Text {
                content: paragraphs.to_vec(),
            });
        }
    } else {
        pages.push(Page::Split {
            content: paragraphs.first().cloned().into_iter().collect(),
            urls: photos.iter().take(2).cloned().collect(),
        });
        if paragraphs.len() > 1 {
            pages.push(Page::Text {
                content: paragraphs[1..].to_vec(),
            });
        }
        if photos.len() > 2 {
            pages.push(Page::Gallery {
                urls: photos[2..].to_vec(),
            });
        }
    }

    if let Some((lat, lng)) = location {
        pages.push(Page::Location { lat, lng });
    }

    pages
}

fn parse_location(lat: &str, lng: &str) -> Option<(f64, f64)> {
    match (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
        (Ok(lat), Ok(lng)) => Some((lat, lng)),
        _ => None,
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

    fn seed_artist(state: &AppState) {
        let conn = state.db.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, email, name) VALUES ('artist', 'artist@example.com', 'Artist')",
            [],
        )
        .unwrap();
    }

    fn signed_in_cookie(state: &AppState, uid: &str) -> (String, String) {
        let token = create_session(&state.db, uid, 24).unwrap();
        state.auth_events.publish(&AuthEvent::SignedIn {
            token: token.clone(),
            uid: uid.to_string(),
        });
        let cookie = format!("vitrina_session={}", token);
        (token, cookie)
    }

    fn form_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie.to_string());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn photos_lead_with_a_split_and_overflow_into_a_gallery() {
        let paragraphs = vec!["Intro".to_string(), "More".to_string()];
        let photos: Vec<String> = (1..=4).map(|i| format!("https://img.test/{}.jpg", i)).collect();

        let pages = compose_pages(&paragraphs, &photos, None);
        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages[0],
            Page::Split {
                content: vec!["Intro".to_string()],
                urls: vec![
                    "https://img.test/1.jpg".to_string(),
                    "https://img.test/2.jpg".to_string()
                ],
            }
        );
        assert_eq!(
            pages[1],
            Page::Text {
                content: vec!["More".to_string()]
            }
        );
        assert_eq!(
            pages[2],
            Page::Gallery {
                urls: vec![
                    "https://img.test/3.jpg".to_string(),
                    "https://img.test/4.jpg".to_string()
                ]
            }
        );
    }

    #[test]
    fn text_only_submissions_make_a_single_text_page() {
        let paragraphs = vec!["One".to_string(), "Two".to_string()];
        let pages = compose_pages(&paragraphs, &[], None);
        assert_eq!(
            pages,
            vec![Page::Text {
                content: vec!["One".to_string(), "Two".to_string()]
            }]
        );
    }

    #[test]
    fn location_closes_the_sequence() {
        let pages = compose_pages(&[], &[], Some((25.03, 121.56)));
        assert_eq!(pages, vec![Page::Location { lat: 25.03, lng: 121.56 }]);
        assert_eq!(parse_location("25.03", "121.56"), Some((25.03, 121.56)));
        assert_eq!(parse_location("", "121.56"), None);
        assert_eq!(parse_location("north", "east"), None);
    }

    #[tokio::test]
    async fn create_then_view_round_trips() {
        let state = test_state();
        seed_artist(&state);
        let (token, cookie) = signed_in_cookie(&state, "artist");
        let app = router().with_state(state.clone());

        let body = "title=Harbor+Series&main_url=https%3A%2F%2Fimg.test%2Fmain.jpg\
                    &description=Shot+at+dawn.%0ASecond+note.\
                    &photo_urls=https%3A%2F%2Fimg.test%2Fa.jpg%0Ahttps%3A%2F%2Fimg.test%2Fb.jpg";
        let response = app
            .clone()
            .oneshot(form_post("/projects", Some(&cookie), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(location.starts_with("/projects/"));

        let page = app
            .oneshot(
                Request::builder()
                    .uri(location.as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(page.status(), StatusCode::OK);

        // The new project list is pushed into the live session.
        let snapshot = state.registry.snapshot(&token).unwrap();
        let projects = snapshot.projects();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].title, "Harbor Series");
    }

    #[tokio::test]
    async fn blank_title_is_rejected_without_a_row() {
        let state = test_state();
        seed_artist(&state);
        let (_, cookie) = signed_in_cookie(&state, "artist");

        let response = router()
            .with_state(state.clone())
            .oneshot(form_post("/projects", Some(&cookie), "title=++&description=x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/projects/new"
        );
        let conn = state.db.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn anonymous_create_redirects_to_login() {
        let state = test_state();

        let response = router()
            .with_state(state.clone())
            .oneshot(form_post("/projects", None, "title=Nope"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login"
        );
    }

    #[tokio::test]
    async fn missing_cover_falls_back_to_the_first_photo() {
        let state = test_state();
        seed_artist(&state);
        let (_, cookie) = signed_in_cookie(&state, "artist");

        router()
            .with_state(state.clone())
            .oneshot(form_post(
                "/projects",
                Some(&cookie),
                "title=Sketches&photo_urls=https%3A%2F%2Fimg.test%2Ffirst.jpg",
            ))
            .await
            .unwrap();

        let conn = state.db.get().unwrap();
        let main_url: String = conn
            .query_row("SELECT main_url FROM projects", [], |r| r.get(0))
            .unwrap();
        assert_eq!(main_url, "https://img.test/first.jpg");
    }

    #[tokio::test]
    async fn unknown_project_page_is_not_found() {
        let state = test_state();

        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/projects/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn project_page_marks_the_viewer_favorites() {
        let state = test_state();
        seed_artist(&state);
        let (_, cookie) = signed_in_cookie(&state, "artist");
        {
            let conn = state.db.get().unwrap();
            conn.execute(
                "INSERT INTO projects (id, owner_id, title) VALUES ('p1', 'artist', 'Poster')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO favorites (user_id, project_id) VALUES ('artist', 'p1')",
                [],
            )
            .unwrap();
        }

        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/projects/p1")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn new_project_form_requires_sign_in() {
        let state = test_state();

        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/projects/new")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login"
        );
    }
}
