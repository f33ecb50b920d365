use askama::Template;
use axum::extract::{Form, Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::db::models::{Project, User, UserProfile};
use crate::db::{profiles, projects};
use crate::error::AppResult;
use crate::extractors::{Flash, MaybeUser};
use crate::i18n::MessageKey;
use crate::notify::{Notice, Severity};
use crate::routes::auth::redirect_with_flash;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/profile.html")]
struct ProfileTemplate {
    notice: Option<Notice>,
    profile: UserProfile,
    friends: Vec<User>,
    own_projects: Vec<Project>,
    favorites: Vec<Project>,
    collection: Vec<Project>,
}

#[derive(Deserialize)]
struct ProfileForm {
    name: String,
    introduction: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile_page).post(profile_update))
        .route("/profile/friends/{uid}", post(friend_add))
        .route("/profile/friends/{uid}/remove", post(friend_remove))
}

/// GET /profile
async fn profile_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Flash(notice): Flash,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(please_login());
    };
    let Some(profile) = super::viewer_profile(&state, &user) else {
        return Ok(please_login());
    };

    let (friends, own_projects, favorites, collection) = {
        let conn = state.db.get()?;
        (
            profiles::users_by_ids(&conn, &profile.friend_list)?,
            projects::projects_by_owner(&conn, &profile.uid)?,
            projects::projects_by_ids(&conn, &profile.favorite_list)?,
            projects::projects_by_ids(&conn, &profile.collection)?,
        )
    };

    let shown = notice.is_some();
    Ok(super::flash_page(
        shown,
        Html(ProfileTemplate {
            notice,
            profile,
            friends,
            own_projects,
            favorites,
            collection,
        }),
    ))
}

/// POST /profile
async fn profile_update(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(please_login());
    };

    let name = form.name.trim();
    if name.is_empty() {
        return Ok(redirect_with_flash(
            "/profile",
            MessageKey::ActionFailed,
            Severity::Warning,
        ));
    }

    {
        let conn = state.db.get()?;
        profiles::update_profile(&conn, &user.id, name, form.introduction.trim())?;
    }
    super::publish_profile(&state, &user.id)?;

    Ok(redirect_with_flash(
        "/profile",
        MessageKey::ProfileUpdated,
        Severity::Info,
    ))
}

/// POST /profile/friends/{uid}
async fn friend_add(
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(redirect_with_flash(
            "/feed",
            MessageKey::PleaseLogin,
            Severity::Warning,
        ));
    };

    // Self-friending and unknown ids are rejected before any write.
    let changed = {
        let conn = state.db.get()?;
        if friend_id == user.id || profiles::find_user(&conn, &friend_id)?.is_none() {
            return Ok(redirect_with_flash(
                "/feed",
                MessageKey::ActionFailed,
                Severity::Warning,
            ));
        }
        profiles::add_friend(&conn, &user.id, &friend_id)?
    };

    if changed {
        super::publish_profile(&state, &user.id)?;
    }
    Ok(redirect_with_flash(
        "/feed",
        MessageKey::FriendAdded,
        Severity::Info,
    ))
}

/// POST /profile/friends/{uid}/remove
async fn friend_remove(
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
    maybe_user: MaybeUser,
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
        profiles::remove_friend(&conn, &user.id, &friend_id)?
    };
    if changed {
        super::publish_profile(&state, &user.id)?;
    }
    Ok(redirect_with_flash(
        "/profile",
        MessageKey::FriendRemoved,
        Severity::Info,
    ))
}

fn please_login() -> Response {
    redirect_with_flash("/auth/login", MessageKey::PleaseLogin, Severity::Warning)
}
