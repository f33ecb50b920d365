// Session domain - pure state transitions, no side effects
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::{Project, UserProfile};

/// Profile fields plus the owner's project list, as held by a live
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub profile: UserProfile,
    pub projects: Vec<Project>,
}

/// Session state machine. `Authenticated` is the only state with a
/// non-empty uid. Display fields survive into `Unauthenticated` until
/// an explicit logout clears them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No identity established.
    Unauthenticated { stale: Option<SessionData> },

    /// A sign-in attempt is in flight.
    Loading { stale: Option<SessionData> },

    /// Identity established; fields track the live profile.
    Authenticated { data: SessionData },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    AttemptInFlight,
    MissingUid,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttemptInFlight => write!(f, "A sign-in attempt is already in flight"),
            Self::MissingUid => write!(f, "Profile is missing a uid"),
        }
    }
}

impl std::error::Error for SessionError {}

impl SessionState {
    pub fn new() -> Self {
        Self::Unauthenticated { stale: None }
    }

    /// Get state name for debugging/logging
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "Unauthenticated",
            Self::Loading { .. } => "Loading",
            Self::Authenticated { .. } => "Authenticated",
        }
    }

    /// Non-empty exactly when the session is authenticated.
    pub fn user_id(&self) -> &str {
        match self {
            Self::Authenticated { data } => &data.profile.uid,
            _ => "",
        }
    }

    pub fn is_login(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// The live profile, if authenticated.
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated { data } => Some(&data.profile),
            _ => None,
        }
    }

    /// Fields for display: the live profile, or whatever the last
    /// session left behind.
    pub fn display_profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated { data } => Some(&data.profile),
            Self::Unauthenticated { stale } | Self::Loading { stale } => {
                stale.as_ref().map(|d| &d.profile)
            }
        }
    }

    pub fn projects(&self) -> &[Project] {
        match self {
            Self::Authenticated { data } => &data.projects,
            _ => &[],
        }
    }

    /// Transition: begin a sign-in attempt (loading flag on).
    pub fn begin_attempt(self) -> Result<Self, SessionError> {
        match self {
            Self::Loading { .. } => Err(SessionError::AttemptInFlight),
            Self::Unauthenticated { stale } => Ok(Self::Loading { stale }),
            Self::Authenticated { data } => Ok(Self::Loading { stale: Some(data) }),
        }
    }

    /// Transition: the attempt failed. Loading drops back to its prior
    /// fields; any other state is left as-is, so the finally semantics
    /// only ever clear the loading flag.
    pub fn fail_attempt(self) -> Self {
        match self {
            Self::Loading { stale } => Self::Unauthenticated { stale },
            other => other,
        }
    }

    /// Transition: identity established. Uid, flags, and all profile
    /// fields change together, from any state.
    pub fn complete_sign_in(
        self,
        profile: UserProfile,
        projects: Vec<Project>,
    ) -> Result<Self, SessionError> {
        if profile.uid.is_empty() {
            return Err(SessionError::MissingUid);
        }
        Ok(Self::Authenticated {
            data: SessionData { profile, projects },
        })
    }

    /// Re-apply fields from a pushed profile update. Returns the next
    /// state and whether the update was applied; a snapshot for any
    /// other uid is discarded so a stale push cannot overwrite a newer
    /// session.
    pub fn apply_profile_update(self, profile: UserProfile) -> (Self, bool) {
        match self {
            Self::Authenticated { data } if data.profile.uid == profile.uid => (
                Self::Authenticated {
                    data: SessionData {
                        profile,
                        projects: data.projects,
                    },
                },
                true,
            ),
            other => (other, false),
        }
    }

    /// Replace the cached project list. No-op unless authenticated.
    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        match self {
            Self::Authenticated { data } => Self::Authenticated {
                data: SessionData {
                    profile: data.profile,
                    projects,
                },
            },
            other => other,
        }
    }

    /// Transition: auth state dropped without an explicit logout. The
    /// uid is gone but display fields stay around.
    pub fn mark_unauthenticated(self) -> Self {
        match self {
            Self::Authenticated { data } => Self::Unauthenticated { stale: Some(data) },
            Self::Loading { stale } => Self::Unauthenticated { stale },
            done @ Self::Unauthenticated { .. } => done,
        }
    }

    /// Transition: explicit logout resets every field.
    pub fn logout(self) -> Self {
        Self::Unauthenticated { stale: None }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(uid: &str) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            name: format!("User {}", uid),
            email: format!("{}@example.com", uid),
            avatar_url: "https://img.test/a.png".to_string(),
            introduction: String::new(),
            friend_list: vec![],
            favorite_list: vec![],
            collection: vec![],
        }
    }

    #[test]
    fn initial_state_is_anonymous() {
        let state = SessionState::new();
        assert_eq!(state.state_name(), "Unauthenticated");
        assert_eq!(state.user_id(), "");
        assert!(!state.is_login());
        assert!(!state.is_loading());
        assert!(state.display_profile().is_none());
    }

    #[test]
    fn begin_and_fail_reset_loading() {
        let state = SessionState::new().begin_attempt().unwrap();
        assert!(state.is_loading());
        assert!(!state.is_login());

        let state = state.fail_attempt();
        assert_eq!(state.state_name(), "Unauthenticated");
        assert!(!state.is_loading());
    }

    #[test]
    fn begin_while_loading_is_rejected() {
        let state = SessionState::new().begin_attempt().unwrap();
        let result = state.begin_attempt();
        assert_eq!(result, Err(SessionError::AttemptInFlight));
    }

    #[test]
    fn complete_sign_in_sets_everything_at_once() {
        let state = SessionState::new().begin_attempt().unwrap();
        let state = state.complete_sign_in(profile("u1"), vec![]).unwrap();

        assert!(state.is_login());
        assert!(!state.is_loading());
        assert_eq!(state.user_id(), "u1");
        assert_eq!(state.profile().unwrap().name, "User u1");
    }

    #[test]
    fn uid_empty_iff_not_logged_in() {
        let state = SessionState::new();
        assert_eq!(state.user_id().is_empty(), !state.is_login());

        let state = state.complete_sign_in(profile("u1"), vec![]).unwrap();
        assert_eq!(state.user_id().is_empty(), !state.is_login());

        let state = state.mark_unauthenticated();
        assert_eq!(state.user_id().is_empty(), !state.is_login());
    }

    #[test]
    fn complete_sign_in_requires_uid() {
        let result = SessionState::new().complete_sign_in(profile(""), vec![]);
        assert_eq!(result, Err(SessionError::MissingUid));
    }

    #[test]
    fn matching_update_is_applied() {
        let state = SessionState::new()
            .complete_sign_in(profile("u1"), vec![])
            .unwrap();

        let mut updated = profile("u1");
        updated.favorite_list.push("p9".to_string());
        let (state, applied) = state.apply_profile_update(updated);

        assert!(applied);
        assert_eq!(state.profile().unwrap().favorite_list, vec!["p9".to_string()]);
    }

    #[test]
    fn update_for_other_uid_is_discarded() {
        let state = SessionState::new()
            .complete_sign_in(profile("u1"), vec![])
            .unwrap();

        let (state, applied) = state.apply_profile_update(profile("u2"));

        assert!(!applied);
        assert_eq!(state.user_id(), "u1");
    }

    #[test]
    fn update_while_anonymous_is_discarded() {
        let (state, applied) = SessionState::new().apply_profile_update(profile("u1"));
        assert!(!applied);
        assert!(!state.is_login());
    }

    #[test]
    fn auth_drop_keeps_display_fields() {
        let state = SessionState::new()
            .complete_sign_in(profile("u1"), vec![])
            .unwrap()
            .mark_unauthenticated();

        assert!(!state.is_login());
        assert_eq!(state.user_id(), "");
        assert_eq!(state.display_profile().unwrap().name, "User u1");
    }

    #[test]
    fn logout_clears_display_fields() {
        let state = SessionState::new()
            .complete_sign_in(profile("u1"), vec![])
            .unwrap()
            .logout();

        assert!(!state.is_login());
        assert!(state.display_profile().is_none());
    }

    #[test]
    fn failed_relogin_keeps_current_session() {
        let state = SessionState::new()
            .complete_sign_in(profile("u1"), vec![])
            .unwrap();

        // Authenticated users can start another attempt; failing it
        // falls back to signed-out with the old fields kept stale.
        let state = state.begin_attempt().unwrap().fail_attempt();
        assert!(!state.is_login());
        assert_eq!(state.display_profile().unwrap().uid, "u1");
    }

    #[test]
    fn state_serializes_with_tag() {
        let state = SessionState::new()
            .complete_sign_in(profile("u1"), vec![])
            .unwrap();

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"state\":\"authenticated\""));

        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
