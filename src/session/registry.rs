//! One live entry per HTTP session token. The registry listens to the
//! auth hub: sign-in loads the profile, applies it to the entry's
//! state machine, and installs exactly one profile watch for that uid;
//! sign-out tears the entry down. The watch for a previous uid always
//! ends before the new uid's watch starts.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::db::models::UserProfile;
use crate::db::{profiles, projects};
use crate::error::AppError;
use crate::session::hub::{AuthEvent, AuthHub, AuthWatch, ProfileHub, ProfileWatch};
use crate::session::machine::SessionState;
use crate::state::DbPool;

struct LiveSession {
    machine: SessionState,
    watch: Option<ProfileWatch>,
}

impl LiveSession {
    fn apply_update(&mut self, profile: UserProfile) -> bool {
        let machine = std::mem::take(&mut self.machine);
        let (machine, applied) = machine.apply_profile_update(profile);
        self.machine = machine;
        applied
    }
}

pub struct SessionRegistry {
    db: DbPool,
    profiles: Arc<ProfileHub>,
    entries: Mutex<HashMap<String, Arc<Mutex<LiveSession>>>>,
    auth_watch: Mutex<Option<AuthWatch>>,
}

/// Live pushes for one session, handed to the SSE surface. Dropping
/// the stream drops `watch`, which unsubscribes.
pub struct SessionEvents {
    pub initial: SessionState,
    pub receiver: mpsc::UnboundedReceiver<UserProfile>,
    pub watch: ProfileWatch,
}

impl SessionRegistry {
    pub fn new(db: DbPool, profiles: Arc<ProfileHub>) -> Arc<Self> {
        Arc::new(Self {
            db,
            profiles,
            entries: Mutex::new(HashMap::new()),
            auth_watch: Mutex::new(None),
        })
    }

    /// Wire the registry to auth-state changes. Called once at startup.
    pub fn initialize(self: &Arc<Self>, auth: &Arc<AuthHub>) {
        let weak = Arc::downgrade(self);
        let watch = auth.subscribe(move |event| {
            if let Some(registry) = weak.upgrade() {
                registry.handle_auth_event(event);
            }
        });
        *self.auth_watch.lock().unwrap() = Some(watch);
    }

    fn handle_auth_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::SignedIn { token, uid } => {
                if let Err(e) = self.activate(token, uid) {
                    tracing::error!("Session activation failed for {}: {}", uid, e);
                }
            }
            AuthEvent::SignedOut { token } => self.deactivate(token),
        }
    }

    /// Load the profile and projects for a freshly signed-in token,
    /// apply them atomically, then start the uid's watch.
    fn activate(&self, token: &str, uid: &str) -> Result<(), AppError> {
        self.clear_stale()?;

        let (profile, own_projects) = {
            let conn = self.db.get()?;
            let profile = profiles::load_profile(&conn, uid)?.ok_or(AppError::NotFound)?;
            let own = projects::projects_by_owner(&conn, uid)?;
            (profile, own)
        };

        let entry = self.entry(token);

        // End the previous uid's watch before anything else.
        let old_watch = {
            let mut live = entry.lock().unwrap();
            live.watch.take()
        };
        drop(old_watch);

        {
            let mut live = entry.lock().unwrap();
            let machine = std::mem::take(&mut live.machine);
            live.machine = machine
                .complete_sign_in(profile, own_projects)
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }

        let watch = {
            let weak = Arc::downgrade(&entry);
            self.profiles.subscribe(uid, move |profile| {
                if let Some(entry) = weak.upgrade() {
                    let mut live = entry.lock().unwrap();
                    if !live.apply_update(profile.clone()) {
                        tracing::debug!("Discarded stale profile push for {}", profile.uid);
                    }
                }
            })
        };
        entry.lock().unwrap().watch = Some(watch);

        tracing::info!("Session activated for {}", uid);
        Ok(())
    }

    fn deactivate(&self, token: &str) {
        let removed = self.entries.lock().unwrap().remove(token);
        if let Some(entry) = removed {
            let mut live = entry.lock().unwrap();
            live.watch = None;
            let machine = std::mem::take(&mut live.machine);
            live.machine = machine.logout();
        }
    }

    fn entry(&self, token: &str) -> Arc<Mutex<LiveSession>> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(token.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(LiveSession {
                    machine: SessionState::new(),
                    watch: None,
                }))
            })
            .clone()
    }

    /// Recreate the live entry for a valid session token. The registry
    /// starts empty after a restart; the first authenticated request
    /// brings its session back.
    pub fn restore(&self, token: &str, uid: &str) {
        if self.snapshot(token).is_some() {
            return;
        }
        if let Err(e) = self.activate(token, uid) {
            tracing::error!("Session restore failed for {}: {}", uid, e);
        }
    }

    /// Current state for a session token, if the registry holds one.
    pub fn snapshot(&self, token: &str) -> Option<SessionState> {
        let entry = self.entries.lock().unwrap().get(token).cloned()?;
        let live = entry.lock().unwrap();
        Some(live.machine.clone())
    }

    /// Uid of the active profile watch for a token.
    pub fn watched_uid(&self, token: &str) -> Option<String> {
        let entry = self.entries.lock().unwrap().get(token).cloned()?;
        let live = entry.lock().unwrap();
        live.watch.as_ref().map(|w| w.uid().to_string())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Reload the cached project list after a project write.
    pub fn refresh_projects(&self, token: &str) -> Result<(), AppError> {
        let entry = match self.entries.lock().unwrap().get(token).cloned() {
            Some(e) => e,
            None => return Ok(()),
        };
        let uid = entry.lock().unwrap().machine.user_id().to_string();
        if uid.is_empty() {
            return Ok(());
        }

        let own = {
            let conn = self.db.get()?;
            projects::projects_by_owner(&conn, &uid)?
        };

        let mut live = entry.lock().unwrap();
        let machine = std::mem::take(&mut live.machine);
        live.machine = machine.with_projects(own);
        Ok(())
    }

    /// Live profile pushes for a session's uid, for the SSE surface.
    /// None for anonymous sessions.
    pub fn watch_events(&self, token: &str) -> Option<SessionEvents> {
        let initial = self.snapshot(token)?;
        let uid = initial.user_id().to_string();
        if uid.is_empty() {
            return None;
        }

        let (tx, receiver) = mpsc::unbounded_channel();
        let watch = self.profiles.subscribe(&uid, move |profile| {
            let _ = tx.send(profile.clone());
        });

        Some(SessionEvents {
            initial,
            receiver,
            watch,
        })
    }

    /// Sessions whose row expired lose their uid but keep display
    /// fields; entries already signed out are aged out entirely.
    fn clear_stale(&self) -> Result<(), AppError> {
        let entries: Vec<(String, Arc<Mutex<LiveSession>>)> = {
            let map = self.entries.lock().unwrap();
            map.iter().map(|(t, e)| (t.clone(), e.clone())).collect()
        };
        if entries.is_empty() {
            return Ok(());
        }

        let alive: HashSet<String> = {
            let conn = self.db.get()?;
            let vars: Vec<String> = (1..=entries.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT token FROM sessions WHERE token IN ({}) AND expires_at > datetime('now')",
                vars.join(", ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let alive: HashSet<String> = stmt
                .query_map(
                    rusqlite::params_from_iter(entries.iter().map(|(t, _)| t.as_str())),
                    |row| row.get::<_, String>(0),
                )?
                .filter_map(|r| r.ok())
                .collect();
            alive
        };

        let mut aged_out = Vec::new();
        for (token, entry) in entries {
            if alive.contains(&token) {
                continue;
            }
            let mut live = entry.lock().unwrap();
            if live.machine.is_login() {
                live.watch = None;
                let machine = std::mem::take(&mut live.machine);
                live.machine = machine.mark_unauthenticated();
            } else {
                aged_out.push(token);
            }
        }

        if !aged_out.is_empty() {
            let mut map = self.entries.lock().unwrap();
            for token in aged_out {
                map.remove(&token);
            }
        }
        Ok(())
    }
}
