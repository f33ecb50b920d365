use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::Mutex;

use crate::auth::oauth_state::OauthStateStore;
use crate::config::Config;
use crate::session::{AuthHub, ProfileHub, SessionRegistry};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub profiles: Arc<ProfileHub>,
    pub auth_events: Arc<AuthHub>,
    pub registry: Arc<SessionRegistry>,
    pub oauth_states: Arc<Mutex<OauthStateStore>>,
    pub http: reqwest::Client,
}
