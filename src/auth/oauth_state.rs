use std::collections::HashMap;
use std::time::Instant;

const STATE_TTL_SECS: u64 = 300; // 5 minutes

/// A pending OAuth authorization round-trip
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub state: String,
    pub provider: String, // Provider key the flow started with
    pub expires_at: Instant,
}

/// Store for ephemeral OAuth state parameters
pub struct OauthStateStore {
    pub(crate) states: HashMap<String, PendingAuthorization>,
}

impl OauthStateStore {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Issue a new state parameter for a provider redirect
    pub fn issue(&mut self, provider: &str) -> String {
        self.clear_stale();

        let state = generate_secure_token();

        self.states.insert(
            state.clone(),
            PendingAuthorization {
                state: state.clone(),
                provider: provider.to_string(),
                expires_at: Instant::now() + std::time::Duration::from_secs(STATE_TTL_SECS),
            },
        );

        state
    }

    /// Validate and consume a state parameter (single-use).
    /// Returns the provider the flow was started for.
    pub fn consume(&mut self, state: &str) -> Option<String> {
        self.clear_stale();

        let pending = self.states.remove(state)?;

        if Instant::now() >= pending.expires_at {
            tracing::warn!("OAuth state {} expired", state);
            return None;
        }

        Some(pending.provider)
    }

    /// Remove expired states
    fn clear_stale(&mut self) {
        let now = Instant::now();
        self.states.retain(|_, pending| now < pending.expires_at);
    }
}

impl Default for OauthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a cryptographically secure random token
fn generate_secure_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const TOKEN_LEN: usize = 32;

    let mut rng = rand::thread_rng();
    let token: String = (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    token
}
