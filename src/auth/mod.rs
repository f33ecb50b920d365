pub mod credentials;
pub mod federated;
pub mod oauth_state;
pub mod session;

pub use federated::FederatedIdentity;
pub use oauth_state::OauthStateStore;
