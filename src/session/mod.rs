pub mod hub;
pub mod machine;
pub mod registry;

pub use hub::{AuthEvent, AuthHub, ProfileHub, ProfileWatch};
pub use machine::{SessionData, SessionError, SessionState};
pub use registry::{SessionEvents, SessionRegistry};
