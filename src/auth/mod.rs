//! Credential lifecycle: tokens, sessions, password resets, and the
//! identity gate that turns a client-held token into a trusted user.
//!
//! Only token hashes are persisted. Raw tokens leave this module inside
//! `IssuedSession` and `ResetTicket` and nowhere else.

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod password_reset;
pub mod session;
pub mod token;
pub mod users;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use identity::{authorize_owner, require_identity, DenyPolicy, Identity, IdentityGate};
pub use password_reset::{PasswordResetManager, ResetTicket};
pub use session::{IssuedSession, SessionManager};
pub use users::UserService;
