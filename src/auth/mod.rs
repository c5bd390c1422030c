//! Authentication collaborator
//!
//! Session issuance and token validation happen outside this crate. The
//! gate only needs to ask "who is this token?" and where to send the user
//! to log in or out.

mod provider;

pub use provider::{AuthProvider, StaticAuthProvider, UserSession};
