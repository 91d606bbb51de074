//! Authenticator capabilities and session persistence for ualkit.
//!
//! This crate handles the two external seams of the session manager:
//!
//! 1. **Authenticators**: pluggable wallet integrations
//!    ([`Authenticator`], [`User`] traits). ualkit never implements a
//!    wallet itself; it drives whatever implementations the app supplies.
//! 2. **Persistence**: a tiny string key/value store ([`SessionStore`])
//!    and the typed view over its three session keys
//!    ([`PersistedSession`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Session manager (above)  ← restores, persists, and purges sessions
//!     ↕
//! Session layer (this crate)  ← authenticator + store abstractions
//!     ↕
//! Types layer (below)  ← ChainId, AuthenticatorError, Codec
//! ```

mod auth;
mod error;
mod session;
mod store;

pub use auth::{Authenticator, DEFAULT_INVALIDATE_AFTER_SECS, User};
pub use error::StoreError;
pub use session::{
    ACCOUNT_NAME_KEY, INVALIDATE_AT_KEY, LOGGED_IN_AUTH_TYPE_KEY, PersistedSession,
    invalidation_deadline,
};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
