//! Error types for the session layer.

use ualkit_types::CodecError;

/// Errors raised by a [`SessionStore`](crate::SessionStore).
///
/// The session manager downgrades these to warnings where it can: a store
/// that can't be read means "no session", a store that can't be written
/// means "this login won't be remembered".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but couldn't be decoded.
    #[error("session store is corrupt: {0}")]
    Codec(#[from] CodecError),

    /// The store is temporarily unusable (custom backends: keychain
    /// locked, secure storage not yet unlocked, etc.).
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}
