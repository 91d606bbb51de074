//! Error types shared across ualkit crates.
//!
//! Each crate defines its own error type. The two here are needed by more
//! than one layer: codec failures (session store, config loading) and
//! authenticator failures (raised by wallet integrations, surfaced by the
//! session manager in its status).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur while encoding or decoding with a [`Codec`](crate::Codec).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: a truncated session file, or a file written by a
    /// different tool.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

/// Which step of the authenticator protocol failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Login,
    Logout,
    Signing,
    Validation,
    Initialization,
    DataRequest,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "Login"),
            Self::Logout => write!(f, "Logout"),
            Self::Signing => write!(f, "Signing"),
            Self::Validation => write!(f, "Validation"),
            Self::Initialization => write!(f, "Initialization"),
            Self::DataRequest => write!(f, "DataRequest"),
        }
    }
}

/// An error raised by a wallet authenticator.
///
/// Authenticators are external integrations, so their failures are
/// described rather than typed: a [`kind`](Self::kind), a short
/// human-readable message (what the UI shows), the name of the
/// authenticator that produced it, and optionally the underlying cause
/// rendered as text.
///
/// `Clone` is required because the session manager stores the last
/// failure in its status, and status snapshots are cloned to every
/// subscriber.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthenticatorError {
    /// The protocol step that failed.
    pub kind: ErrorKind,
    /// Short message suitable for display.
    pub message: String,
    /// Name of the authenticator (or component) that raised the error.
    pub source_name: String,
    /// Underlying cause, if one was available.
    pub cause: Option<String>,
}

impl AuthenticatorError {
    /// Creates an error with no underlying cause.
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source_name: source_name.into(),
            cause: None,
        }
    }

    /// Shorthand for a [`ErrorKind::Login`] error.
    pub fn login(message: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::Login, message, source_name)
    }

    /// Shorthand for a [`ErrorKind::Logout`] error.
    pub fn logout(message: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::Logout, message, source_name)
    }

    /// Attaches the underlying cause.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}
