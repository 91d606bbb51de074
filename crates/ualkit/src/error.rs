//! Unified error type for ualkit.

use ualkit_session::StoreError;
use ualkit_types::CodecError;

/// Top-level error that wraps the sub-crate errors.
///
/// Authenticator failures never show up here: the session manager turns
/// them into status updates. What's left is configuration problems, store
/// problems the caller asked to see, and lookups of authenticators that
/// aren't available.
#[derive(Debug, thiserror::Error)]
pub enum UalError {
    /// The configuration is unusable (no chains, empty app name, duplicate
    /// authenticator names, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A session-store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration bytes couldn't be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// No available authenticator has this name. At restore time this
    /// means the remembered wallet is gone and the user must log in again.
    #[error("authenticator {auth_type:?} is not available")]
    LookupFailure { auth_type: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("keychain locked".into());
        let ual_err: UalError = err.into();
        assert!(matches!(ual_err, UalError::Store(_)));
        assert!(ual_err.to_string().contains("keychain locked"));
    }

    #[test]
    fn test_lookup_failure_display_names_authenticator() {
        let err = UalError::LookupFailure {
            auth_type: "scatter".into(),
        };
        assert_eq!(err.to_string(), "authenticator \"scatter\" is not available");
    }
}
