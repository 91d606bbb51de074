//! The persisted session: a typed view over three store keys.
//!
//! A "session" is the app's memory of the last successful login. It
//! records:
//! - WHICH authenticator was used (`LoggedInAuthType`)
//! - WHICH account was typed in, for wallets that need one (`AccountName`)
//! - WHEN the session stops being trusted (`InvalidateAt`, RFC 3339)
//!
//! Absence of `LoggedInAuthType` means "no session", whatever the other
//! two keys say.

use chrono::{DateTime, Duration, Utc};

use crate::{SessionStore, StoreError};

/// Store key for the name of the authenticator used for the last login.
pub const LOGGED_IN_AUTH_TYPE_KEY: &str = "LoggedInAuthType";

/// Store key for the account name supplied at login, if any.
pub const ACCOUNT_NAME_KEY: &str = "AccountName";

/// Store key for the RFC 3339 timestamp after which the session is stale.
pub const INVALIDATE_AT_KEY: &str = "InvalidateAt";

/// The three persisted session fields, read together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub auth_type: Option<String>,
    pub account_name: Option<String>,
    pub invalidate_at: Option<DateTime<Utc>>,
}

impl PersistedSession {
    /// Reads all three keys.
    ///
    /// An `InvalidateAt` value that doesn't parse is logged and treated as
    /// absent, so the session never expires on its own. A half-written
    /// session must still be usable until the user logs out.
    ///
    /// # Errors
    /// Propagates the store's read errors; callers decide whether a broken
    /// store means "no session".
    pub async fn load(store: &dyn SessionStore) -> Result<Self, StoreError> {
        let auth_type = store.get(LOGGED_IN_AUTH_TYPE_KEY).await?;
        let raw_invalidate_at = store.get(INVALIDATE_AT_KEY).await?;
        let account_name = store.get(ACCOUNT_NAME_KEY).await?;

        let invalidate_at = raw_invalidate_at.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!(
                        value = raw,
                        error = %e,
                        "ignoring malformed session invalidation timestamp"
                    );
                    None
                }
            }
        });

        Ok(Self {
            auth_type,
            account_name,
            invalidate_at,
        })
    }

    /// Returns `true` if an authenticator type was remembered.
    pub fn is_present(&self) -> bool {
        self.auth_type.is_some()
    }

    /// Returns `true` if the invalidation timestamp exists and is not in
    /// the future.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.invalidate_at.is_some_and(|at| at <= now)
    }

    /// Removes all three keys.
    ///
    /// Every key is attempted even if an earlier removal fails; the first
    /// error is returned.
    pub async fn purge(store: &dyn SessionStore) -> Result<(), StoreError> {
        let mut first_err = None;
        for key in [LOGGED_IN_AUTH_TYPE_KEY, ACCOUNT_NAME_KEY, INVALIDATE_AT_KEY] {
            if let Err(e) = store.remove(key).await {
                tracing::warn!(key, error = %e, "failed to remove session key");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Remembers which authenticator was used.
    pub async fn save_auth_type(store: &dyn SessionStore, name: &str) -> Result<(), StoreError> {
        store.set(LOGGED_IN_AUTH_TYPE_KEY, name).await
    }

    /// Remembers the account name typed at login.
    pub async fn save_account_name(
        store: &dyn SessionStore,
        account: &str,
    ) -> Result<(), StoreError> {
        store.set(ACCOUNT_NAME_KEY, account).await
    }

    /// Writes the invalidation timestamp, or removes it when `at` is `None`
    /// (a session that never expires).
    pub async fn save_invalidate_at(
        store: &dyn SessionStore,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        match at {
            Some(at) => store.set(INVALIDATE_AT_KEY, &at.to_rfc3339()).await,
            None => store.remove(INVALIDATE_AT_KEY).await,
        }
    }
}

/// Computes when a session created at `now` should be invalidated.
///
/// `0` seconds means never; values too large to represent saturate to
/// "never" as well.
pub fn invalidation_deadline(now: DateTime<Utc>, after_secs: u64) -> Option<DateTime<Utc>> {
    if after_secs == 0 {
        return None;
    }
    let secs = i64::try_from(after_secs).ok()?;
    Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d))
}
