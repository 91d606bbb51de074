//! Capability traits for wallet authenticators and the users they produce.
//!
//! ualkit doesn't implement any wallet itself; that's the job of the
//! integration libraries (Anchor, Keycat, Ledger, ...). Instead it defines
//! the [`Authenticator`] trait: the method set the session manager needs to
//! discover a wallet, wait for it to be ready, log in, and log out.
//!
//! # Why `async_trait`?
//!
//! The manager holds a heterogeneous list of wallets
//! (`Vec<Arc<dyn Authenticator>>`), so the trait must be object-safe.
//! Native `async fn` in traits isn't, yet; `#[async_trait]` boxes the
//! returned futures so `dyn Authenticator` works.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ualkit_types::{AuthenticatorError, ChainId};

/// How long a session is remembered when an authenticator doesn't say
/// otherwise: one day.
pub const DEFAULT_INVALIDATE_AFTER_SECS: u64 = 86_400;

/// An authenticated account produced by [`Authenticator::login`].
///
/// The manager treats users as opaque: it only ever asks for the account
/// name (to build the "Currently logged in as ..." message) and hands the
/// user object to the UI, which uses it to sign transactions.
#[async_trait]
pub trait User: Send + Sync + 'static {
    /// The on-chain account name.
    ///
    /// Async because some wallets resolve the name lazily (e.g. by asking
    /// the device which key was used).
    async fn account_name(&self) -> Result<String, AuthenticatorError>;

    /// The chain this account lives on.
    fn chain_id(&self) -> &ChainId;
}

/// A pluggable wallet integration.
///
/// # Trait bounds
///
/// - `Send + Sync` → authenticators are shared with background polling
///   tasks, which Tokio may run on any worker thread.
/// - `'static` → they live as long as the session manager.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use ualkit_session::{Authenticator, User};
/// use ualkit_types::{AuthenticatorError, ChainId};
///
/// struct Account(String, ChainId);
///
/// #[async_trait]
/// impl User for Account {
///     async fn account_name(&self) -> Result<String, AuthenticatorError> {
///         Ok(self.0.clone())
///     }
///     fn chain_id(&self) -> &ChainId {
///         &self.1
///     }
/// }
///
/// /// Logs in whichever account name it's given. Development only.
/// struct DevWallet;
///
/// #[async_trait]
/// impl Authenticator for DevWallet {
///     fn name(&self) -> &str {
///         "dev"
///     }
///     fn is_loading(&self) -> bool {
///         false
///     }
///     async fn login(
///         &self,
///         account_hint: Option<&str>,
///     ) -> Result<Vec<Arc<dyn User>>, AuthenticatorError> {
///         let name = account_hint.ok_or_else(|| {
///             AuthenticatorError::login("an account name is required", "dev")
///         })?;
///         Ok(vec![Arc::new(Account(name.to_string(), ChainId::new("dev")))])
///     }
///     async fn logout(&self) -> Result<(), AuthenticatorError> {
///         Ok(())
///     }
///     fn reset(&self) {}
/// }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Unique name among the configured authenticators. This is what gets
    /// persisted as the logged-in authenticator type.
    fn name(&self) -> &str;

    /// Starts any platform probing the wallet needs (deep-link checks,
    /// device discovery). Called once by the registry on every available
    /// authenticator. Readiness is reported through [`is_loading`](Self::is_loading).
    fn init(&self) {}

    /// Whether this wallet can work on the running platform at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether this wallet can log in without asking the user for anything.
    /// Only honored when exactly one available authenticator says so.
    fn should_auto_login(&self) -> bool {
        false
    }

    /// `true` while the wallet is still initializing. Polled, never pushed.
    fn is_loading(&self) -> bool;

    /// Whether login requires a confirmation on an external device (a
    /// hardware wallet approving a key request).
    fn requires_account_confirmation(&self) -> bool {
        false
    }

    /// Seconds a persisted session stays valid. `0` means it never expires.
    fn should_invalidate_after(&self) -> u64 {
        DEFAULT_INVALIDATE_AFTER_SECS
    }

    /// Logs in, optionally for a specific account.
    ///
    /// Returns every user the wallet authenticated; the last one is the
    /// most recent and becomes the active user.
    async fn login(
        &self,
        account_hint: Option<&str>,
    ) -> Result<Vec<Arc<dyn User>>, AuthenticatorError>;

    /// Logs out of the wallet. Failures are logged by the manager, never
    /// surfaced.
    async fn logout(&self) -> Result<(), AuthenticatorError>;

    /// Clears any error or in-progress state so the wallet can be tried
    /// again.
    fn reset(&self);
}

impl fmt::Debug for dyn Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for dyn User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("chain_id", self.chain_id())
            .finish_non_exhaustive()
    }
}
