//! # ualkit
//!
//! Wallet authenticator session manager.
//!
//! An app configures a list of wallet [`Authenticator`]s; ualkit works out
//! which ones can run here, waits for them to finish loading, logs in,
//! remembers the session across restarts, and publishes one consistent
//! [`Status`] the UI re-renders from.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ualkit::prelude::*;
//!
//! let manager = SessionManager::builder(UalConfig::from_json(CONFIG)?)
//!     .authenticator(Arc::new(MyWallet::new()))
//!     .store(Arc::new(FileSessionStore::open("session.json").await?))
//!     .build()?;
//!
//! manager.subscribe(|status| render(status));
//! manager.start().await;
//! ```
//!
//! ## Layers
//!
//! ```text
//! ualkit           ← SessionManager, registry, status broadcaster, config
//!   ualkit-poll    ← fixed-period readiness polling
//!   ualkit-session ← Authenticator/User traits, session store
//!   ualkit-types   ← chains, errors, codec
//! ```

mod config;
mod error;
mod manager;
mod registry;
mod status;

pub use config::UalConfig;
pub use error::UalError;
pub use manager::{SessionManager, SessionManagerBuilder};
pub use registry::{AuthenticatorRegistry, Resolution};
pub use status::{Status, StatusBroadcaster, StatusPatch, Subscriber, SubscriptionId, messages};

pub use ualkit_poll::{CancellationToken, PollConfig, PollOutcome, ReadinessPoller};
pub use ualkit_session::{
    Authenticator, FileSessionStore, MemorySessionStore, PersistedSession, SessionStore,
    StoreError, User,
};
pub use ualkit_types::{
    AuthenticatorError, Chain, ChainId, ErrorKind, RpcEndpoint, SessionPhase,
};

/// The types most apps need.
pub mod prelude {
    pub use crate::{
        Authenticator, AuthenticatorError, Chain, ChainId, ErrorKind, FileSessionStore,
        MemorySessionStore, RpcEndpoint, SessionManager, SessionPhase, Status, UalConfig,
        UalError, User,
    };
}
