//! Shared types for ualkit.
//!
//! This crate defines the vocabulary every other layer speaks:
//!
//! - **Chains** ([`Chain`], [`ChainId`], [`RpcEndpoint`]): which
//!   blockchains the app supports and how to reach them.
//! - **Phases** ([`SessionPhase`]): where the session manager is in its
//!   login lifecycle.
//! - **Errors** ([`AuthenticatorError`], [`ErrorKind`], [`CodecError`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how persisted data and
//!   configuration are turned into bytes and back.
//!
//! # Architecture
//!
//! ```text
//! ualkit (manager, registry, status)
//!     ↕
//! ualkit-session (authenticator + store traits)   ualkit-poll (readiness)
//!     ↕
//! ualkit-types (this crate)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{AuthenticatorError, CodecError, ErrorKind};
pub use types::{Chain, ChainId, RpcEndpoint, SessionPhase};
