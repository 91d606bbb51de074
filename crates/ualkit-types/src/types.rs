//! Core data types: chain descriptors and the session lifecycle phase.
//!
//! Chain descriptors are configuration: the app hands them to the
//! authenticator registry at construction time. The phase is runtime state
//! published in every status broadcast.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// The hex chain identifier of an EOSIO-family chain.
///
/// Newtype wrapper so a chain id can't be confused with an account name or
/// an authenticator name, all of which are plain strings underneath.
/// `#[serde(transparent)]` keeps it a bare string in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RpcEndpoint
// ---------------------------------------------------------------------------

/// One RPC node for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEndpoint {
    /// `http` or `https`.
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Optional path prefix (e.g. `/v1`). Absent for most public nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RpcEndpoint {
    /// Creates an endpoint without a path prefix.
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
            path: None,
        }
    }

    /// Sets the path prefix.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Renders the endpoint as a URL: `protocol://host:port[/path]`.
    ///
    /// A missing leading slash on the path is added.
    pub fn url(&self) -> String {
        let mut url = format!("{}://{}:{}", self.protocol, self.host, self.port);
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            if !path.starts_with('/') {
                url.push('/');
            }
            url.push_str(path);
        }
        url
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// A chain the app supports, with one or more RPC endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub chain_id: ChainId,
    pub rpc_endpoints: Vec<RpcEndpoint>,
}

impl Chain {
    pub fn new(chain_id: impl Into<String>, rpc_endpoints: Vec<RpcEndpoint>) -> Self {
        Self {
            chain_id: ChainId::new(chain_id),
            rpc_endpoints,
        }
    }

    /// The first configured endpoint, if any.
    pub fn primary_endpoint(&self) -> Option<&RpcEndpoint> {
        self.rpc_endpoints.first()
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the session manager is in its login lifecycle.
///
/// ```text
///   Idle ──start()──→ Restoring ──┬──→ AutoAuthenticating ──┐
///                                 ├──→ AwaitingInput ───────┼──→ Ready ──→ LoggedIn
///                                 └──→ Ready ───────────────┘               │
///                                                                        logout()
///   Idle ←──────────────────────────── LoggedOut ←─────────────────────────┘
/// ```
///
/// - **Restoring**: reading the persisted session and resolving
///   authenticators.
/// - **AutoAuthenticating**: waiting for a remembered (or auto-login)
///   authenticator to become ready, then logging in without prompting.
/// - **AwaitingInput**: nothing to restore; the user must pick an
///   authenticator.
/// - **Ready**: an authenticator is ready and a login call is in flight.
/// - **LoggedIn**: an active user is set.
/// - **LoggedOut**: status was reset; the authenticator's own logout is
///   still running. Returns to `Idle` once it finishes.
///
/// The modal flag is independent of the phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Restoring,
    AutoAuthenticating,
    AwaitingInput,
    Ready,
    LoggedIn,
    LoggedOut,
}

impl SessionPhase {
    /// Returns `true` if a user is logged in.
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn)
    }

    /// Returns `true` while a login is being attempted (automatically or
    /// in response to user input).
    pub fn is_authenticating(&self) -> bool {
        matches!(self, Self::AutoAuthenticating | Self::Ready)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Restoring => write!(f, "Restoring"),
            Self::AutoAuthenticating => write!(f, "AutoAuthenticating"),
            Self::AwaitingInput => write!(f, "AwaitingInput"),
            Self::Ready => write!(f, "Ready"),
            Self::LoggedIn => write!(f, "LoggedIn"),
            Self::LoggedOut => write!(f, "LoggedOut"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_endpoint_url_without_path() {
        let ep = RpcEndpoint::new("https", "telos.caleos.io", 443);
        assert_eq!(ep.url(), "https://telos.caleos.io:443");
    }

    #[test]
    fn test_rpc_endpoint_url_adds_leading_slash() {
        let ep = RpcEndpoint::new("http", "localhost", 8888).with_path("v1/chain");
        assert_eq!(ep.url(), "http://localhost:8888/v1/chain");
    }

    #[test]
    fn test_rpc_endpoint_url_keeps_existing_slash() {
        let ep = RpcEndpoint::new("http", "localhost", 8888).with_path("/v1");
        assert_eq!(ep.url(), "http://localhost:8888/v1");
    }

    #[test]
    fn test_rpc_endpoint_url_ignores_empty_path() {
        let ep = RpcEndpoint::new("http", "localhost", 8888).with_path("");
        assert_eq!(ep.url(), "http://localhost:8888");
    }

    #[test]
    fn test_rpc_endpoint_deserialize_missing_path() {
        let ep: RpcEndpoint = serde_json::from_str(
            r#"{"protocol":"https","host":"telos.caleos.io","port":443}"#,
        )
        .unwrap();
        assert_eq!(ep.path, None);
    }

    #[test]
    fn test_chain_id_serializes_as_bare_string() {
        let json = serde_json::to_string(&ChainId::new("4667b205")).unwrap();
        assert_eq!(json, "\"4667b205\"");
    }

    #[test]
    fn test_chain_primary_endpoint() {
        let chain = Chain::new(
            "4667b205",
            vec![
                RpcEndpoint::new("https", "a.example", 443),
                RpcEndpoint::new("https", "b.example", 443),
            ],
        );
        assert_eq!(chain.primary_endpoint().unwrap().host, "a.example");
        assert!(Chain::new("x", vec![]).primary_endpoint().is_none());
    }

    #[test]
    fn test_session_phase_default_is_idle() {
        assert_eq!(SessionPhase::default(), SessionPhase::Idle);
    }

    #[test]
    fn test_session_phase_predicates() {
        assert!(SessionPhase::LoggedIn.is_logged_in());
        assert!(!SessionPhase::Ready.is_logged_in());
        assert!(SessionPhase::AutoAuthenticating.is_authenticating());
        assert!(SessionPhase::Ready.is_authenticating());
        assert!(!SessionPhase::AwaitingInput.is_authenticating());
    }

    #[test]
    fn test_session_phase_display() {
        assert_eq!(SessionPhase::AwaitingInput.to_string(), "AwaitingInput");
        assert_eq!(SessionPhase::LoggedOut.to_string(), "LoggedOut");
    }
}
