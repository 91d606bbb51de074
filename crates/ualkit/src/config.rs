//! Session manager configuration.

use serde::{Deserialize, Serialize};
use ualkit_poll::PollConfig;
use ualkit_types::{Chain, Codec, JsonCodec};

use crate::UalError;

/// Everything the session manager needs besides the authenticators
/// themselves (which are live objects, not configuration).
///
/// Serializable so an app can ship it as a JSON asset:
///
/// ```rust
/// use ualkit::UalConfig;
///
/// let config = UalConfig::from_json(br#"{
///     "chains": [{
///         "chain_id": "4667b205c6838ef70ff7988f6e8257e8be0e1284a2f59699054a018f743b1d11",
///         "rpc_endpoints": [{ "protocol": "https", "host": "telos.caleos.io", "port": 443 }]
///     }],
///     "app_name": "Decide Voter"
/// }"#).unwrap();
///
/// assert!(!config.modal);
/// assert_eq!(config.poll.interval_ms, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UalConfig {
    /// Chains the app supports.
    pub chains: Vec<Chain>,
    /// Display name handed to wallets (shown in their approval prompts).
    pub app_name: String,
    /// Whether the sign-in surface starts visible.
    #[serde(default)]
    pub modal: bool,
    /// Readiness polling settings.
    #[serde(default)]
    pub poll: PollConfig,
}

impl UalConfig {
    pub fn new(chains: Vec<Chain>, app_name: impl Into<String>) -> Self {
        Self {
            chains,
            app_name: app_name.into(),
            modal: false,
            poll: PollConfig::default(),
        }
    }

    pub fn with_modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Decodes and validates a JSON configuration.
    pub fn from_json(bytes: &[u8]) -> Result<Self, UalError> {
        let config: Self = JsonCodec.decode(bytes)?;
        config.validated()
    }

    /// Rejects configurations the manager can't work with.
    ///
    /// # Errors
    /// [`UalError::Config`] when there are no chains, a chain has no RPC
    /// endpoints, the app name is blank, or the poll interval is zero.
    pub fn validated(self) -> Result<Self, UalError> {
        if self.chains.is_empty() {
            return Err(UalError::Config("at least one chain is required".into()));
        }
        if let Some(chain) = self.chains.iter().find(|c| c.rpc_endpoints.is_empty()) {
            return Err(UalError::Config(format!(
                "chain {} has no rpc endpoints",
                chain.chain_id
            )));
        }
        if self.app_name.trim().is_empty() {
            return Err(UalError::Config("app_name must not be empty".into()));
        }
        if self.poll.interval_ms == 0 {
            return Err(UalError::Config("poll interval must be positive".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use ualkit_types::RpcEndpoint;

    use super::*;

    fn telos() -> Chain {
        Chain::new(
            "4667b205c6838ef70ff7988f6e8257e8be0e1284a2f59699054a018f743b1d11",
            vec![RpcEndpoint::new("https", "telos.caleos.io", 443)],
        )
    }

    #[test]
    fn test_validated_accepts_minimal_config() {
        let config = UalConfig::new(vec![telos()], "Unmuted.io").validated();
        assert!(config.is_ok());
    }

    #[test]
    fn test_validated_rejects_no_chains() {
        let result = UalConfig::new(vec![], "Unmuted.io").validated();
        assert!(matches!(result, Err(UalError::Config(msg)) if msg.contains("chain")));
    }

    #[test]
    fn test_validated_rejects_chain_without_endpoints() {
        let result = UalConfig::new(vec![Chain::new("abc", vec![])], "Unmuted.io").validated();
        assert!(matches!(result, Err(UalError::Config(msg)) if msg.contains("abc")));
    }

    #[test]
    fn test_validated_rejects_blank_app_name() {
        let result = UalConfig::new(vec![telos()], "   ").validated();
        assert!(matches!(result, Err(UalError::Config(_))));
    }

    #[test]
    fn test_validated_rejects_zero_poll_interval() {
        let result = UalConfig::new(vec![telos()], "Unmuted.io")
            .with_poll(PollConfig {
                interval_ms: 0,
                max_ticks: None,
            })
            .validated();
        assert!(matches!(result, Err(UalError::Config(_))));
    }

    #[test]
    fn test_from_json_malformed_is_codec_error() {
        let result = UalConfig::from_json(b"{\"chains\": 5}");
        assert!(matches!(result, Err(UalError::Codec(_))));
    }

    #[test]
    fn test_from_json_runs_validation() {
        let result = UalConfig::from_json(br#"{"chains": [], "app_name": "x"}"#);
        assert!(matches!(result, Err(UalError::Config(_))));
    }

    #[test]
    fn test_serde_roundtrip_keeps_modal_and_poll() {
        let config = UalConfig::new(vec![telos()], "Unmuted.io")
            .with_modal(true)
            .with_poll(PollConfig::with_interval(std::time::Duration::from_millis(100)));

        let json = serde_json::to_vec(&config).unwrap();
        let back = UalConfig::from_json(&json).unwrap();

        assert_eq!(back, config);
    }
}
