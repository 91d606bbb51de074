//! Authenticator registry: which wallets can be used right now.
//!
//! Pure computation over the configured list. Each authenticator decides
//! for itself whether it works on this platform (`is_available`) and
//! whether it can log in without asking the user anything
//! (`should_auto_login`); the registry combines those answers.

use std::sync::Arc;

use ualkit_session::Authenticator;
use ualkit_types::Chain;

/// The result of [`AuthenticatorRegistry::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Authenticators whose availability check passed, in configured order.
    pub available: Vec<Arc<dyn Authenticator>>,
    /// The single authenticator that may log in without user input, if
    /// exactly one qualifies.
    pub auto_login: Option<Arc<dyn Authenticator>>,
}

impl Resolution {
    /// Finds an available authenticator by name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn Authenticator>> {
        self.available.iter().find(|a| a.name() == name).cloned()
    }

    /// The list the UI should offer: just the auto-login authenticator
    /// when there is one, otherwise everything available.
    pub fn working_set(&self) -> Vec<Arc<dyn Authenticator>> {
        match &self.auto_login {
            Some(auto) => vec![Arc::clone(auto)],
            None => self.available.clone(),
        }
    }
}

/// The configured chains, app name, and authenticators.
pub struct AuthenticatorRegistry {
    chains: Vec<Chain>,
    app_name: String,
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl AuthenticatorRegistry {
    pub fn new(
        chains: Vec<Chain>,
        app_name: impl Into<String>,
        authenticators: Vec<Arc<dyn Authenticator>>,
    ) -> Self {
        Self {
            chains,
            app_name: app_name.into(),
            authenticators,
        }
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Every configured authenticator, available or not.
    pub fn authenticators(&self) -> &[Arc<dyn Authenticator>] {
        &self.authenticators
    }

    /// Computes the available list and the auto-login authenticator.
    ///
    /// Calls [`Authenticator::init`] on every available authenticator so
    /// their readiness probing starts. When two or more authenticators
    /// qualify for auto-login the choice is ambiguous and none is picked;
    /// that's not an error.
    pub fn resolve(&self) -> Resolution {
        let available: Vec<Arc<dyn Authenticator>> = self
            .authenticators
            .iter()
            .filter(|a| a.is_available())
            .cloned()
            .collect();

        for authenticator in &available {
            authenticator.init();
        }

        let mut candidates = available.iter().filter(|a| a.should_auto_login());
        let auto_login = match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(Arc::clone(only)),
            (Some(_), Some(_)) => {
                tracing::debug!("more than one authenticator can auto-login, selecting none");
                None
            }
            _ => None,
        };

        tracing::debug!(
            configured = self.authenticators.len(),
            available = available.len(),
            auto_login = ?auto_login.as_deref().map(|a| a.name()),
            "authenticators resolved"
        );

        Resolution {
            available,
            auto_login,
        }
    }
}

impl std::fmt::Debug for AuthenticatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorRegistry")
            .field("app_name", &self.app_name)
            .field("chains", &self.chains.len())
            .field("authenticators", &self.authenticators)
            .finish()
    }
}
