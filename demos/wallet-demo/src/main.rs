use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use ualkit::prelude::*;
use ualkit::{PollConfig, SessionStore};

const TELOS_TESTNET: &str = "1eaa0824707c8c16bd25145493bf062aecddfeb56c736f6ba6397f3195f33c9f";

// ---------------------------------------------------------------------------
// Simulated wallets
// ---------------------------------------------------------------------------

struct DemoUser {
    account: String,
    chain_id: ChainId,
}

#[async_trait]
impl User for DemoUser {
    async fn account_name(&self) -> Result<String, AuthenticatorError> {
        Ok(self.account.clone())
    }

    fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }
}

/// A wallet that takes a few readiness checks to warm up, then logs in
/// after a short simulated round trip.
struct DemoWallet {
    name: &'static str,
    default_account: &'static str,
    confirm_on_device: bool,
    warmup: AtomicU32,
}

impl DemoWallet {
    fn new(name: &'static str, default_account: &'static str, confirm_on_device: bool) -> Self {
        Self {
            name,
            default_account,
            confirm_on_device,
            warmup: AtomicU32::new(0),
        }
    }

    fn user(&self, account: &str) -> Arc<dyn User> {
        Arc::new(DemoUser {
            account: account.to_string(),
            chain_id: ChainId::new(TELOS_TESTNET),
        })
    }
}

/// Account names are 1 to 12 characters of `a-z`, `1-5`, and `.`.
fn is_valid_account(name: &str) -> bool {
    (1..=12).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('1'..='5').contains(&c) || c == '.')
}

#[async_trait]
impl Authenticator for DemoWallet {
    fn name(&self) -> &str {
        self.name
    }

    fn init(&self) {
        let checks = rand::rng().random_range(1..=4);
        self.warmup.store(checks, Ordering::SeqCst);
        tracing::debug!(wallet = self.name, checks, "warming up");
    }

    fn is_loading(&self) -> bool {
        self.warmup
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn requires_account_confirmation(&self) -> bool {
        self.confirm_on_device
    }

    fn should_invalidate_after(&self) -> u64 {
        3600
    }

    async fn login(
        &self,
        account_hint: Option<&str>,
    ) -> Result<Vec<Arc<dyn User>>, AuthenticatorError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let account = account_hint.unwrap_or(self.default_account);
        if !is_valid_account(account) {
            return Err(AuthenticatorError::login(
                format!("{account:?} is not a valid account name"),
                self.name,
            ));
        }
        Ok(vec![self.user(account)])
    }

    async fn logout(&self) -> Result<(), AuthenticatorError> {
        Ok(())
    }

    fn reset(&self) {
        self.warmup.store(0, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn config() -> UalConfig {
    UalConfig::new(
        vec![Chain::new(
            TELOS_TESTNET,
            vec![RpcEndpoint::new("https", "testnet.telos.caleos.io", 443)],
        )],
        "Wallet Demo",
    )
    .with_poll(PollConfig::default())
}

fn build_manager(store: Arc<dyn SessionStore>) -> Result<SessionManager, UalError> {
    SessionManager::builder(config())
        .authenticator(Arc::new(DemoWallet::new("keycat", "keycatdemo1", false)))
        .authenticator(Arc::new(DemoWallet::new("anchor", "anchordemo1", true)))
        .store(store)
        .build()
}

/// Waits until the manager stops authenticating or `limit` passes.
async fn wait_settled(manager: &SessionManager, limit: Duration) -> Status {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let status = manager.status();
        if !status.phase.is_authenticating() && !status.loading {
            return status;
        }
        if tokio::time::Instant::now() >= deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let keep = std::env::args().any(|a| a == "--keep");
    let path = std::env::var("UALKIT_SESSION")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("ualkit-demo-session.json"));

    let store = Arc::new(FileSessionStore::open(&path).await?);
    let manager = build_manager(store)?;
    manager.subscribe(|status| {
        tracing::info!(
            phase = %status.phase,
            loading = status.loading,
            authenticator = ?status.active_authenticator_name(),
            message = %status.message,
            "status"
        );
    });

    tracing::info!(session = %path.display(), "starting");
    manager.start().await;
    let status = wait_settled(&manager, Duration::from_secs(5)).await;

    if status.phase.is_logged_in() {
        tracing::info!("session restored from a previous run");
    } else {
        let anchor = manager.authenticator("anchor")?;
        manager.submit_account_for_login("anchordemo1", anchor).await;
    }

    let status = manager.status();
    match &status.error {
        Some(e) => tracing::warn!(error = %e, "login failed"),
        None => tracing::info!(message = %status.message, "logged in"),
    }

    if keep {
        tracing::info!("keeping session; run again to restore it");
    } else {
        manager.logout().await;
    }
    Ok(())
}
