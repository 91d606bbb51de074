//! `SessionManager`: restore, login, logout, restart.
//!
//! The manager is the only writer of [`Status`]. Every transition goes
//! through [`StatusBroadcaster::broadcast`], so subscribers observe the
//! exact sequence of states. Authenticator failures never escape as
//! errors; they become status updates the UI renders.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use ualkit_poll::{CancellationToken, PollConfig, PollOutcome, ReadinessPoller};
use ualkit_session::{
    ACCOUNT_NAME_KEY, Authenticator, MemorySessionStore, PersistedSession, SessionStore,
    StoreError, User, invalidation_deadline,
};
use ualkit_types::{AuthenticatorError, ErrorKind, SessionPhase};

use crate::registry::{AuthenticatorRegistry, Resolution};
use crate::status::{Status, StatusBroadcaster, StatusPatch, SubscriptionId, messages};
use crate::{UalConfig, UalError};

/// What a background task does once its authenticator reports ready.
#[derive(Debug)]
enum ReadyAction {
    LoginWithAccount(String),
    LoginWithoutInput { auto_login: bool },
}

/// State shared between the manager handle and its polling tasks.
struct Shared {
    registry: AuthenticatorRegistry,
    store: Arc<dyn SessionStore>,
    status: StatusBroadcaster,
    poll: PollConfig,
    /// Bumped by logout and restart. A login that started under an older
    /// generation drops its result.
    generation: AtomicU64,
    polls: Mutex<Vec<CancellationToken>>,
    resolution: Mutex<Option<Resolution>>,
}

/// Builder for a [`SessionManager`].
///
/// # Example
///
/// ```rust,ignore
/// let manager = SessionManager::builder(config)
///     .authenticator(Arc::new(Keycat::new()))
///     .authenticator(Arc::new(Anchor::new()))
///     .store(Arc::new(FileSessionStore::open("session.json").await?))
///     .build()?;
/// manager.start().await;
/// ```
pub struct SessionManagerBuilder {
    config: UalConfig,
    authenticators: Vec<Arc<dyn Authenticator>>,
    store: Option<Arc<dyn SessionStore>>,
}

impl SessionManagerBuilder {
    /// Adds an authenticator. Order matters: it's the order the UI lists
    /// them in.
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticators.push(authenticator);
        self
    }

    pub fn authenticators(
        mut self,
        authenticators: impl IntoIterator<Item = Arc<dyn Authenticator>>,
    ) -> Self {
        self.authenticators.extend(authenticators);
        self
    }

    /// Sets the session store. Defaults to an in-memory store, which
    /// forgets the session when the process exits.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<SessionManager, UalError> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        SessionManager::new(self.config, self.authenticators, store)
    }
}

/// Drives wallet authenticators and owns the shared [`Status`].
///
/// Cheap to clone: every clone is a handle to the same manager.
///
/// # Concurrency
///
/// Only one login flow is expected at a time, since the UI only offers
/// one. Logout and restart don't wait for an in-flight login; they bump a
/// generation counter instead, and the stale login discards its result
/// when it resolves.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    pub fn builder(config: UalConfig) -> SessionManagerBuilder {
        SessionManagerBuilder {
            config,
            authenticators: Vec::new(),
            store: None,
        }
    }

    /// Creates a manager. Nothing happens until [`start`](Self::start).
    ///
    /// # Errors
    /// [`UalError::Config`] if the configuration is invalid or two
    /// authenticators share a name.
    pub fn new(
        config: UalConfig,
        authenticators: Vec<Arc<dyn Authenticator>>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, UalError> {
        let config = config.validated()?;

        {
            let mut seen = HashSet::new();
            for authenticator in &authenticators {
                if !seen.insert(authenticator.name()) {
                    return Err(UalError::Config(format!(
                        "authenticator name {:?} is configured twice",
                        authenticator.name()
                    )));
                }
            }
        }

        let UalConfig {
            chains,
            app_name,
            modal,
            poll,
        } = config;

        let initial = Status {
            modal,
            ..Status::default()
        };

        Ok(Self {
            shared: Arc::new(Shared {
                registry: AuthenticatorRegistry::new(chains, app_name, authenticators),
                store,
                status: StatusBroadcaster::new(initial),
                poll,
                generation: AtomicU64::new(0),
                polls: Mutex::new(Vec::new()),
                resolution: Mutex::new(None),
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// A snapshot of the current status.
    pub fn status(&self) -> Status {
        self.shared.status.snapshot()
    }

    /// Registers a listener called synchronously on every broadcast.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&Status) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.status.subscribe(subscriber)
    }

    /// Like [`subscribe`](Self::subscribe), but delivers snapshots into a
    /// channel for async consumers.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<Status>) {
        self.shared.status.subscribe_channel()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.status.unsubscribe(id)
    }

    pub fn registry(&self) -> &AuthenticatorRegistry {
        &self.shared.registry
    }

    /// Finds an available authenticator by name.
    ///
    /// # Errors
    /// [`UalError::LookupFailure`] if no available authenticator has that
    /// name.
    pub fn authenticator(&self, name: &str) -> Result<Arc<dyn Authenticator>, UalError> {
        self.resolution()
            .find(name)
            .ok_or_else(|| UalError::LookupFailure {
                auth_type: name.to_string(),
            })
    }

    /// Reads the persisted session as it is right now.
    pub async fn persisted_session(&self) -> Result<PersistedSession, UalError> {
        Ok(PersistedSession::load(self.shared.store.as_ref()).await?)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Restores the previous session, if any, and publishes the available
    /// authenticators.
    ///
    /// Returns as soon as any background readiness polling has been
    /// scheduled; the login itself completes later and shows up as a
    /// status broadcast.
    pub async fn start(&self) -> Status {
        self.broadcast(StatusPatch::new().phase(SessionPhase::Restoring));

        let session = match PersistedSession::load(self.shared.store.as_ref()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "could not read persisted session, continuing without one");
                PersistedSession::default()
            }
        };

        let session = if session.is_present() && session.is_expired(Utc::now()) {
            info!(
                authenticator = ?session.auth_type,
                invalidate_at = ?session.invalidate_at,
                "persisted session expired"
            );
            self.purge_session().await;
            PersistedSession::default()
        } else {
            session
        };

        let resolution = self.shared.registry.resolve();
        *self.shared.resolution.lock() = Some(resolution.clone());

        let restoring = match &session.auth_type {
            Some(auth_type) => match resolution.find(auth_type) {
                Some(authenticator) => {
                    info!(
                        authenticator = %auth_type,
                        account = ?session.account_name,
                        "restoring session"
                    );
                    let action = match session.account_name {
                        Some(account) => ReadyAction::LoginWithAccount(account),
                        None => ReadyAction::LoginWithoutInput { auto_login: false },
                    };
                    self.spawn_when_ready(authenticator, action);
                    true
                }
                None => {
                    let failure = UalError::LookupFailure {
                        auth_type: auth_type.clone(),
                    };
                    warn!(
                        source = %auth_type,
                        error = %failure,
                        "{}",
                        messages::SESSION_ENDED
                    );
                    self.purge_session().await;
                    false
                }
            },
            None => false,
        };

        self.fetch_authenticators(&resolution, restoring);
        self.status()
    }

    /// Publishes the working set of authenticators, and schedules the
    /// auto-login when there is one and no restore is already running.
    fn fetch_authenticators(&self, resolution: &Resolution, restoring: bool) {
        let auto = if restoring {
            None
        } else {
            resolution.auto_login.clone()
        };

        let phase = if restoring || auto.is_some() {
            SessionPhase::AutoAuthenticating
        } else {
            SessionPhase::AwaitingInput
        };
        self.publish_authenticators(resolution.working_set(), phase);

        if let Some(authenticator) = auto {
            debug!(authenticator = %authenticator.name(), "scheduling auto-login");
            self.spawn_when_ready(
                authenticator,
                ReadyAction::LoginWithoutInput { auto_login: true },
            );
        }
    }

    /// Logs in with an authenticator that needs no account name.
    ///
    /// On success the last user returned becomes the active user. Unless
    /// `auto_login` is set, the session is persisted so the next
    /// [`start`](Self::start) restores it.
    ///
    /// Returns the active user, or `None` if the login failed (the error
    /// is in [`Status::error`]) or was superseded by a logout or restart.
    pub async fn authenticate_without_account_input(
        &self,
        authenticator: Arc<dyn Authenticator>,
        auto_login: bool,
    ) -> Option<Arc<dyn User>> {
        let generation = self.generation();
        self.broadcast(
            StatusPatch::new()
                .phase(SessionPhase::Ready)
                .loading(true)
                .error(None)
                .message(messages::CONTINUE_WITH_AUTHENTICATOR)
                .active_authenticator(Some(Arc::clone(&authenticator))),
        );

        let (user, users, account) = match self.run_login(authenticator.as_ref(), None).await {
            Ok(login) => login,
            Err(e) => {
                self.fail_login(generation, e);
                return None;
            }
        };

        if self.is_stale(generation) {
            debug!(authenticator = %authenticator.name(), "discarding superseded login");
            return None;
        }

        if !auto_login {
            self.persist_session(authenticator.as_ref(), None).await;
            if self.discard_if_superseded(generation, authenticator.name()).await {
                return None;
            }
        }

        self.succeed_login(authenticator, Arc::clone(&user), users, &account, auto_login);
        Some(user)
    }

    /// Logs in for a specific account.
    ///
    /// Shows "Please approve the request from your device." for wallets
    /// that need a device confirmation, and "Please wait while we find
    /// your account." otherwise. On success the session is persisted with
    /// the account name the wallet returned.
    pub async fn submit_account_for_login(
        &self,
        account_input: &str,
        authenticator: Arc<dyn Authenticator>,
    ) -> Option<Arc<dyn User>> {
        let generation = self.generation();
        let hint = account_input.trim();
        if hint.is_empty() {
            self.fail_login(
                generation,
                AuthenticatorError::new(
                    ErrorKind::Validation,
                    "An account name is required",
                    authenticator.name(),
                ),
            );
            return None;
        }

        let message = if authenticator.requires_account_confirmation() {
            messages::APPROVE_ON_DEVICE
        } else {
            messages::FINDING_ACCOUNT
        };
        self.broadcast(
            StatusPatch::new()
                .phase(SessionPhase::Ready)
                .loading(true)
                .error(None)
                .message(message)
                .active_authenticator(Some(Arc::clone(&authenticator))),
        );

        let login = self.run_login(authenticator.as_ref(), Some(hint)).await;
        let (user, users, account) = match login {
            Ok(login) => login,
            Err(e) => {
                self.fail_login(generation, e);
                return None;
            }
        };

        if self.is_stale(generation) {
            debug!(authenticator = %authenticator.name(), "discarding superseded login");
            return None;
        }

        self.persist_session(authenticator.as_ref(), Some(&account)).await;
        if self.discard_if_superseded(generation, authenticator.name()).await {
            return None;
        }
        self.succeed_login(authenticator, Arc::clone(&user), users, &account, false);
        Some(user)
    }

    /// Ends the session.
    ///
    /// Status is reset first. The persisted session is purged and the
    /// authenticator's own logout runs afterwards; a failing wallet logout
    /// is logged, never surfaced, and doesn't keep the session alive.
    pub async fn logout(&self) {
        let active = self.status().active_authenticator;
        self.supersede_in_flight();

        self.broadcast(StatusPatch::reset().phase(SessionPhase::LoggedOut));
        self.purge_session().await;

        if let Some(authenticator) = active {
            match authenticator.logout().await {
                Ok(()) => info!(authenticator = %authenticator.name(), "logged out"),
                Err(e) => warn!(
                    authenticator = %authenticator.name(),
                    error = %e,
                    cause = ?e.cause,
                    "authenticator logout failed"
                ),
            }
        }

        self.broadcast(StatusPatch::new().phase(SessionPhase::Idle));
    }

    /// Clears the login state and every authenticator's error state, then
    /// republishes the authenticator list.
    pub fn restart(&self) {
        self.supersede_in_flight();
        self.broadcast(StatusPatch::reset());

        let resolution = self.resolution();
        for authenticator in &resolution.available {
            authenticator.reset();
        }
        info!(available = resolution.available.len(), "restarted");

        self.publish_authenticators(resolution.working_set(), SessionPhase::AwaitingInput);
    }

    pub fn show_modal(&self) {
        self.broadcast(StatusPatch::new().modal(true));
    }

    /// Hides the sign-in surface and flags that authenticators are still
    /// loading. The flag clears itself once the list is published.
    pub fn hide_modal(&self) {
        self.broadcast(
            StatusPatch::new()
                .modal(false)
                .loading(true)
                .message(messages::LOADING_AUTHENTICATORS),
        );
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Broadcasts `patch`, then settles "Loading Authenticators" if the
    /// list is already there.
    fn broadcast(&self, patch: StatusPatch) -> Status {
        let status = self.shared.status.broadcast(patch);
        if status.loading
            && status.message == messages::LOADING_AUTHENTICATORS
            && !status.available_authenticators.is_empty()
        {
            return self.shared.status.broadcast(
                StatusPatch::new()
                    .loading(false)
                    .message(messages::AUTHENTICATORS_LOADED),
            );
        }
        status
    }

    fn publish_authenticators(&self, list: Vec<Arc<dyn Authenticator>>, phase: SessionPhase) {
        debug!(count = list.len(), %phase, "publishing authenticators");
        self.broadcast(
            StatusPatch::new()
                .available_authenticators(list)
                .authenticators_loaded(true)
                .phase(phase),
        );
    }

    fn resolution(&self) -> Resolution {
        let mut cached = self.shared.resolution.lock();
        cached
            .get_or_insert_with(|| self.shared.registry.resolve())
            .clone()
    }

    fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation() != generation
    }

    /// Invalidates in-flight logins and cancels every readiness poll.
    fn supersede_in_flight(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let polls = std::mem::take(&mut *self.shared.polls.lock());
        for token in polls {
            token.cancel();
        }
    }

    /// Waits for `authenticator` to finish loading, then runs `action`.
    fn spawn_when_ready(
        &self,
        authenticator: Arc<dyn Authenticator>,
        action: ReadyAction,
    ) {
        let mut poller = ReadinessPoller::new(self.shared.poll.clone());
        {
            let mut polls = self.shared.polls.lock();
            polls.retain(|t| !t.is_cancelled());
            polls.push(poller.cancel_token());
        }

        let manager = self.clone();
        let generation = self.generation();
        tokio::spawn(async move {
            let wallet = Arc::clone(&authenticator);
            match poller.wait_until(|| !wallet.is_loading()).await {
                PollOutcome::Ready { ticks } => {
                    debug!(authenticator = %authenticator.name(), ticks, "authenticator ready");
                }
                PollOutcome::Cancelled { .. } => return,
                PollOutcome::TimedOut { ticks } => {
                    warn!(
                        authenticator = %authenticator.name(),
                        ticks,
                        "authenticator never became ready"
                    );
                    if !manager.is_stale(generation) {
                        manager.broadcast(StatusPatch::new().phase(SessionPhase::AwaitingInput));
                    }
                    return;
                }
            }

            if manager.is_stale(generation) {
                return;
            }
            match action {
                ReadyAction::LoginWithAccount(account) => {
                    manager
                        .submit_account_for_login(&account, authenticator)
                        .await;
                }
                ReadyAction::LoginWithoutInput { auto_login } => {
                    manager
                        .authenticate_without_account_input(authenticator, auto_login)
                        .await;
                }
            }
        });
    }

    /// Calls the wallet's login and resolves the active user's account
    /// name.
    async fn run_login(
        &self,
        authenticator: &dyn Authenticator,
        hint: Option<&str>,
    ) -> Result<(Arc<dyn User>, Vec<Arc<dyn User>>, String), AuthenticatorError> {
        let users = authenticator.login(hint).await?;
        let user = users.last().cloned().ok_or_else(|| {
            AuthenticatorError::login("The authenticator returned no users", authenticator.name())
        })?;
        let account = user.account_name().await?;
        Ok((user, users, account))
    }

    fn succeed_login(
        &self,
        authenticator: Arc<dyn Authenticator>,
        user: Arc<dyn User>,
        users: Vec<Arc<dyn User>>,
        account: &str,
        auto_login: bool,
    ) {
        info!(
            authenticator = %authenticator.name(),
            account = %account,
            auto_login,
            "logged in"
        );
        self.broadcast(
            StatusPatch::new()
                .phase(SessionPhase::LoggedIn)
                .loading(false)
                .error(None)
                .active_authenticator(Some(authenticator))
                .active_user(Some(user))
                .users(users)
                .is_auto_login(auto_login)
                .message(messages::logged_in_as(account)),
        );
    }

    fn fail_login(&self, generation: u64, error: AuthenticatorError) {
        if self.is_stale(generation) {
            debug!(error = %error, "discarding failure of superseded login");
            return;
        }
        warn!(
            source = %error.source_name,
            kind = %error.kind,
            error = %error,
            "login failed"
        );
        self.broadcast(
            StatusPatch::new()
                .phase(SessionPhase::AwaitingInput)
                .loading(false)
                .message(error.message.clone())
                .error(Some(error)),
        );
    }

    /// Remembers a successful login. A store failure is logged; the login
    /// itself stands.
    async fn persist_session(&self, authenticator: &dyn Authenticator, account: Option<&str>) {
        let deadline = invalidation_deadline(Utc::now(), authenticator.should_invalidate_after());
        if let Err(e) = self
            .write_session(authenticator.name(), account, deadline)
            .await
        {
            warn!(
                authenticator = %authenticator.name(),
                error = %e,
                "could not persist session"
            );
        }
    }

    async fn write_session(
        &self,
        auth_type: &str,
        account: Option<&str>,
        deadline: Option<chrono::DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let store = self.shared.store.as_ref();
        PersistedSession::save_auth_type(store, auth_type).await?;
        match account {
            Some(account) => PersistedSession::save_account_name(store, account).await?,
            None => store.remove(ACCOUNT_NAME_KEY).await?,
        }
        PersistedSession::save_invalidate_at(store, deadline).await
    }

    /// Called after persisting. A logout or restart that ran while the
    /// writes were in flight has already purged; the late writes are
    /// removed again so the session doesn't outlive the logout.
    async fn discard_if_superseded(&self, generation: u64, auth_type: &str) -> bool {
        if !self.is_stale(generation) {
            return false;
        }
        debug!(authenticator = %auth_type, "discarding login superseded while persisting");
        self.purge_session().await;
        true
    }

    async fn purge_session(&self) {
        if let Err(e) = PersistedSession::purge(self.shared.store.as_ref()).await {
            warn!(error = %e, "could not purge persisted session");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("registry", &self.shared.registry)
            .field("generation", &self.generation())
            .field("polls", &self.shared.polls.lock().len())
            .finish_non_exhaustive()
    }
}
