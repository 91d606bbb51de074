//! The shared status record and the broadcaster that publishes it.
//!
//! [`Status`] is plain data: everything the UI needs to render the sign-in
//! surface. The session manager never hands out `&mut Status`; it builds a
//! [`StatusPatch`] and calls [`StatusBroadcaster::broadcast`], which
//! applies the patch and synchronously notifies every subscriber.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::mpsc;
use ualkit_session::{Authenticator, User};
use ualkit_types::{AuthenticatorError, SessionPhase};

/// UI-facing message strings published by the session manager.
pub mod messages {
    pub const CONTINUE_WITH_AUTHENTICATOR: &str = "Continue with Authenticator";
    pub const APPROVE_ON_DEVICE: &str = "Please approve the request from your device.";
    pub const FINDING_ACCOUNT: &str = "Please wait while we find your account.";
    pub const LOADING_AUTHENTICATORS: &str = "Loading Authenticators";
    pub const AUTHENTICATORS_LOADED: &str = "Authenticators loaded.";
    pub const SESSION_ENDED: &str = "User session has ended. Login required.";

    /// Success message for a completed login.
    pub fn logged_in_as(account: &str) -> String {
        format!("Currently logged in as {account}")
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// A snapshot of the session manager's state.
///
/// Cheap to clone: users and authenticators are `Arc`s.
#[derive(Debug, Clone, Default)]
pub struct Status {
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Whether the sign-in surface should be shown.
    pub modal: bool,
    pub loading: bool,
    /// Set only after a successful login.
    pub active_user: Option<Arc<dyn User>>,
    pub active_authenticator: Option<Arc<dyn Authenticator>>,
    /// Users returned by the last login, most recent last.
    pub users: Vec<Arc<dyn User>>,
    pub available_authenticators: Vec<Arc<dyn Authenticator>>,
    /// `true` once the available list has been published.
    pub authenticators_loaded: bool,
    /// `true` if the active user was logged in without any user action.
    pub is_auto_login: bool,
    /// The last login failure.
    pub error: Option<AuthenticatorError>,
    pub message: String,
}

impl Status {
    /// Name of the active authenticator, if any.
    pub fn active_authenticator_name(&self) -> Option<&str> {
        self.active_authenticator.as_deref().map(|a| a.name())
    }

    /// Names of the available authenticators, in order.
    pub fn available_names(&self) -> Vec<&str> {
        self.available_authenticators
            .iter()
            .map(|a| a.name())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// StatusPatch
// ---------------------------------------------------------------------------

/// A partial update to [`Status`].
///
/// `None` leaves a field untouched. Fields that are themselves optional
/// use `Option<Option<_>>` so a patch can clear them (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub phase: Option<SessionPhase>,
    pub modal: Option<bool>,
    pub loading: Option<bool>,
    pub active_user: Option<Option<Arc<dyn User>>>,
    pub active_authenticator: Option<Option<Arc<dyn Authenticator>>>,
    pub users: Option<Vec<Arc<dyn User>>>,
    pub available_authenticators: Option<Vec<Arc<dyn Authenticator>>>,
    pub authenticators_loaded: Option<bool>,
    pub is_auto_login: Option<bool>,
    pub error: Option<Option<AuthenticatorError>>,
    pub message: Option<String>,
}

impl StatusPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The patch that returns the login fields to their defaults.
    ///
    /// Leaves the modal flag, the phase, and the available-authenticator
    /// list alone: resetting a login doesn't forget which wallets exist.
    pub fn reset() -> Self {
        Self {
            loading: Some(false),
            active_user: Some(None),
            active_authenticator: Some(None),
            users: Some(Vec::new()),
            is_auto_login: Some(false),
            error: Some(None),
            message: Some(String::new()),
            ..Self::default()
        }
    }

    pub fn phase(mut self, phase: SessionPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn modal(mut self, modal: bool) -> Self {
        self.modal = Some(modal);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn active_user(mut self, user: Option<Arc<dyn User>>) -> Self {
        self.active_user = Some(user);
        self
    }

    pub fn active_authenticator(mut self, authenticator: Option<Arc<dyn Authenticator>>) -> Self {
        self.active_authenticator = Some(authenticator);
        self
    }

    pub fn users(mut self, users: Vec<Arc<dyn User>>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn available_authenticators(mut self, list: Vec<Arc<dyn Authenticator>>) -> Self {
        self.available_authenticators = Some(list);
        self
    }

    pub fn authenticators_loaded(mut self, loaded: bool) -> Self {
        self.authenticators_loaded = Some(loaded);
        self
    }

    pub fn is_auto_login(mut self, auto: bool) -> Self {
        self.is_auto_login = Some(auto);
        self
    }

    pub fn error(mut self, error: Option<AuthenticatorError>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Applies the patch field by field.
    pub fn apply_to(self, status: &mut Status) {
        if let Some(v) = self.phase {
            status.phase = v;
        }
        if let Some(v) = self.modal {
            status.modal = v;
        }
        if let Some(v) = self.loading {
            status.loading = v;
        }
        if let Some(v) = self.active_user {
            status.active_user = v;
        }
        if let Some(v) = self.active_authenticator {
            status.active_authenticator = v;
        }
        if let Some(v) = self.users {
            status.users = v;
        }
        if let Some(v) = self.available_authenticators {
            status.available_authenticators = v;
        }
        if let Some(v) = self.authenticators_loaded {
            status.authenticators_loaded = v;
        }
        if let Some(v) = self.is_auto_login {
            status.is_auto_login = v;
        }
        if let Some(v) = self.error {
            status.error = v;
        }
        if let Some(v) = self.message {
            status.message = v;
        }
    }
}

// ---------------------------------------------------------------------------
// StatusBroadcaster
// ---------------------------------------------------------------------------

/// A status listener. Called synchronously with every new snapshot.
pub type Subscriber = Arc<dyn Fn(&Status) + Send + Sync>;

/// Identifies a subscription so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner {
    status: Status,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
    revision: u64,
}

/// Holds the current [`Status`] and notifies subscribers on every change.
///
/// # Locking
///
/// The status lock is released before subscribers run, so a subscriber
/// may read [`snapshot`](Self::snapshot) freely. A second, reentrant lock
/// serializes whole broadcasts: subscribers see snapshots in the order
/// they were produced, and a subscriber that itself triggers a broadcast
/// on the same thread doesn't deadlock.
pub struct StatusBroadcaster {
    inner: Mutex<Inner>,
    delivery: ReentrantMutex<()>,
}

impl StatusBroadcaster {
    pub fn new(initial: Status) -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: initial,
                subscribers: Vec::new(),
                next_id: 1,
                revision: 0,
            }),
            delivery: ReentrantMutex::new(()),
        }
    }

    /// A clone of the current status.
    pub fn snapshot(&self) -> Status {
        self.inner.lock().status.clone()
    }

    /// Number of broadcasts so far.
    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }

    /// Registers a subscriber. It is not called with the current status;
    /// read [`snapshot`](Self::snapshot) for that.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&Status) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(subscriber)));
        id
    }

    /// Subscribes through an unbounded channel, for async consumers.
    ///
    /// Snapshots sent after the receiver is dropped are discarded.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<Status>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |status| {
            let _ = tx.send(status.clone());
        });
        (id, rx)
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Applies `patch` and notifies every subscriber before returning.
    ///
    /// Returns the new snapshot.
    pub fn broadcast(&self, patch: StatusPatch) -> Status {
        let _delivery = self.delivery.lock();
        let (snapshot, subscribers) = {
            let mut inner = self.inner.lock();
            patch.apply_to(&mut inner.status);
            inner.revision += 1;
            let subscribers: Vec<Subscriber> =
                inner.subscribers.iter().map(|(_, s)| Arc::clone(s)).collect();
            (inner.status.clone(), subscribers)
        };

        tracing::trace!(
            phase = %snapshot.phase,
            loading = snapshot.loading,
            message = %snapshot.message,
            subscribers = subscribers.len(),
            "status broadcast"
        );

        for subscriber in &subscribers {
            subscriber(&snapshot);
        }
        snapshot
    }
}

impl std::fmt::Debug for StatusBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StatusBroadcaster")
            .field("status", &inner.status)
            .field("subscribers", &inner.subscribers.len())
            .field("revision", &inner.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_patch_leaves_missing_fields_untouched() {
        let mut status = Status {
            modal: true,
            message: "before".into(),
            loading: true,
            ..Status::default()
        };

        StatusPatch::new().message("after").apply_to(&mut status);

        assert_eq!(status.message, "after");
        assert!(status.modal, "modal was not in the patch");
        assert!(status.loading, "loading was not in the patch");
    }

    #[test]
    fn test_reset_patch_keeps_modal_and_phase() {
        let mut status = Status {
            phase: SessionPhase::LoggedIn,
            modal: true,
            loading: true,
            is_auto_login: true,
            error: Some(AuthenticatorError::login("nope", "anchor")),
            message: "Currently logged in as bob".into(),
            authenticators_loaded: true,
            ..Status::default()
        };

        StatusPatch::reset().apply_to(&mut status);

        assert!(!status.loading);
        assert!(status.error.is_none());
        assert!(status.message.is_empty());
        assert!(!status.is_auto_login);
        assert!(status.modal);
        assert!(status.authenticators_loaded);
        assert_eq!(status.phase, SessionPhase::LoggedIn);
    }

    #[test]
    fn test_patch_can_clear_optional_field() {
        let mut status = Status {
            error: Some(AuthenticatorError::login("nope", "anchor")),
            ..Status::default()
        };

        StatusPatch::new().error(None).apply_to(&mut status);

        assert!(status.error.is_none());
    }

    #[test]
    fn test_broadcast_notifies_every_subscriber_synchronously() {
        let broadcaster = StatusBroadcaster::new(Status::default());
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = Arc::clone(&calls);
            broadcaster.subscribe(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        broadcaster.broadcast(StatusPatch::new().loading(true));

        // No await in between: delivery already happened.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(broadcaster.revision(), 1);
    }

    #[test]
    fn test_subscriber_sees_patched_snapshot() {
        let broadcaster = StatusBroadcaster::new(Status::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        broadcaster.subscribe(move |status| s.lock().push(status.message.clone()));

        broadcaster.broadcast(StatusPatch::new().message("one"));
        broadcaster.broadcast(StatusPatch::new().loading(true));

        assert_eq!(*seen.lock(), vec!["one".to_string(), "one".to_string()]);
    }

    #[test]
    fn test_subscriber_can_read_snapshot_without_deadlock() {
        let broadcaster = Arc::new(StatusBroadcaster::new(Status::default()));
        let b = Arc::clone(&broadcaster);
        let observed = Arc::new(Mutex::new(None));
        let o = Arc::clone(&observed);
        broadcaster.subscribe(move |_| {
            *o.lock() = Some(b.snapshot().loading);
        });

        broadcaster.broadcast(StatusPatch::new().loading(true));

        assert_eq!(*observed.lock(), Some(true));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let broadcaster = StatusBroadcaster::new(Status::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let id = broadcaster.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(broadcaster.unsubscribe(id));
        assert!(!broadcaster.unsubscribe(id), "second unsubscribe is a no-op");
        broadcaster.broadcast(StatusPatch::new().loading(true));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_channel_receives_snapshots() {
        let broadcaster = StatusBroadcaster::new(Status::default());
        let (_id, mut rx) = broadcaster.subscribe_channel();

        broadcaster.broadcast(StatusPatch::new().phase(SessionPhase::Restoring));

        let status = rx.recv().await.expect("snapshot delivered");
        assert_eq!(status.phase, SessionPhase::Restoring);
    }

    #[test]
    fn test_subscribe_channel_dropped_receiver_is_harmless() {
        let broadcaster = StatusBroadcaster::new(Status::default());
        let (_id, rx) = broadcaster.subscribe_channel();
        drop(rx);

        broadcaster.broadcast(StatusPatch::new().loading(true));

        assert!(broadcaster.snapshot().loading);
    }

    #[test]
    fn test_messages_logged_in_as() {
        assert_eq!(
            messages::logged_in_as("captaincrypt"),
            "Currently logged in as captaincrypt"
        );
    }
}
