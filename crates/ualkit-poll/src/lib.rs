//! Fixed-period readiness polling for ualkit.
//!
//! Wallet authenticators report readiness through a plain boolean
//! (`is_loading()`), never through a callback. The session manager has to
//! re-check that flag on a timer until it flips, then log in.
//! [`ReadinessPoller`] is that timer: a fixed-period check loop that
//! suspends between ticks instead of blocking a thread, and stops as soon
//! as the condition holds or its [`CancellationToken`] fires.
//!
//! # Integration
//!
//! ```ignore
//! let mut poller = ReadinessPoller::new(PollConfig::default());
//! let token = poller.cancel_token(); // keep this to abort on logout
//! tokio::spawn(async move {
//!     if poller.wait_until(|| !wallet.is_loading()).await.is_ready() {
//!         manager.authenticate_without_account_input(wallet, true).await;
//!     }
//! });
//! ```
//!
//! # No timeout by default
//!
//! With `max_ticks: None` a wallet that never becomes ready is polled for
//! as long as the poller lives. Callers that can't accept that keep the
//! cancel token and cancel explicitly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// The poller's stop signal. Clones share one flag and cancelling twice
/// is a no-op.
pub use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a readiness poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Milliseconds between readiness checks. Default: 250.
    pub interval_ms: u64,
    /// Give up after this many checks. `None` polls until ready or
    /// cancelled.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::DEFAULT_INTERVAL_MS,
            max_ticks: None,
        }
    }
}

impl PollConfig {
    /// The polling period wallets are checked at unless configured
    /// otherwise.
    pub const DEFAULT_INTERVAL_MS: u64 = 250;

    /// Smallest period the poller will run at.
    pub const MIN_INTERVAL_MS: u64 = 1;

    /// Create a config for a specific period.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ReadinessPoller::new`]. A zero interval
    /// would spin; it is raised to [`Self::MIN_INTERVAL_MS`].
    pub fn validated(mut self) -> Self {
        if self.interval_ms < Self::MIN_INTERVAL_MS {
            warn!(
                interval_ms = self.interval_ms,
                min = Self::MIN_INTERVAL_MS,
                "poll interval below minimum, clamping"
            );
            self.interval_ms = Self::MIN_INTERVAL_MS;
        }
        self
    }

    /// Period between checks.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a [`ReadinessPoller::wait_until`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition held on check number `ticks`.
    Ready { ticks: u64 },
    /// The cancel token fired after `ticks` checks.
    Cancelled { ticks: u64 },
    /// `max_ticks` checks ran without the condition holding.
    TimedOut { ticks: u64 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Number of checks performed.
    pub fn ticks(&self) -> u64 {
        match *self {
            Self::Ready { ticks } | Self::Cancelled { ticks } | Self::TimedOut { ticks } => ticks,
        }
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Re-checks a readiness condition on a fixed period.
///
/// Single-use: once a wait ends (ready, cancelled, or timed out) the
/// poller's token is cancelled, and any later wait returns
/// [`PollOutcome::Cancelled`] straight away.
#[derive(Debug)]
pub struct ReadinessPoller {
    config: PollConfig,
    ticks: u64,
    cancel: CancellationToken,
}

impl ReadinessPoller {
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();
        trace!(
            interval_ms = config.interval_ms,
            max_ticks = ?config.max_ticks,
            "readiness poller created"
        );
        Self {
            config,
            ticks: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a poller for a specific period with default settings.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(PollConfig::with_interval(interval))
    }

    /// A handle that stops this poller from the outside.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Checks performed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.config.interval()
    }

    /// Waits until `ready` returns `true`, checking once per period.
    ///
    /// The first check happens one full period after the call, not
    /// immediately. Missed ticks (a stalled runtime) are skipped rather
    /// than replayed in a burst.
    pub async fn wait_until<F>(&mut self, mut ready: F) -> PollOutcome
    where
        F: FnMut() -> bool,
    {
        let cancel = self.cancel.clone();
        let period = self.config.interval();
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(ticks = self.ticks, "readiness polling cancelled");
                    break PollOutcome::Cancelled { ticks: self.ticks };
                }
                _ = interval.tick() => {
                    self.ticks += 1;
                    if ready() {
                        debug!(ticks = self.ticks, "readiness condition met");
                        break PollOutcome::Ready { ticks: self.ticks };
                    }
                    if self.config.max_ticks.is_some_and(|max| self.ticks >= max) {
                        warn!(ticks = self.ticks, "readiness polling gave up");
                        break PollOutcome::TimedOut { ticks: self.ticks };
                    }
                    trace!(tick = self.ticks, "not ready yet");
                }
            }
        };

        // Stop the timer exactly once; a later external cancel is a no-op.
        cancel.cancel();
        outcome
    }
}
