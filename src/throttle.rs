//! Announcement throttle.
//!
//! `SharedThrottle` owns the only cross-frame state of the pipeline: when
//! the last announcement was accepted and whether an utterance is in
//! flight. Both fields sit behind one mutex, and the accept path checks and
//! sets them inside the same critical section. Two callers racing to
//! announce can therefore never both win.
//!
//! A rejected candidate is dropped. There is no queue and no retry: an
//! object seen during the cooldown window is only announced if it is still
//! detected on a later frame after the window reopens. Callers and tests
//! must treat this as a non-guarantee of delivery, not as a fault.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Snapshot of the throttle's state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThrottleState {
    pub last_announcement: Option<Instant>,
    pub speaking: bool,
}

/// Outcome of asking the throttle for permission to speak.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    Accepted,
    /// The previous announcement is too recent.
    CoolingDown { remaining: Duration },
    /// An utterance is still in flight.
    Speaking,
}

impl ThrottleDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ThrottleDecision::Accepted)
    }
}

struct Shared {
    state: Mutex<ThrottleState>,
    idle: Condvar,
}

/// Cloneable handle to the throttle state.
#[derive(Clone)]
pub struct SharedThrottle {
    shared: Arc<Shared>,
    cooldown: Duration,
}

impl SharedThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ThrottleState::default()),
                idle: Condvar::new(),
            }),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Accept iff the cooldown has strictly elapsed and nothing is speaking.
    ///
    /// On accept the announcement time is set to `now` and the state flips
    /// to speaking before the lock is released. The caller then owns the
    /// speaking slot and must hand the message to the dispatcher or call
    /// `release`.
    pub fn try_acquire(&self, now: Instant) -> ThrottleDecision {
        let mut state = self.lock();
        if state.speaking {
            return ThrottleDecision::Speaking;
        }
        if let Some(last) = state.last_announcement {
            let elapsed = now.saturating_duration_since(last);
            if elapsed <= self.cooldown {
                return ThrottleDecision::CoolingDown {
                    remaining: self.cooldown - elapsed,
                };
            }
        }
        state.last_announcement = Some(now);
        state.speaking = true;
        ThrottleDecision::Accepted
    }

    /// Return to idle. The announcement timestamp is left untouched.
    pub fn release(&self) {
        let mut state = self.lock();
        state.speaking = false;
        self.shared.idle.notify_all();
    }

    pub fn snapshot(&self) -> ThrottleState {
        *self.lock()
    }

    pub fn is_speaking(&self) -> bool {
        self.lock().speaking
    }

    /// Block until nothing is speaking or `timeout` passes. Returns true when idle.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (state, _) = self
            .shared
            .idle
            .wait_timeout_while(guard, timeout, |state| state.speaking)
            .unwrap_or_else(PoisonError::into_inner);
        !state.speaking
    }

    // Poisoning cannot leave the two plain fields half-written.
    fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SharedThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedThrottle")
            .field("cooldown", &self.cooldown)
            .field("state", &self.snapshot())
            .finish()
    }
}
