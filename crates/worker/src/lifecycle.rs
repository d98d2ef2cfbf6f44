//! Host-side lifecycle of one worker instance.
//!
//! `installing -> installed (waiting) -> activating -> activated -> redundant`
//!
//! The host owns these transitions. A worker only influences them through
//! the two [`Host`] directives it may issue while handling an event.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Lifecycle states of a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    /// Installed and waiting for the previous worker to let go.
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Only an activated worker answers fetches for its pages.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Directives a worker may send to its host.
pub trait Host: Send + Sync {
    /// Promote this instance without waiting for the previous one to finish.
    fn skip_waiting(&self);

    /// Take control of every open page, not only new navigations.
    fn claim_clients(&self);
}

/// Recorded lifecycle of one worker instance.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<WorkerState>,
    predecessor_active: AtomicBool,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl Lifecycle {
    /// A fresh instance. `predecessor_active` is true when an older worker
    /// still controls pages, which is what makes a new one wait.
    pub fn new(predecessor_active: bool) -> Self {
        Self {
            state: Mutex::new(WorkerState::Installing),
            predecessor_active: AtomicBool::new(predecessor_active),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn transition(&self, next: WorkerState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *state;
        tracing::debug!(from = %previous, to = %next, "worker state change");
        *state = next;
    }

    pub(crate) fn release_predecessor(&self) {
        self.predecessor_active.store(false, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn controls_clients(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// An installed worker may activate once nothing holds it back.
    pub fn is_promotable(&self) -> bool {
        self.state() == WorkerState::Installed
            && (self.skip_waiting_requested() || !self.predecessor_active.load(Ordering::SeqCst))
    }
}

impl Host for Lifecycle {
    fn skip_waiting(&self) {
        tracing::info!("skip waiting requested");
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    fn claim_clients(&self) {
        tracing::info!("claiming clients");
        self.clients_claimed.store(true, Ordering::SeqCst);
    }
}
