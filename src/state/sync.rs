//! Identity and synchronization bookkeeping shared by the auth, session and sync services.

use std::{collections::BTreeSet, time::SystemTime};

use crate::dao::models::{CardAnswer, DeckStatsMap, UserId};

/// Who is playing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    /// Local-only play; nothing leaves the device.
    #[default]
    Anonymous,
    /// Signed in; the local store drains into the remote store.
    Authenticated(UserId),
}

impl Identity {
    /// Authenticated user, if any.
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }
}

/// Why the guard refused to start a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    /// A reconciliation is already running.
    InFlight(UserId),
    /// The user was already reconciled in this sign-in session.
    AlreadySynced,
}

/// Keeps reconciliation to a single run per signed-in session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncGuard {
    /// No reconciliation yet.
    #[default]
    Idle,
    /// A run for the user is in flight.
    InFlight(UserId),
    /// The user was reconciled successfully.
    Synced(UserId),
}

impl SyncGuard {
    /// Claim the guard for `user`. With `allow_resync` a finished run may be repeated.
    pub fn begin(&mut self, user: &UserId, allow_resync: bool) -> Result<(), GuardRejection> {
        match self {
            SyncGuard::InFlight(running) => Err(GuardRejection::InFlight(running.clone())),
            SyncGuard::Synced(done) if done == user && !allow_resync => {
                Err(GuardRejection::AlreadySynced)
            }
            _ => {
                *self = SyncGuard::InFlight(user.clone());
                Ok(())
            }
        }
    }

    /// Release the guard after a run. A failed run returns to idle so a later trigger retries.
    ///
    /// Nothing changes when the guard was reset (sign-out) while the run was in flight.
    pub fn finish(&mut self, user: &UserId, succeeded: bool) {
        if matches!(self, SyncGuard::InFlight(running) if running == user) {
            *self = if succeeded {
                SyncGuard::Synced(user.clone())
            } else {
                SyncGuard::Idle
            };
        }
    }

    /// Forget any run, e.g. on sign-out.
    pub fn reset(&mut self) {
        *self = SyncGuard::Idle;
    }

    /// Whether `user` finished a successful run since signing in.
    pub fn is_synced_for(&self, user: &UserId) -> bool {
        matches!(self, SyncGuard::Synced(done) if done == user)
    }

    /// Whether a run is in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SyncGuard::InFlight(_))
    }
}

/// Sync indicator observed by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// A reconciliation is running.
    pub syncing: bool,
    /// The signed-in user was reconciled in this session.
    pub synced: bool,
    /// Message of the last failed run, cleared when a run starts.
    pub last_error: Option<String>,
    /// End of the last successful run.
    pub last_synced_at: Option<SystemTime>,
}

/// Merged state published after a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Reconciled user.
    pub user: UserId,
    /// Merged per-deck totals.
    pub decks: DeckStatsMap,
    /// Union of local and remote answered cards.
    pub answered: BTreeSet<String>,
    /// Most recent answers first.
    pub recent: Vec<CardAnswer>,
}
