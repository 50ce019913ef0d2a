//! Session lifecycle ownership.
//!
//! [`SessionManager`] holds the single authoritative session-or-absence
//! value. It is mutated only through the four protocol operations (login,
//! register, restore, logout) plus [`SessionManager::hydrate`] for
//! reinstalling a persisted session at startup; no other component mutates
//! it. Transitions are atomic from the caller's perspective: observers
//! never see a half-applied session.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Mutex, MutexGuard};

use crate::config::SessionConfig;
use crate::error::{AuthKitError, AuthResult};
use crate::types::{Bookmark, DeviceInfo, ProfileInfo, ProgressEntry, Session, UserRecord};

mod protocol;


/// The four session operations, used to key the single-flight guard and to
/// label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    /// Establish a session for an existing account.
    Login,
    /// Create an account and establish a session.
    Register,
    /// Refresh account data on an existing session.
    Restore,
    /// Tear down the session.
    Logout,
}

/// The session-store collaborator.
///
/// Receives lifecycle callbacks so the host application can persist and
/// synchronize session data. Implementations must not call back into the
/// manager from within a callback.
pub trait SessionSink: Send + Sync {
    /// A session was established by login or registration.
    ///
    /// `encoded_seed` is the payload seed in base64, ready for the store
    /// to persist alongside the session fields.
    fn on_login(&self, session: &Session, user: &UserRecord, encoded_seed: &str);

    /// The session was torn down.
    fn on_logout(&self);

    /// A restore refreshed the account data on an existing session.
    fn on_restore(&self, user: &UserRecord, progress: &[ProgressEntry], bookmarks: &[Bookmark]);
}

/// A sink that ignores every callback. Useful for tools and tests that
/// only need the manager's own state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SessionSink for NullSink {
    fn on_login(&self, _session: &Session, _user: &UserRecord, _encoded_seed: &str) {}

    fn on_logout(&self) {}

    fn on_restore(&self, _user: &UserRecord, _progress: &[ProgressEntry], _bookmarks: &[Bookmark]) {
    }
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    user: Option<UserRecord>,
}

/// One guard per operation kind: a second concurrent call of the same kind
/// is rejected instead of racing the first.
#[derive(Default)]
struct OperationGuards {
    login: Mutex<()>,
    register: Mutex<()>,
    restore: Mutex<()>,
    logout: Mutex<()>,
}

impl OperationGuards {
    const fn for_operation(&self, operation: Operation) -> &Mutex<()> {
        match operation {
            Operation::Login => &self.login,
            Operation::Register => &self.register,
            Operation::Restore => &self.restore,
            Operation::Logout => &self.logout,
        }
    }
}

/// Owns the authenticated state and exposes the session operations.
///
/// Generic over the [`AccountBackend`](crate::backend::AccountBackend)
/// implementation so tests can drive the protocol against in-memory
/// doubles.
pub struct SessionManager<B> {
    pub(crate) backend: B,
    pub(crate) sink: std::sync::Arc<dyn SessionSink>,
    pub(crate) device: DeviceInfo,
    pub(crate) config: SessionConfig,
    state: RwLock<State>,
    guards: OperationGuards,
}

impl<B> SessionManager<B> {
    /// Creates a manager with no established session.
    pub fn new(
        backend: B,
        device: DeviceInfo,
        sink: std::sync::Arc<dyn SessionSink>,
        config: SessionConfig,
    ) -> Self {
        Self {
            backend,
            sink,
            device,
            config,
            state: RwLock::new(State::default()),
            guards: OperationGuards::default(),
        }
    }

    /// Whether a session is currently established.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_state().session.is_some()
    }

    /// Returns the profile of the authenticated user, if any.
    #[must_use]
    pub fn current_profile(&self) -> Option<ProfileInfo> {
        self.read_state().user.as_ref().map(|u| u.profile.clone())
    }

    /// Returns a snapshot of the current session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.read_state().session.clone()
    }

    /// Reinstalls a session previously persisted by the store
    /// collaborator, without any network call and without emitting sink
    /// callbacks. Typically followed by a
    /// [`restore`](SessionManager::restore).
    pub fn hydrate(&self, session: Session, user: UserRecord) {
        let mut state = self.write_state();
        state.session = Some(session);
        state.user = Some(user);
    }

    /// Acquires the single-flight guard for `operation`.
    fn begin(&self, operation: Operation) -> AuthResult<MutexGuard<'_, ()>> {
        self.guards
            .for_operation(operation)
            .try_lock()
            .map_err(|_| AuthKitError::OperationInProgress { operation })
    }

    fn install(&self, session: Session, user: UserRecord) {
        let mut state = self.write_state();
        state.session = Some(session);
        state.user = Some(user);
    }

    fn update_user(&self, user: UserRecord) {
        self.write_state().user = Some(user);
    }

    fn clear(&self) {
        let mut state = self.write_state();
        state.session = None;
        state.user = None;
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B> std::fmt::Debug for SessionManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("authenticated", &self.is_authenticated())
            .field("device", &self.device.device_id)
            .finish()
    }
}
