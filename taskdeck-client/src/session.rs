//! Session manager
//!
//! Owns the current user and the persisted credential (token + user record).
//! At most one user is signed in at a time, and the persisted token and user
//! are written and cleared together.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --restore--> Restoring --ok--> Authenticated
//!                                     \--fail--> Anonymous
//! Anonymous     --login/register ok--> Authenticated
//! Authenticated --logout | 401 anywhere--> Anonymous
//! ```
//!
//! Status transitions are published on a [`watch`] channel; discrete events
//! ([`SessionEvent`]) on a [`broadcast`] channel. A 401 observed by the
//! gateway evicts the session through [`SessionHandle::evict`] and emits
//! [`SessionEvent::LoginRequired`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskdeck_client::app::AppContext;
//! use taskdeck_client::config::ClientConfig;
//! use taskdeck_shared::models::LoginCredentials;
//! use taskdeck_shared::storage::MemoryStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let app = AppContext::new(
//!     ClientConfig::for_base_url("http://localhost:3000/api"),
//!     Arc::new(MemoryStore::new()),
//! )?;
//!
//! app.session.restore().await;
//! if !app.session.is_authenticated() {
//!     let credentials = LoginCredentials {
//!         email: "ada@example.com".to_string(),
//!         password: "secret1".to_string(),
//!     };
//!     let user = app.session.login(&credentials).await?;
//!     println!("Signed in as {}", user.name);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use taskdeck_shared::models::{
    ApiResponse, AuthPayload, AuthResponse, LoginCredentials, RegisterData, RegistrationForm,
    User, UserUpdate,
};
use taskdeck_shared::storage::SessionStore;
use taskdeck_shared::validation;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::{ClientError, ClientResult, OperationError, OperationResult};
use crate::gateway::{expect_data, Gateway};

/// Fallback shown when login fails without a server message
pub const LOGIN_FAILED: &str = "Failed to log in";

/// Fallback shown when registration fails without a server message
pub const REGISTER_FAILED: &str = "Failed to register";

const EVENT_CAPACITY: usize = 32;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Restore has not started
    Uninitialized,

    /// Validating a persisted token
    Restoring,

    /// A user is signed in
    Authenticated,

    /// Nobody is signed in
    Anonymous,
}

impl SessionStatus {
    /// True once restore has finished, whatever the outcome
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionStatus::Authenticated | SessionStatus::Anonymous)
    }
}

/// Discrete session notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login, registration or restore established a session
    SignedIn { user_id: String },

    /// The user logged out
    SignedOut,

    /// The server rejected the credential; the user must log in again
    LoginRequired,
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    error: Option<String>,
    loading: bool,
}

struct SessionShared {
    store: SessionStore,
    state: RwLock<SessionState>,
    status: watch::Sender<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionShared {
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SessionStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
    }
}

/// Narrow view of the session handed to the gateway
///
/// Exposes the current token and the 401 eviction path, nothing else.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    /// Creates the session state backed by `store`
    pub fn new(store: SessionStore) -> Self {
        let (status, _) = watch::channel(SessionStatus::Uninitialized);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(SessionShared {
                store,
                state: RwLock::new(SessionState::default()),
                status,
                events,
            }),
        }
    }

    /// Persisted bearer token, if any
    ///
    /// A storage failure is logged and treated as "no token".
    pub fn token(&self) -> Option<String> {
        match self.shared.store.token() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted token");
                None
            }
        }
    }

    /// Drops the session after the server rejected the credential
    ///
    /// Clears the persisted token and user, forgets the in-memory user, marks
    /// the session anonymous and emits [`SessionEvent::LoginRequired`].
    /// Completes before returning, so the caller's error reaches its own
    /// handler only after the session is gone.
    pub fn evict(&self) {
        self.shared.clear_persisted();

        let previous = self.shared.write().user.take();
        self.shared.set_status(SessionStatus::Anonymous);

        tracing::info!(
            user_id = previous.as_ref().map(|u| u.id.as_str()),
            "Session evicted"
        );
        self.shared.emit(SessionEvent::LoginRequired);
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("status", &*self.shared.status.borrow())
            .finish_non_exhaustive()
    }
}

/// Session manager
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<SessionShared>,
    gateway: Gateway,
}

impl SessionManager {
    /// Creates a manager over the state behind `handle`
    ///
    /// `gateway` should be the gateway that was given `handle`.
    pub fn new(handle: SessionHandle, gateway: Gateway) -> Self {
        Self {
            shared: handle.shared,
            gateway,
        }
    }

    /// Re-establishes a persisted session
    ///
    /// Without a persisted token the session becomes anonymous with no
    /// request made. Otherwise the token is checked against `GET /auth/me`:
    /// success makes the session authenticated with the fresh user record;
    /// any failure clears the persisted credential and leaves the session
    /// anonymous.
    ///
    /// Only runs from [`SessionStatus::Uninitialized`]; later calls return
    /// immediately. A logout or login that lands while the check is in
    /// flight wins over its result. Errors are logged, not returned.
    pub async fn restore(&self) {
        let started = self.shared.status.send_if_modified(|status| {
            if *status != SessionStatus::Uninitialized {
                return false;
            }
            *status = SessionStatus::Restoring;
            true
        });
        if !started {
            tracing::debug!("Session restore already ran");
            return;
        }

        let token = match self.shared.store.token() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let Some(token) = token else {
            tracing::debug!("No persisted session");
            self.shared.set_status(SessionStatus::Anonymous);
            return;
        };

        let result = self
            .gateway
            .get::<ApiResponse<User>>("/auth/me")
            .await
            .and_then(expect_data);

        match result {
            Ok(user) => {
                let user_id = user.id.clone();
                {
                    let mut state = self.shared.write();

                    // A logout or login while we waited owns the session now
                    let still_restoring = *self.shared.status.borrow() == SessionStatus::Restoring;
                    let same_token =
                        self.shared.store.token().ok().flatten().as_deref() == Some(token.as_str());
                    if !still_restoring || !same_token {
                        tracing::debug!(user_id = %user_id, "Session changed during restore, discarding result");
                        return;
                    }

                    if let Err(e) = self.shared.store.save_user(&user) {
                        tracing::warn!(error = %e, "Failed to persist refreshed user");
                    }
                    state.user = Some(user);
                    self.shared.set_status(SessionStatus::Authenticated);
                }

                tracing::info!(user_id = %user_id, "Session restored");
                self.shared.emit(SessionEvent::SignedIn { user_id });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persisted session is no longer valid");

                // A login may have replaced the credential while we waited
                if self.shared.store.token().ok().flatten().as_deref() == Some(token.as_str()) {
                    self.shared.clear_persisted();
                }
                let signed_in = self.shared.read().user.is_some();
                if !signed_in {
                    self.shared.set_status(SessionStatus::Anonymous);
                }
            }
        }
    }

    /// Runs [`restore`](Self::restore) in the background
    pub fn spawn_restore(&self) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move { session.restore().await })
    }

    /// True once restore has settled
    pub fn is_ready(&self) -> bool {
        self.status().is_ready()
    }

    /// Waits until restore has settled
    pub async fn wait_until_ready(&self) {
        let mut status = self.shared.status.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = status.wait_for(SessionStatus::is_ready).await;
    }

    /// Authenticates with email and password
    ///
    /// On success the token and user are persisted and the session becomes
    /// authenticated. On failure the session is left as it was and the
    /// returned error carries the server's message or `"Failed to log in"`.
    pub async fn login(&self, credentials: &LoginCredentials) -> OperationResult<User> {
        tracing::debug!(email = %credentials.email, "Logging in");
        self.begin();

        let result = self
            .gateway
            .post::<_, AuthResponse>("/auth/login", credentials)
            .await
            .and_then(expect_data);

        self.finish_authentication(result, LOGIN_FAILED)
    }

    /// Creates an account and signs in as it
    ///
    /// Same outcome rules as [`login`](Self::login); the fallback message is
    /// `"Failed to register"`.
    pub async fn register(&self, data: &RegisterData) -> OperationResult<User> {
        tracing::debug!(email = %data.email, "Registering");
        self.begin();

        let result = self
            .gateway
            .post::<_, AuthResponse>("/auth/register", data)
            .await
            .and_then(expect_data);

        self.finish_authentication(result, REGISTER_FAILED)
    }

    /// Validates a registration form locally, then registers
    ///
    /// A form that fails validation never reaches the network.
    pub async fn register_form(&self, form: RegistrationForm) -> OperationResult<User> {
        if let Err(details) = validation::check(&form) {
            let err = OperationError::new(ClientError::Validation(details), REGISTER_FAILED);
            self.shared.write().error = Some(err.message.clone());
            return Err(err);
        }

        self.register(&form.into_register_data()).await
    }

    /// Signs out locally
    ///
    /// Clears the persisted token and user and forgets the current user. No
    /// request is made. Calling it again is harmless.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the persisted session could not be
    /// cleared. The in-memory session is cleared regardless.
    pub fn logout(&self) -> ClientResult<()> {
        let cleared = self.shared.store.clear();

        let previous = self.shared.write().user.take();
        self.shared.set_status(SessionStatus::Anonymous);

        if let Some(user) = previous {
            tracing::info!(user_id = %user.id, "Signed out");
            self.shared.emit(SessionEvent::SignedOut);
        }

        cleared.map_err(ClientError::from)
    }

    /// Merges `update` into the current user and persists the result
    ///
    /// Returns `Ok(None)` and changes nothing when nobody is signed in.
    pub fn update_user(&self, update: UserUpdate) -> ClientResult<Option<User>> {
        let mut state = self.shared.write();
        let Some(current) = state.user.as_ref() else {
            tracing::debug!("Ignoring user update without a session");
            return Ok(None);
        };

        let mut merged = current.clone();
        merged.apply(update);
        self.shared.store.save_user(&merged)?;
        state.user = Some(merged.clone());

        Ok(Some(merged))
    }

    /// Signed-in user, if any
    pub fn current_user(&self) -> Option<User> {
        self.shared.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.read().user.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status.borrow()
    }

    /// Message of the last failed login or registration
    pub fn error(&self) -> Option<String> {
        self.shared.read().error.clone()
    }

    /// True while a login or registration is in flight
    pub fn is_loading(&self) -> bool {
        self.shared.read().loading
    }

    /// Subscribes to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Subscribes to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    fn begin(&self) {
        let mut state = self.shared.write();
        state.loading = true;
        state.error = None;
    }

    fn finish_authentication(
        &self,
        result: ClientResult<AuthPayload>,
        fallback: &str,
    ) -> OperationResult<User> {
        let outcome = result.and_then(|payload| {
            self.shared.store.save(&payload.token, &payload.user)?;
            Ok(payload.user)
        });

        match outcome {
            Ok(user) => {
                {
                    let mut state = self.shared.write();
                    state.user = Some(user.clone());
                    state.loading = false;
                }
                self.shared.set_status(SessionStatus::Authenticated);

                tracing::info!(user_id = %user.id, "Signed in");
                self.shared.emit(SessionEvent::SignedIn {
                    user_id: user.id.clone(),
                });
                Ok(user)
            }
            Err(cause) => {
                let err = OperationError::new(cause, fallback);
                tracing::warn!(error = %err.cause, "Authentication failed");

                let mut state = self.shared.write();
                state.error = Some(err.message.clone());
                state.loading = false;
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.status())
            .field("user", &self.current_user().map(|u| u.id))
            .finish_non_exhaustive()
    }
}
