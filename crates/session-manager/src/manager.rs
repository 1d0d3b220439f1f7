//! Session manager: owns the in-memory session, drives the identity service
//! and keeps the session store in step with both.
//!
//! All state sits behind one short synchronous lock that is never held
//! across an `.await`. Store writes happen under that lock, so the store and
//! memory always change together and in the same order.
//!
//! Every replacement of the session (login, register, logout, expiry)
//! advances an epoch. A token refresh remembers the epoch it started under
//! and only applies its outcome if the epoch is unchanged, which keeps a
//! late refresh from resurrecting a session that was signed out meanwhile.

use crate::error::{AuthError, AuthResult, Precondition};
use crate::session::{Session, SessionSnapshot};
use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionPhase};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use identity_client::{
    Activity, ApiError, AuthResponse, Credentials, IdentityApi, RefreshResponse, TwoFactorStatus,
    User,
};
use parking_lot::Mutex;
use session_storage::SessionStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const REFRESH_FAILED: &str = "Token refresh failed";
const FORGOT_PASSWORD_FAILED: &str = "Failed to send reset email";
const RESET_PASSWORD_FAILED: &str = "Password reset failed";
const VERIFY_EMAIL_FAILED: &str = "Email verification failed";
const ACTIVITY_LOG_FAILED: &str = "Failed to fetch activities";
const TWO_FACTOR_FAILED: &str = "Failed to update 2FA";

type SharedRefresh = Shared<BoxFuture<'static, AuthResult<String>>>;

/// The one refresh request allowed in flight at a time.
struct InFlightRefresh {
    id: u64,
    result: SharedRefresh,
}

struct SessionState {
    session: Session,
    /// Advanced whenever the session is replaced or cleared.
    epoch: u64,
    ready: bool,
    machine: SessionMachine,
    refresh: Option<InFlightRefresh>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            session: Session::default(),
            epoch: 0,
            ready: false,
            machine: SessionMachine::new(),
            refresh: None,
        }
    }

    /// Install a new session. Callers waiting on a refresh of the old one
    /// still get its result, but a new refresh starts from scratch.
    fn replace(&mut self, session: Session) {
        self.session = session;
        self.epoch += 1;
        self.refresh = None;
    }

    fn transition(&mut self, input: SessionMachineInput) {
        let old_phase = SessionPhase::from(self.machine.state());
        if self.machine.consume(&input).is_err() {
            warn!(phase = ?old_phase, input = ?input, "Ignoring impossible session transition");
            return;
        }

        let new_phase = SessionPhase::from(self.machine.state());
        if old_phase != new_phase {
            debug!(old_phase = ?old_phase, new_phase = ?new_phase, "Session phase transition");
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(self.ready, &self.session)
    }
}

struct Inner {
    api: Arc<dyn IdentityApi>,
    store: SessionStore,
    state: Mutex<SessionState>,
    next_refresh_id: AtomicU64,
    status: watch::Sender<SessionSnapshot>,
}

impl Inner {
    /// Push the current status to subscribers if it changed.
    fn publish(&self, state: &SessionState) {
        let snapshot = state.snapshot();
        self.status.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Persist and install a freshly authenticated session.
    fn sign_in(&self, response: AuthResponse, operation: &'static str) -> AuthResult<User> {
        let AuthResponse {
            access_token,
            refresh_token,
            user,
        } = response;
        if access_token.is_empty() || refresh_token.is_empty() {
            warn!(operation, "Identity service returned an empty token, sign-in not applied");
            return Err(AuthError::InvalidResponse(format!(
                "{} response is missing a token",
                operation
            )));
        }
        let session = Session::signed_in(user.clone(), access_token, refresh_token);

        let mut state = self.state.lock();
        if let Err(e) = self.store.save(&session.to_persisted()) {
            warn!(operation, error = %e, "Failed to persist session, sign-in not applied");
            return Err(e.into());
        }
        state.replace(session);
        state.transition(SessionMachineInput::SignIn);
        self.publish(&state);

        info!(operation, user_id = %user.id, epoch = state.epoch, "Signed in");
        Ok(user)
    }

    fn clear(&self, input: SessionMachineInput, reason: &'static str) {
        let mut state = self.state.lock();
        self.clear_locked(&mut state, input, reason);
    }

    /// Reset memory and the store. Never fails: a store error is logged and
    /// the in-memory session is cleared regardless.
    fn clear_locked(&self, state: &mut SessionState, input: SessionMachineInput, reason: &'static str) {
        if let Err(e) = self.store.clear() {
            warn!(reason, error = %e, "Failed to clear persisted session");
        }
        state.replace(Session::default());
        state.transition(input);
        self.publish(state);
        info!(reason, epoch = state.epoch, "Session cleared");
    }

    fn detach_refresh(&self, id: u64) {
        let mut state = self.state.lock();
        if state.refresh.as_ref().map(|r| r.id) == Some(id) {
            state.refresh = None;
        }
    }

    /// Best-effort revoke of an access token. Failures are only logged.
    async fn revoke(&self, access_token: &str, reason: &'static str) {
        match self.api.logout(access_token).await {
            Ok(()) => debug!(reason, "Access token revoked"),
            Err(e) => warn!(reason, error = %e, "Revoke request failed"),
        }
    }

    /// Body of the spawned refresh task. Runs to completion even when every
    /// caller has stopped waiting.
    async fn run_refresh(
        self: Arc<Self>,
        id: u64,
        epoch: u64,
        refresh_token: String,
    ) -> AuthResult<String> {
        let outcome = self.api.refresh(&refresh_token).await;
        let (result, revoke) = self.apply_refresh(id, epoch, outcome);

        // The session is already cleared locally; the old access token is
        // revoked without the lock held.
        if let Some(access_token) = revoke {
            self.revoke(&access_token, "refresh_rejected").await;
        }
        result
    }

    /// Apply a refresh outcome under the lock. Returns the caller's result
    /// and, when the refresh token was refused, the access token to revoke.
    fn apply_refresh(
        &self,
        id: u64,
        epoch: u64,
        outcome: Result<RefreshResponse, ApiError>,
    ) -> (AuthResult<String>, Option<String>) {
        let mut state = self.state.lock();
        if state.refresh.as_ref().map(|r| r.id) == Some(id) {
            state.refresh = None;
        }

        if state.epoch != epoch {
            info!(
                started_epoch = epoch,
                current_epoch = state.epoch,
                "Discarding refresh result for a replaced session"
            );
            return (Err(Precondition::SessionChanged.into()), None);
        }

        match outcome {
            Ok(response) if response.access_token.is_empty() => {
                warn!("Refresh response carried an empty access token, session kept");
                let err = AuthError::InvalidResponse("missing access token".to_string());
                (Err(err), None)
            }
            Ok(response) => {
                let rotated = response.rotated_refresh_token().map(str::to_string);
                let mut session = state.session.clone();
                session.access_token = Some(response.access_token.clone());
                if let Some(refresh_token) = rotated.clone() {
                    session.refresh_token = Some(refresh_token);
                }

                if let Err(e) = self.store.save(&session.to_persisted()) {
                    warn!(error = %e, "Failed to persist refreshed token, refresh not applied");
                    return (Err(e.into()), None);
                }
                state.session = session;
                state.transition(SessionMachineInput::Refresh);
                self.publish(&state);

                info!(epoch, rotated = rotated.is_some(), "Access token refreshed");
                (Ok(response.access_token), None)
            }
            Err(ApiError::Rejected { status, message }) => {
                warn!(status, "Refresh token rejected, signing out");
                let access_token = state.session.present_access_token().map(str::to_string);
                self.clear_locked(&mut state, SessionMachineInput::Expire, "refresh_rejected");
                let err = AuthError::SessionExpired(message.unwrap_or_else(|| {
                    format!("identity service returned status {}", status)
                }));
                (Err(err), access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh did not complete, session kept");
                (Err(AuthError::from_api(e, REFRESH_FAILED)), None)
            }
        }
    }
}

/// Runs the logout cleanup when dropped, whether the revoke call finished,
/// failed, or the logout future was abandoned.
struct LogoutCleanup<'a> {
    inner: &'a Inner,
}

impl Drop for LogoutCleanup<'_> {
    fn drop(&mut self) {
        self.inner.clear(SessionMachineInput::SignOut, "logout");
    }
}

/// Handle to the client's session. Clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a manager with an empty, not yet hydrated session.
    pub fn new(api: Arc<dyn IdentityApi>, store: SessionStore) -> Self {
        let state = SessionState::new();
        let (status, _) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                state: Mutex::new(state),
                next_refresh_id: AtomicU64::new(1),
                status,
            }),
        }
    }

    /// Load the persisted session, once. No network call is made.
    ///
    /// A record missing any of its three fields is treated as no session; an
    /// unreadable store is logged and also treated as no session. `ready` is
    /// set in every case. If a sign-in or sign-out already happened in this
    /// process, the stored record is not applied over it.
    pub async fn initialize(&self) {
        if self.inner.state.lock().ready {
            debug!("Session already initialized");
            return;
        }

        let restored = match self.inner.store.load::<User>() {
            Ok(record) => {
                if !record.is_empty() && !record.is_complete() {
                    info!("Ignoring incomplete persisted session");
                }
                Session::from_persisted(record)
            }
            Err(e) => {
                warn!(error = %e, "Could not read persisted session, starting signed out");
                None
            }
        };

        let mut state = self.inner.state.lock();
        if state.ready {
            return;
        }
        state.ready = true;

        match restored {
            Some(session) if state.epoch == 0 => {
                let user_id = session
                    .user
                    .as_ref()
                    .map(|u| u.id.clone())
                    .unwrap_or_default();
                state.session = session;
                state.transition(SessionMachineInput::Restore);
                info!(user_id = %user_id, "Restored persisted session");
            }
            Some(_) => debug!("Session changed before hydration finished, keeping it"),
            None => debug!("No persisted session"),
        }
        self.inner.publish(&state);
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        let credentials = Credentials::new(email, password);
        let response = self.inner.api.login(&credentials).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            AuthError::from_api(e, LOGIN_FAILED)
        })?;
        self.inner.sign_in(response, "login")
    }

    /// Create an account and sign in to it. The new user's email is
    /// unverified until [`SessionManager::verify_email`] succeeds and the
    /// next sign-in reports it.
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<User> {
        let credentials = Credentials::new(email, password);
        let response = self.inner.api.register(&credentials).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            AuthError::from_api(e, REGISTRATION_FAILED)
        })?;
        self.inner.sign_in(response, "register")
    }

    /// Revoke the access token (best effort) and sign out locally.
    ///
    /// The local sign-out always happens, including when the revoke call
    /// fails or this future is dropped before it completes.
    pub async fn logout(&self) {
        let cleanup = LogoutCleanup { inner: &self.inner };

        let access_token = self
            .inner
            .state
            .lock()
            .session
            .present_access_token()
            .map(str::to_string);
        match access_token {
            Some(token) => self.inner.revoke(&token, "logout").await,
            None => debug!("No access token to revoke"),
        }

        drop(cleanup);
    }

    /// Exchange the refresh token for a new access token and return it.
    ///
    /// Concurrent callers share one request and all receive its result. A
    /// refused refresh token signs the session out and yields
    /// [`AuthError::SessionExpired`]; a network failure changes nothing.
    pub async fn refresh_access_token(&self) -> AuthResult<String> {
        let pending = {
            let mut state = self.inner.state.lock();
            let joined = state
                .refresh
                .as_ref()
                .map(|in_flight| (in_flight.id, in_flight.result.clone()));

            if let Some((id, result)) = joined {
                debug!(refresh_id = id, "Joining in-flight token refresh");
                result
            } else {
                let refresh_token = state
                    .session
                    .present_refresh_token()
                    .map(str::to_string)
                    .ok_or(Precondition::NoRefreshToken)?;
                let id = self.inner.next_refresh_id.fetch_add(1, Ordering::Relaxed);
                let epoch = state.epoch;

                let task = tokio::spawn(Arc::clone(&self.inner).run_refresh(id, epoch, refresh_token));
                let inner = Arc::clone(&self.inner);
                let result = async move {
                    match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            inner.detach_refresh(id);
                            Err(AuthError::Network(format!("token refresh task failed: {}", e)))
                        }
                    }
                }
                .boxed()
                .shared();

                state.refresh = Some(InFlightRefresh {
                    id,
                    result: result.clone(),
                });
                debug!(refresh_id = id, epoch, "Started token refresh");
                result
            }
        };

        pending.await
    }

    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        self.inner
            .api
            .forgot_password(email)
            .await
            .map_err(|e| AuthError::from_api(e, FORGOT_PASSWORD_FAILED))?;
        info!("Password reset email requested");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        if token.trim().is_empty() {
            return Err(Precondition::MissingResetToken.into());
        }
        self.inner
            .api
            .reset_password(token, new_password)
            .await
            .map_err(|e| AuthError::from_api(e, RESET_PASSWORD_FAILED))?;
        info!("Password reset completed");
        Ok(())
    }

    /// Confirm an email address. The session is left as is; the stored user
    /// picks up the verified flag on the next sign-in.
    pub async fn verify_email(&self, token: &str) -> AuthResult<()> {
        if token.trim().is_empty() {
            return Err(Precondition::MissingVerificationToken.into());
        }
        self.inner
            .api
            .verify_email(token)
            .await
            .map_err(|e| AuthError::from_api(e, VERIFY_EMAIL_FAILED))?;
        info!("Email verified");
        Ok(())
    }

    pub async fn activity_log(&self) -> AuthResult<Vec<Activity>> {
        let access_token = self.require_access_token()?;
        self.inner
            .api
            .activity_log(&access_token)
            .await
            .map_err(|e| AuthError::from_api(e, ACTIVITY_LOG_FAILED))
    }

    /// Turn two-factor authentication on or off; returns the server's view.
    pub async fn set_two_factor(&self, enabled: bool) -> AuthResult<TwoFactorStatus> {
        let access_token = self.require_access_token()?;
        let status = self
            .inner
            .api
            .set_two_factor(&access_token, enabled)
            .await
            .map_err(|e| AuthError::from_api(e, TWO_FACTOR_FAILED))?;
        info!(enabled = status.enabled, "Two-factor setting updated");
        Ok(status)
    }

    fn require_access_token(&self) -> AuthResult<String> {
        let state = self.inner.state.lock();
        match (&state.session.user, state.session.present_access_token()) {
            (Some(_), Some(token)) => Ok(token.to_string()),
            _ => Err(Precondition::NotAuthenticated.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().session.is_authenticated()
    }

    /// Whether startup hydration has run.
    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().ready
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.inner.state.lock().machine.state())
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.lock().session.user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.lock().session.access_token.clone()
    }

    /// Watch status changes. The receiver starts at the current status.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.status.subscribe()
    }
}
