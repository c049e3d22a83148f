//! Session state — the single pending-post record and the shared secret.
//!
//! The `Idle`/`Pending` distinction is a tagged state so that bound
//! surface identifiers cannot exist outside an open session. The secret
//! has process lifetime: set once, reused across sessions, never rotated
//! by a later registration.

use thiserror::Error;

use crate::protocol::SurfaceId;

/// Session state transition error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A post is already pending; triggers are rejected, not queued.
    #[error("a post is already pending")]
    AlreadyPending,
    /// The operation requires an open session.
    #[error("no post is pending")]
    NotPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingPost {
    host_surface: SurfaceId,
    /// `None` between `open()` and the posting surface finishing creation.
    app_surface: Option<SurfaceId>,
    starting_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Idle,
    Pending(PendingPost),
}

/// The singleton pending-post record.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    secret: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            secret: None,
        }
    }

    /// Whether a post is currently pending.
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Pending(_))
    }

    /// Open a session for `host`, capturing the content seed.
    ///
    /// Fails with [`SessionError::AlreadyPending`] while a post is in
    /// flight; the existing session is left untouched.
    pub fn open(
        &mut self,
        host: SurfaceId,
        starting_content: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.is_open() {
            return Err(SessionError::AlreadyPending);
        }
        self.state = SessionState::Pending(PendingPost {
            host_surface: host,
            app_surface: None,
            starting_content: starting_content.into(),
        });
        Ok(())
    }

    /// Record the posting surface once its creation completes.
    pub fn bind_app_surface(&mut self, app: SurfaceId) -> Result<(), SessionError> {
        match &mut self.state {
            SessionState::Pending(pending) => {
                pending.app_surface = Some(app);
                Ok(())
            }
            SessionState::Idle => Err(SessionError::NotPending),
        }
    }

    /// Reset to idle. Idempotent; the secret survives.
    pub fn clear(&mut self) {
        self.state = SessionState::Idle;
    }

    pub fn host_surface(&self) -> Option<SurfaceId> {
        match &self.state {
            SessionState::Pending(pending) => Some(pending.host_surface),
            SessionState::Idle => None,
        }
    }

    pub fn app_surface(&self) -> Option<SurfaceId> {
        match &self.state {
            SessionState::Pending(pending) => pending.app_surface,
            SessionState::Idle => None,
        }
    }

    /// The content seed captured at trigger time; empty when idle.
    pub fn starting_content(&self) -> &str {
        match &self.state {
            SessionState::Pending(pending) => &pending.starting_content,
            SessionState::Idle => "",
        }
    }

    /// Whether `id` is the posting surface bound to the open session.
    pub fn is_bound_app_surface(&self, id: SurfaceId) -> bool {
        self.app_surface() == Some(id)
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Register the authentication secret, keeping any existing one.
    ///
    /// Returns the effective secret, so every participant converges on a
    /// single value even when registrations race.
    pub fn set_secret_once(&mut self, token: impl Into<String>) -> &str {
        self.secret.get_or_insert_with(|| token.into())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
