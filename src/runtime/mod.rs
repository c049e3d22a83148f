//! Surface runtime seam — the host environment's surface API.
//!
//! Platform adapters implement [`SurfaceRuntime`] to abstract surface
//! creation, focus, removal, and structured messaging away from the
//! coordinator. Runtime activity flows back over the receivers in
//! [`RuntimeChannels`], handed out when an adapter is spawned, so the
//! coordinator loop is driven without polling.

pub mod stdio;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::protocol::SurfaceId;

/// Surface runtime failure.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The transport to the host environment is gone.
    #[error("surface runtime transport closed")]
    Closed,
    /// The host environment reported that surface creation failed.
    #[error("surface creation failed: {0}")]
    CreateFailed(String),
    #[error("malformed runtime frame: {0}")]
    Frame(#[from] serde_json::Error),
}

/// Placement and focus for a newly created surface.
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    pub top: i32,
    pub left: i32,
    pub focused: bool,
}

impl Default for CreateOptions {
    /// Deterministic placement: top-left, focused.
    fn default() -> Self {
        Self {
            top: 0,
            left: 0,
            focused: true,
        }
    }
}

/// Surface activity observed in the host environment.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    /// A structured message arrived from a surface's content context.
    Message {
        sender: SurfaceId,
        /// Origin of the sending document, for namespace checks.
        origin: String,
        payload: Value,
    },
    /// A surface was removed (closed by the user or programmatically).
    Removed(SurfaceId),
}

/// A request to start a new post.
#[derive(Debug, Clone)]
pub struct Trigger {
    /// The surface the trigger came from; becomes the host surface.
    pub source: SurfaceId,
    /// Text selected at trigger time, if any.
    pub selected_text: String,
    /// Posting application name; `None` selects the configured default.
    pub app: Option<String>,
}

/// Receivers for runtime activity, handed to the coordinator loop.
pub struct RuntimeChannels {
    pub events: UnboundedReceiver<SurfaceEvent>,
    pub triggers: UnboundedReceiver<Trigger>,
}

/// Surface-level operations provided by the host environment.
///
/// Implementations MUST deliver events for a given surface in the order
/// the host environment observed them; a removal may still race a
/// message already in flight, which callers handle by re-validating
/// their own state.
#[async_trait]
pub trait SurfaceRuntime: Send + Sync {
    /// Create a new top-level surface showing `url`; resolves to its id.
    async fn create(&self, url: &str, options: CreateOptions) -> Result<SurfaceId, RuntimeError>;

    /// Reveal and focus a surface.
    async fn focus(&self, id: SurfaceId) -> Result<(), RuntimeError>;

    /// Remove a surface. Fails if it is already gone.
    async fn remove(&self, id: SurfaceId) -> Result<(), RuntimeError>;

    /// Post a structured message to a surface's content context.
    async fn send(&self, id: SurfaceId, payload: Value) -> Result<(), RuntimeError>;
}
