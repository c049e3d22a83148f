//! Window/Tab Broker — surface-level operations for the posting workflow.
//!
//! A pure capability over the surface runtime: it opens the posting
//! surface, carries control notices and replies, and closes surfaces.
//! Session guarding stays with the caller — the broker performs no
//! pending-post checks of its own.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::protocol::{AppReply, PendingNotice, ResultNotice, SurfaceId};
use crate::runtime::{CreateOptions, RuntimeError, SurfaceRuntime};

/// Broker operation failure.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to open posting surface: {0}")]
    Create(#[from] RuntimeError),
    #[error("failed to message surface {surface}: {source}")]
    Send {
        surface: SurfaceId,
        #[source]
        source: RuntimeError,
    },
}

pub struct Broker {
    runtime: Arc<dyn SurfaceRuntime>,
    /// Base URL for posting-application locations, without trailing slash.
    app_base_url: String,
}

impl Broker {
    pub fn new(runtime: Arc<dyn SurfaceRuntime>, app_base_url: &str) -> Self {
        Self {
            runtime,
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The extension's own namespace. Messages claiming to carry the
    /// shared secret must originate from under it.
    pub fn app_base_url(&self) -> &str {
        &self.app_base_url
    }

    fn posting_location(&self, app_name: &str) -> String {
        format!("{}/{}/new", self.app_base_url, app_name)
    }

    /// Open the posting surface for `app_name`: deterministic top-left
    /// placement, focused. Resolves to the new surface's id.
    ///
    /// The content seed is not part of the location — the application
    /// fetches it over the `initialContent` exchange once loaded.
    pub async fn open_posting_surface(&self, app_name: &str) -> Result<SurfaceId, BrokerError> {
        let url = self.posting_location(app_name);
        let surface = self.runtime.create(&url, CreateOptions::default()).await?;
        Ok(surface)
    }

    /// Tell the host surface whether a post is in flight.
    pub async fn notify_host_pending(
        &self,
        host: SurfaceId,
        pending: bool,
    ) -> Result<(), BrokerError> {
        self.send(host, &PendingNotice {
            pending_post: pending,
        })
        .await
    }

    /// Focus the host surface and hand it the generated link.
    pub async fn deliver_result(&self, host: SurfaceId, url: &str) -> Result<(), BrokerError> {
        if let Err(e) = self.runtime.focus(host).await {
            debug!(surface = %host, error = %e, "host focus failed");
        }
        self.send(host, &ResultNotice {
            privly_url: url.to_string(),
            pending_post: false,
        })
        .await
    }

    /// Send a router reply back to a posting-application surface.
    pub async fn reply(&self, surface: SurfaceId, reply: &AppReply) -> Result<(), BrokerError> {
        self.send(surface, reply).await
    }

    /// Close a surface, swallowing failures: the usual cause is that it
    /// is already gone.
    pub async fn close_surface(&self, id: SurfaceId) {
        if let Err(e) = self.runtime.remove(id).await {
            debug!(surface = %id, error = %e, "surface close ignored");
        }
    }

    async fn send<T: serde::Serialize>(
        &self,
        surface: SurfaceId,
        payload: &T,
    ) -> Result<(), BrokerError> {
        let value = serde_json::to_value(payload).map_err(|e| BrokerError::Send {
            surface,
            source: RuntimeError::Frame(e),
        })?;
        self.runtime
            .send(surface, value)
            .await
            .map_err(|e| BrokerError::Send { surface, source: e })
    }
}
