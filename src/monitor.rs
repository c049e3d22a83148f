//! Lifecycle Monitor — teardown when a participating surface disappears.
//!
//! Removal and message notifications for the same surface may arrive in
//! either order, so everything here re-checks the session before acting
//! and leans on `clear()` being idempotent.

use tracing::{debug, info};

use crate::broker::Broker;
use crate::protocol::SurfaceId;
use crate::session::Session;

/// React to the removal of `surface`.
pub async fn handle_removed(session: &mut Session, broker: &Broker, surface: SurfaceId) {
    if !session.is_open() {
        return;
    }
    if session.is_bound_app_surface(surface) {
        if let Some(host) = session.host_surface() {
            if let Err(e) = broker.notify_host_pending(host, false).await {
                debug!(host = %host, error = %e, "pending-clear notice not delivered");
            }
        }
        session.clear();
        info!(surface = %surface, "posting surface closed; session cleared");
    } else if session.host_surface() == Some(surface) {
        if let Some(app) = session.app_surface() {
            broker.close_surface(app).await;
        }
        session.clear();
        info!(surface = %surface, "host surface closed; session cleared");
    } else {
        debug!(surface = %surface, "removal of unrelated surface ignored");
    }
}
