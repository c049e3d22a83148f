//! Coordinator — owns the session and drives the event loop.
//!
//! One task, handlers run to completion between `select!` arms, so the
//! session needs no locking. The session is constructed here at process
//! start and threaded into the router and monitor explicitly.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::broker::Broker;
use crate::config::Config;
use crate::monitor;
use crate::router::{self, Routed};
use crate::runtime::{RuntimeChannels, SurfaceEvent, SurfaceRuntime, Trigger};
use crate::session::Session;

pub struct Coordinator {
    session: Session,
    broker: Broker,
    default_app: String,
}

impl Coordinator {
    pub fn new(runtime: Arc<dyn SurfaceRuntime>, config: &Config) -> Self {
        Self {
            session: Session::new(),
            broker: Broker::new(runtime, &config.app_base_url),
            default_app: config.default_app.clone(),
        }
    }

    /// Drive the event loop until both runtime channels close.
    pub async fn run(mut self, mut channels: RuntimeChannels) {
        loop {
            tokio::select! {
                Some(trigger) = channels.triggers.recv() => self.handle_trigger(trigger).await,
                Some(event) = channels.events.recv() => self.handle_event(event).await,
                else => break,
            }
        }
        info!("runtime channels closed; shutting down");
    }

    /// Trigger entry point: open a posting surface for the requested
    /// application and record the pairing.
    pub async fn handle_trigger(&mut self, trigger: Trigger) {
        let app = trigger.app.unwrap_or_else(|| self.default_app.clone());
        if self
            .session
            .open(trigger.source, trigger.selected_text)
            .is_err()
        {
            // Rejected, not queued. The source hears about it so its UI
            // can warn the user.
            warn!(source = %trigger.source, "post already pending; trigger rejected");
            if let Err(e) = self.broker.notify_host_pending(trigger.source, true).await {
                debug!(source = %trigger.source, error = %e, "conflict notice not delivered");
            }
            return;
        }

        match self.broker.open_posting_surface(&app).await {
            Ok(surface) => {
                if self.session.bind_app_surface(surface).is_err() {
                    // The session went away while the surface was
                    // opening; don't leave an orphan window behind.
                    self.broker.close_surface(surface).await;
                    return;
                }
                if let Err(e) = self.broker.notify_host_pending(trigger.source, true).await {
                    debug!(source = %trigger.source, error = %e, "pending notice not delivered");
                }
                info!(app = %app, host = %trigger.source, surface = %surface, "posting surface opened");
            }
            Err(e) => {
                warn!(app = %app, error = %e, "posting surface could not be opened");
                self.session.clear();
            }
        }
    }

    async fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Message {
                sender,
                origin,
                payload,
            } => {
                let routed =
                    router::handle_message(&mut self.session, &self.broker, sender, &origin, payload)
                        .await;
                if let Routed::NewPost { source } = routed {
                    self.handle_trigger(Trigger {
                        source,
                        selected_text: String::new(),
                        app: None,
                    })
                    .await;
                }
            }
            SurfaceEvent::Removed(surface) => {
                monitor::handle_removed(&mut self.session, &self.broker, surface).await;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &Session {
        &self.session
    }
}
