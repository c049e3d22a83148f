//! Message Router — authenticates and dispatches inbound surface messages.
//!
//! Dispatch is keyed on the message family and gated by explicit
//! capability checks: secret registration must come from the extension's
//! own namespace, and the pending draft is served only to the bound
//! posting surface. Everything else is answered defensively — empty
//! content, or silence.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::broker::Broker;
use crate::protocol::{self, AppMessage, AppReply, HostRequest, Inbound, SurfaceId};
use crate::session::Session;

/// Outcome of routing one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// The host surface asked for a default-application post.
    NewPost { source: SurfaceId },
    /// The message was consumed (or deliberately ignored).
    Done,
}

/// Whether `origin` belongs to the extension's own namespace rooted at
/// `base` — an exact match or a path under it.
pub fn is_own_origin(base: &str, origin: &str) -> bool {
    origin == base
        || origin
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Route one inbound surface message against the current session.
pub async fn handle_message(
    session: &mut Session,
    broker: &Broker,
    sender: SurfaceId,
    origin: &str,
    payload: Value,
) -> Routed {
    match protocol::parse_inbound(&payload) {
        Some(Inbound::App(AppMessage::MessageSecret { data })) => {
            if !is_own_origin(broker.app_base_url(), origin) {
                debug!(sender = %sender, origin, "secret registration from foreign origin ignored");
                return Routed::Done;
            }
            let secret = session.set_secret_once(data).to_string();
            let echo = AppReply::MessageSecret { secret };
            if let Err(e) = broker.reply(sender, &echo).await {
                debug!(sender = %sender, error = %e, "secret echo not delivered");
            }
        }
        Some(Inbound::App(AppMessage::InitialContent)) => {
            // Only the bound posting surface may read the pending draft.
            let initial_content = if session.is_bound_app_surface(sender) {
                session.starting_content().to_string()
            } else {
                String::new()
            };
            let reply = AppReply::InitialContent {
                secret: session.secret().map(str::to_string),
                initial_content,
            };
            if let Err(e) = broker.reply(sender, &reply).await {
                debug!(sender = %sender, error = %e, "initial content reply not delivered");
            }
        }
        Some(Inbound::App(AppMessage::PrivlyUrl { data })) => {
            let Some(host) = session.host_surface() else {
                debug!(sender = %sender, "result with no host bound ignored");
                return Routed::Done;
            };
            if let Err(e) = broker.deliver_result(host, &data).await {
                warn!(host = %host, error = %e, "result delivery failed");
            }
            broker.close_surface(sender).await;
            session.clear();
            info!(host = %host, "result relayed; session closed");
        }
        Some(Inbound::Host(HostRequest::NewPost)) => {
            return Routed::NewPost { source: sender };
        }
        None => {
            debug!(sender = %sender, "unhandled surface message");
        }
    }
    Routed::Done
}
