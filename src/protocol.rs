//! Wire protocol types for the posting workflow.
//!
//! Two message families cross the surface boundary: `handler`-tagged
//! messages exchanged with the posting application, and the small control
//! vocabulary spoken to the host surface's content script. Everything is
//! JSON on the wire; these types pin the field names.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier of a browsing surface (tab or window).
///
/// The coordinator never interprets the value; it only compares
/// identities and hands them back to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message from a posting-application surface, discriminated by its
/// `handler` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "handler", rename_all = "camelCase")]
pub enum AppMessage {
    /// Registers the shared authentication secret.
    MessageSecret { data: String },
    /// Asks for the content seed captured at trigger time.
    InitialContent,
    /// Delivers the generated shareable link.
    PrivlyUrl { data: String },
}

/// Replies sent back to a posting-application surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "handler", rename_all = "camelCase")]
pub enum AppReply {
    /// Echo confirming which secret is in effect.
    #[serde(rename_all = "camelCase")]
    MessageSecret { secret: String },
    /// The content seed — empty for surfaces outside the active session.
    #[serde(rename_all = "camelCase")]
    InitialContent {
        secret: Option<String>,
        initial_content: String,
    },
}

/// Control notice telling the host whether a post is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingNotice {
    pub pending_post: bool,
}

/// The final result payload relayed to the host surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultNotice {
    pub privly_url: String,
    pub pending_post: bool,
}

/// A request from the host content script, discriminated by `ask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "ask", rename_all = "camelCase")]
pub enum HostRequest {
    /// Start a post with the default application.
    NewPost,
}

/// A classified inbound surface message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    App(AppMessage),
    Host(HostRequest),
}

/// Classify an inbound payload, or `None` when it belongs to neither
/// family.
pub fn parse_inbound(payload: &Value) -> Option<Inbound> {
    if let Ok(message) = serde_json::from_value::<AppMessage>(payload.clone()) {
        return Some(Inbound::App(message));
    }
    if let Ok(request) = serde_json::from_value::<HostRequest>(payload.clone()) {
        return Some(Inbound::Host(request));
    }
    None
}
