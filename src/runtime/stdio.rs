//! Native-messaging surface runtime — frames on stdin/stdout.
//!
//! Speaks the browser native-messaging format: each frame is a JSON
//! document preceded by a 4-byte little-endian length. A browser-side
//! shim translates commands into real tab/window calls and reports
//! surface activity back. Commands that need an answer (`createSurface`)
//! carry a request id; the shim echoes it in the matching
//! `created`/`createFailed` event.
//!
//! One reader task routes inbound frames — creation replies to their
//! waiting callers, surface activity and triggers onto the coordinator
//! channels. One writer task serializes commands. When the transport
//! closes, the reader drains any waiting creations and drops the
//! coordinator senders, which unwinds the daemon cleanly.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{Mutex, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use uuid::Uuid;

use super::{CreateOptions, RuntimeChannels, RuntimeError, SurfaceEvent, SurfaceRuntime, Trigger};
use crate::protocol::SurfaceId;

/// Largest frame accepted from the shim. Messages to a native host are
/// limited by the browser to well below this.
const MAX_FRAME_BYTES: usize = 1 << 20;

type PendingCreates = Arc<Mutex<HashMap<String, oneshot::Sender<Result<SurfaceId, String>>>>>;

#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
enum Command {
    #[serde(rename_all = "camelCase")]
    CreateSurface {
        id: String,
        url: String,
        top: i32,
        left: i32,
        focused: bool,
    },
    #[serde(rename_all = "camelCase")]
    FocusSurface { surface: SurfaceId },
    #[serde(rename_all = "camelCase")]
    RemoveSurface { surface: SurfaceId },
    #[serde(rename_all = "camelCase")]
    SendMessage { surface: SurfaceId, payload: Value },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum ShimEvent {
    #[serde(rename_all = "camelCase")]
    Created { id: String, surface: SurfaceId },
    #[serde(rename_all = "camelCase")]
    CreateFailed { id: String, error: String },
    #[serde(rename_all = "camelCase")]
    Message {
        sender: SurfaceId,
        #[serde(default)]
        origin: String,
        payload: Value,
    },
    #[serde(rename_all = "camelCase")]
    Removed { surface: SurfaceId },
    #[serde(rename_all = "camelCase")]
    Trigger {
        source: SurfaceId,
        #[serde(default)]
        selected_text: String,
        #[serde(default)]
        app: Option<String>,
    },
}

/// [`SurfaceRuntime`] backed by native-messaging frames.
pub struct NativeRuntime {
    commands: UnboundedSender<Command>,
    pending: PendingCreates,
}

impl NativeRuntime {
    /// Spawn the reader/writer tasks over the given transport and return
    /// the runtime handle plus the coordinator channels.
    pub fn spawn<R, W>(input: R, output: W) -> (Self, RuntimeChannels)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let pending: PendingCreates = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(read_loop(input, Arc::clone(&pending), event_tx, trigger_tx));
        tokio::spawn(write_loop(output, command_rx));

        (
            Self {
                commands: command_tx,
                pending,
            },
            RuntimeChannels {
                events: event_rx,
                triggers: trigger_rx,
            },
        )
    }

    fn enqueue(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands.send(command).map_err(|_| RuntimeError::Closed)
    }
}

#[async_trait::async_trait]
impl SurfaceRuntime for NativeRuntime {
    async fn create(&self, url: &str, options: CreateOptions) -> Result<SurfaceId, RuntimeError> {
        let id = Uuid::new_v4().simple().to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), reply_tx);

        let command = Command::CreateSurface {
            id: id.clone(),
            url: url.to_string(),
            top: options.top,
            left: options.left,
            focused: options.focused,
        };
        if let Err(e) = self.enqueue(command) {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match reply_rx.await {
            Ok(Ok(surface)) => Ok(surface),
            Ok(Err(error)) => Err(RuntimeError::CreateFailed(error)),
            Err(_) => Err(RuntimeError::Closed),
        }
    }

    async fn focus(&self, id: SurfaceId) -> Result<(), RuntimeError> {
        self.enqueue(Command::FocusSurface { surface: id })
    }

    async fn remove(&self, id: SurfaceId) -> Result<(), RuntimeError> {
        self.enqueue(Command::RemoveSurface { surface: id })
    }

    async fn send(&self, id: SurfaceId, payload: Value) -> Result<(), RuntimeError> {
        self.enqueue(Command::SendMessage {
            surface: id,
            payload,
        })
    }
}

fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .little_endian()
        .max_frame_length(MAX_FRAME_BYTES)
        .new_codec()
}

async fn read_loop<R>(
    input: R,
    pending: PendingCreates,
    events: UnboundedSender<SurfaceEvent>,
    triggers: UnboundedSender<Trigger>,
) where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(input, frame_codec());

    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "native-messaging read failed");
                break;
            }
        };
        let event: ShimEvent = match serde_json::from_slice(&frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed shim frame");
                continue;
            }
        };

        match event {
            ShimEvent::Created { id, surface } => match pending.lock().await.remove(&id) {
                Some(reply) => {
                    let _ = reply.send(Ok(surface));
                }
                None => tracing::debug!(id = %id, "creation reply with no waiter"),
            },
            ShimEvent::CreateFailed { id, error } => {
                if let Some(reply) = pending.lock().await.remove(&id) {
                    let _ = reply.send(Err(error));
                }
            }
            ShimEvent::Message {
                sender,
                origin,
                payload,
            } => {
                if events
                    .send(SurfaceEvent::Message {
                        sender,
                        origin,
                        payload,
                    })
                    .is_err()
                {
                    // Coordinator gone; nothing left to route to.
                    break;
                }
            }
            ShimEvent::Removed { surface } => {
                if events.send(SurfaceEvent::Removed(surface)).is_err() {
                    break;
                }
            }
            ShimEvent::Trigger {
                source,
                selected_text,
                app,
            } => {
                if triggers
                    .send(Trigger {
                        source,
                        selected_text,
                        app,
                    })
                    .is_err()
                {
                    break;
                }
            }
        }
    }

    // Fail any creation still waiting so callers observe the shutdown.
    pending.lock().await.clear();
    tracing::info!("native-messaging transport closed");
}

async fn write_loop<W>(output: W, mut commands: mpsc::UnboundedReceiver<Command>)
where
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedWrite::new(output, frame_codec());

    while let Some(command) = commands.recv().await {
        let payload = match serde_json::to_vec(&command) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unserializable command");
                continue;
            }
        };
        if let Err(e) = frames.send(Bytes::from(payload)).await {
            tracing::error!(error = %e, "native-messaging write failed");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn create_correlates_reply_by_id() {
        let (shim_out, daemon_in) = duplex(4096);
        let (daemon_out, shim_in) = duplex(4096);
        let (runtime, _channels) = NativeRuntime::spawn(daemon_in, daemon_out);

        let mut shim_rx = FramedRead::new(shim_in, frame_codec());
        let mut shim_tx = FramedWrite::new(shim_out, frame_codec());

        let shim_side = async {
            let frame = shim_rx.next().await.unwrap().unwrap();
            let command: Value = serde_json::from_slice(&frame).unwrap();
            assert_eq!(command["cmd"], "createSurface");
            assert_eq!(command["url"], "https://apps.posting.dev/ZeroBin/new");
            assert_eq!(command["top"], 0);
            assert_eq!(command["left"], 0);
            assert_eq!(command["focused"], true);

            let id = command["id"].as_str().unwrap();
            let reply =
                serde_json::to_vec(&json!({"event": "created", "id": id, "surface": 9})).unwrap();
            shim_tx.send(Bytes::from(reply)).await.unwrap();
        };

        let (created, ()) = tokio::join!(
            runtime.create(
                "https://apps.posting.dev/ZeroBin/new",
                CreateOptions::default()
            ),
            shim_side
        );
        assert_eq!(created.unwrap(), SurfaceId(9));
    }

    #[tokio::test]
    async fn failed_creation_reports_the_shim_error() {
        let (shim_out, daemon_in) = duplex(4096);
        let (daemon_out, shim_in) = duplex(4096);
        let (runtime, _channels) = NativeRuntime::spawn(daemon_in, daemon_out);

        let mut shim_rx = FramedRead::new(shim_in, frame_codec());
        let mut shim_tx = FramedWrite::new(shim_out, frame_codec());

        let shim_side = async {
            let frame = shim_rx.next().await.unwrap().unwrap();
            let command: Value = serde_json::from_slice(&frame).unwrap();
            let id = command["id"].as_str().unwrap();
            let reply = serde_json::to_vec(
                &json!({"event": "createFailed", "id": id, "error": "window blocked"}),
            )
            .unwrap();
            shim_tx.send(Bytes::from(reply)).await.unwrap();
        };

        let (created, ()) = tokio::join!(
            runtime.create("https://apps.posting.dev/Message/new", CreateOptions::default()),
            shim_side
        );
        match created {
            Err(RuntimeError::CreateFailed(error)) => assert_eq!(error, "window blocked"),
            other => panic!("expected CreateFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn routes_surface_activity_and_triggers() {
        let (shim_out, daemon_in) = duplex(4096);
        let (daemon_out, _shim_in) = duplex(4096);
        let (_runtime, mut channels) = NativeRuntime::spawn(daemon_in, daemon_out);

        let mut shim_tx = FramedWrite::new(shim_out, frame_codec());
        for frame in [
            json!({"event": "message", "sender": 9, "origin": "https://apps.posting.dev/Message/new", "payload": {"handler": "initialContent"}}),
            json!({"event": "removed", "surface": 9}),
            json!({"event": "trigger", "source": 7, "selectedText": "hello", "app": "ZeroBin"}),
        ] {
            shim_tx
                .send(Bytes::from(serde_json::to_vec(&frame).unwrap()))
                .await
                .unwrap();
        }

        match channels.events.recv().await.unwrap() {
            SurfaceEvent::Message {
                sender,
                origin,
                payload,
            } => {
                assert_eq!(sender, SurfaceId(9));
                assert_eq!(origin, "https://apps.posting.dev/Message/new");
                assert_eq!(payload, json!({"handler": "initialContent"}));
            }
            other => panic!("expected message event, got {other:?}"),
        }
        match channels.events.recv().await.unwrap() {
            SurfaceEvent::Removed(surface) => assert_eq!(surface, SurfaceId(9)),
            other => panic!("expected removed event, got {other:?}"),
        }

        let trigger = channels.triggers.recv().await.unwrap();
        assert_eq!(trigger.source, SurfaceId(7));
        assert_eq!(trigger.selected_text, "hello");
        assert_eq!(trigger.app.as_deref(), Some("ZeroBin"));
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let (shim_out, daemon_in) = duplex(4096);
        let (daemon_out, _shim_in) = duplex(4096);
        let (_runtime, mut channels) = NativeRuntime::spawn(daemon_in, daemon_out);

        let mut shim_tx = FramedWrite::new(shim_out, frame_codec());
        shim_tx.send(Bytes::from_static(b"not json")).await.unwrap();
        shim_tx
            .send(Bytes::from(
                serde_json::to_vec(&json!({"event": "removed", "surface": 3})).unwrap(),
            ))
            .await
            .unwrap();

        match channels.events.recv().await.unwrap() {
            SurfaceEvent::Removed(surface) => assert_eq!(surface, SurfaceId(3)),
            other => panic!("expected removed event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn frames_use_little_endian_length_prefix() {
        let (_shim_out, daemon_in) = duplex(1024);
        let (daemon_out, mut shim_in) = duplex(1024);
        let (runtime, _channels) = NativeRuntime::spawn(daemon_in, daemon_out);

        runtime.focus(SurfaceId(4)).await.unwrap();

        let mut header = [0u8; 4];
        shim_in.read_exact(&mut header).await.unwrap();
        let len = u32::from_le_bytes(header) as usize;
        let mut payload = vec![0u8; len];
        shim_in.read_exact(&mut payload).await.unwrap();

        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value, json!({"cmd": "focusSurface", "surface": 4}));
    }

    #[tokio::test]
    async fn transport_eof_closes_coordinator_channels() {
        let (shim_out, daemon_in) = duplex(1024);
        let (daemon_out, _shim_in) = duplex(1024);
        let (_runtime, mut channels) = NativeRuntime::spawn(daemon_in, daemon_out);

        drop(shim_out);

        assert!(channels.events.recv().await.is_none());
        assert!(channels.triggers.recv().await.is_none());
    }
}
