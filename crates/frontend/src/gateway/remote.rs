//! Shared overlay over the backend's GraphQL API.
//!
//! Writes are plain `pushOverlay` mutations. Changes arrive through the
//! `overlayChanged` subscription, spoken over a WebSocket with the
//! `graphql-transport-ws` protocol.

use dioxus::logger::tracing;
use futures_channel::mpsc::UnboundedSender;
use sentinels_shared::models::OverlayDocument;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use super::GatewayEvent;
use crate::api::{self, GraphQLError, GraphQLRequest, GraphQLResponse, OverlayChangedData};

/// WebSocket subprotocol understood by the backend.
pub const PROTOCOL: &str = "graphql-transport-ws";

/// Each socket carries exactly one operation.
const SUBSCRIPTION_ID: &str = "overlay";

/// Frames sent to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit { payload: serde_json::Value },
    Subscribe { id: String, payload: GraphQLRequest },
    Complete { id: String },
    Pong {},
}

/// Frames received from the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck {},
    Ping {},
    Pong {},
    Next {
        id: String,
        payload: GraphQLResponse<OverlayChangedData>,
    },
    Error {
        id: String,
        payload: Vec<GraphQLError>,
    },
    Complete {
        id: String,
    },
}

/// Reply to send and event to surface for one server frame.
#[derive(Debug, Default)]
pub struct Reaction {
    pub reply: Option<ClientMessage>,
    pub event: Option<GatewayEvent>,
}

pub fn decode(frame: &str) -> Result<ServerMessage, String> {
    serde_json::from_str(frame).map_err(|e| format!("malformed frame: {}", e))
}

pub fn encode(message: &ClientMessage) -> Result<String, String> {
    serde_json::to_string(message).map_err(|e| e.to_string())
}

/// Protocol step: what the client does in response to a server frame.
pub fn react(message: ServerMessage) -> Reaction {
    match message {
        ServerMessage::ConnectionAck {} => Reaction {
            reply: Some(ClientMessage::Subscribe {
                id: SUBSCRIPTION_ID.to_string(),
                payload: GraphQLRequest {
                    query: api::overlay_subscription_query(),
                    variables: None,
                },
            }),
            event: None,
        },
        ServerMessage::Ping {} => Reaction {
            reply: Some(ClientMessage::Pong {}),
            event: None,
        },
        ServerMessage::Pong {} => Reaction::default(),
        ServerMessage::Next { payload, .. } => {
            let event = match payload.into_result() {
                Ok(data) => GatewayEvent::Snapshot(data.overlay_changed),
                Err(message) => GatewayEvent::Disconnected(message),
            };
            Reaction {
                reply: None,
                event: Some(event),
            }
        }
        ServerMessage::Error { payload, .. } => {
            let message = payload
                .into_iter()
                .next()
                .map(|e| e.message)
                .unwrap_or_else(|| "subscription rejected".to_string());
            Reaction {
                reply: None,
                event: Some(GatewayEvent::Disconnected(message)),
            }
        }
        ServerMessage::Complete { .. } => Reaction {
            reply: None,
            event: Some(GatewayEvent::Disconnected(
                "subscription completed by server".to_string(),
            )),
        },
    }
}

fn send(socket: &WebSocket, message: &ClientMessage) {
    let result = encode(message).and_then(|text| {
        socket
            .send_with_str(&text)
            .map_err(|e| format!("{:?}", e))
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to send subscription frame");
    }
}

/// Send the whole overlay document. The outcome arrives as an
/// [`GatewayEvent::Acknowledged`] or [`GatewayEvent::WriteFailed`] event.
pub fn push(document: OverlayDocument, events: UnboundedSender<GatewayEvent>) {
    wasm_bindgen_futures::spawn_local(async move {
        let event = match api::push_overlay(&document).await {
            Ok(revision) => GatewayEvent::Acknowledged(revision),
            Err(e) => GatewayEvent::WriteFailed(e),
        };
        let _ = events.unbounded_send(event);
    });
}

struct Handlers {
    _on_open: Closure<dyn FnMut(web_sys::Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(web_sys::Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

/// A live `overlayChanged` subscription. Closed on [`Subscription::unsubscribe`]
/// or when dropped.
pub struct Subscription {
    socket: WebSocket,
    handlers: Option<Handlers>,
}

impl Subscription {
    /// Connect and subscribe. Snapshots and the eventual disconnect are
    /// delivered through `events`; there is no reconnect.
    pub fn open(url: &str, events: UnboundedSender<GatewayEvent>) -> Result<Self, String> {
        let socket = WebSocket::new_with_str(url, PROTOCOL)
            .map_err(|e| format!("failed to open {}: {:?}", url, e))?;

        let on_open = {
            let socket = socket.clone();
            Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
                send(
                    &socket,
                    &ClientMessage::ConnectionInit {
                        payload: serde_json::json!({}),
                    },
                );
            })
        };

        let on_message = {
            let socket = socket.clone();
            let events = events.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                let Some(frame) = event.data().as_string() else {
                    return;
                };
                let reaction = match decode(&frame) {
                    Ok(message) => react(message),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring subscription frame");
                        return;
                    }
                };
                if let Some(reply) = reaction.reply {
                    send(&socket, &reply);
                }
                if let Some(event) = reaction.event {
                    let _ = events.unbounded_send(event);
                }
            })
        };

        let on_error = {
            let events = events.clone();
            Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
                let _ = events.unbounded_send(GatewayEvent::Disconnected("socket error".to_string()));
            })
        };

        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            let _ = events.unbounded_send(GatewayEvent::Disconnected(format!(
                "socket closed (code {})",
                event.code()
            )));
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        tracing::info!(url, "Opened overlay subscription");
        Ok(Subscription {
            socket,
            handlers: Some(Handlers {
                _on_open: on_open,
                _on_message: on_message,
                _on_error: on_error,
                _on_close: on_close,
            }),
        })
    }

    /// Stop the subscription and close the socket. Idempotent.
    pub fn unsubscribe(&mut self) {
        let Some(handlers) = self.handlers.take() else {
            return;
        };
        // Detach first so the close below is not reported as a disconnect.
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onerror(None);
        self.socket.set_onclose(None);
        drop(handlers);

        if self.socket.ready_state() == WebSocket::OPEN {
            send(
                &self.socket,
                &ClientMessage::Complete {
                    id: SUBSCRIPTION_ID.to_string(),
                },
            );
        }
        if let Err(e) = self.socket.close() {
            tracing::warn!(error = ?e, "Failed to close subscription socket");
        }
        tracing::info!("Closed overlay subscription");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
