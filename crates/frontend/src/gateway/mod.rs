//! Persistence for the overlay layer.
//!
//! The shared dashboard talks to the backend ([`remote`]); the single-user
//! variant keeps everything in browser storage ([`local`]).

pub mod local;
pub mod remote;

use sentinels_shared::sync::OverlaySnapshot;

/// Something the remote side reported, delivered to the dashboard's event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// New overlay content from the subscription.
    Snapshot(OverlaySnapshot),
    /// A push was stored under this revision.
    Acknowledged(u64),
    /// A push did not reach the store.
    WriteFailed(String),
    /// The subscription is gone and will not come back.
    Disconnected(String),
}
