//! Void Inventory Sync - Networked Inventory State
//!
//! Server-authoritative synchronization of container slot state with
//! client-side prediction.
//!
//! # Features
//!
//! - Fixed-width slot-id wire format, bincode message framing
//! - Server role with container and item access control and silent rejection
//! - Combine requests replayed by the server, destruction notices back to clients
//! - Client role with an anti-flicker pending window and a staleness bound
//!
//! # Example
//!
//! ```ignore
//! use void_inventory_sync::prelude::*;
//!
//! let mut server = ServerSync::new(Box::new(CarrierAccess::default()));
//! let mut client = ClientSync::new(SyncConfig::default());
//!
//! for request in client.collect_requests(&mut client_world) {
//!     for broadcast in server.handle_request(&mut server_world, player, &request) {
//!         client.receive_broadcast(&mut client_world, &broadcast);
//!     }
//! }
//! client.tick(&mut client_world, dt);
//! ```

pub mod access;
mod apply;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod message;
pub mod server;

pub mod prelude {
    pub use crate::access::{AccessControl, AllowAll, CarrierAccess};
    pub use crate::client::ClientSync;
    pub use crate::codec::{decode_message, decode_slots, encode_message, encode_slots};
    pub use crate::config::SyncConfig;
    pub use crate::error::{SyncError, SyncResult};
    pub use crate::message::SyncMessage;
    pub use crate::server::ServerSync;
}

pub use prelude::*;
