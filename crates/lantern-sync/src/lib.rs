//! # Lantern Sync
//!
//! The boundary between lantern-core's pure verification logic and the
//! outside world: a typed client for the beacon node's light client
//! endpoints, a strict JSON decoder for its wire format, and the driver
//! that bootstraps, catches up period by period, and then follows the chain
//! by polling for finality and optimistic updates.
//!
//! The beacon node is never trusted — every response is decoded strictly
//! and verified cryptographically by lantern-core before the store moves.

pub mod beacon_api;
pub mod client;
pub mod clock;
pub mod config;
pub mod persist;
pub mod sync;

pub use client::{ApiError, BeaconApiClient};
pub use config::{ConfigError, SyncConfig};
pub use sync::{SyncDriver, SyncError, SyncEvent};
