//! # Lantern Core
//!
//! Pure Rust Ethereum beacon light client logic.
//!
//! This crate contains **no networking code** and **no async runtime**. It
//! is the verification heart of Lantern — every update a beacon node hands
//! us passes through these functions before anything is believed about the
//! chain.
//!
//! ## Trust Model
//!
//! - **Bootstrap** (`consensus::store`): one trusted block root, checked
//!   against the bootstrap header and the current sync committee's merkle
//!   proof. This is the only moment of social trust.
//!
//! - **Updates** (`consensus::verify`): every candidate is merkle-checked
//!   against the attested state root and its BLS12-381 aggregate signature
//!   is verified against the 512-member sync committee. Trusts that 2/3+ of
//!   the committee is honest — the same assumption Ethereum itself makes.
//!
//! - **Store** (`consensus::light_client`): a single owned
//!   [`consensus::store::LightClientStore`], mutated only through the state
//!   machine's entry points, never shared.
//!
//! ## Usage
//!
//! ```ignore
//! use lantern_core::consensus::{ForkSchedule, LightClient};
//!
//! let mut client = LightClient::bootstrap(
//!     &trusted_block_root,
//!     &bootstrap,
//!     genesis_validators_root,
//!     ForkSchedule::mainnet(),
//! )?;
//! client.process_update(&update, current_slot)?;
//! let head = client.finalized_head();
//! ```

pub mod consensus;
pub mod ssz;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types for convenience
pub use consensus::{
    bls::{fast_aggregate_verify, BlsError},
    fork::ForkSchedule,
    light_client::{LightClient, ProcessError, UpdateOutcome},
    store::{BootstrapError, LightClientStore, StoreError},
    verify::{validate_light_client_update, VerifyError},
};
pub use types::{beacon::*, execution::*};
