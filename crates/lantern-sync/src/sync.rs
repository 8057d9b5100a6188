//! The sync driver: bootstrap, historical catch-up and steady-state polling.
//!
//! One task owns the [`LightClient`] and everything that mutates it —
//! catch-up batches, optimistic polls, finality polls and the committee
//! lookahead all serialize through the `select!` loop in [`SyncDriver::run`].
//! There is no locking because there is nothing to lock: validate → compare
//! → apply always runs to completion before the next update is considered.
//!
//! Fetch failures are logged and retried on the next tick; the store is
//! never left half-mutated because mutation happens only inside
//! lantern-core's apply step.

use crate::client::{ApiError, BeaconApiClient};
use crate::clock::{self, MAX_CLOCK_DISPARITY};
use crate::config::SyncConfig;
use crate::persist;
use lantern_core::consensus::light_client::{LightClient, ProcessError, UpdateOutcome};
use lantern_core::consensus::store::{BootstrapError, StoreError};
use lantern_core::consensus::ForkSchedule;
use lantern_core::types::beacon::{
    epoch_at_slot, sync_committee_period_at_slot, Root, EPOCHS_PER_SYNC_COMMITTEE_PERIOD,
};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, sleep, Instant};
use tracing::{debug, info, warn};

/// Errors that abort the driver. Anything recoverable (a failed fetch, a
/// rejected update) is swallowed and logged instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Notifications about store progress, for downstream consumers (metrics,
/// on-chain mirrors, applications).
#[derive(Clone, Debug)]
pub enum SyncEvent {
    BootstrapComplete { slot: u64, trusted_block_root: Root },
    UpdateApplied { finalized_slot: u64, optimistic_slot: u64 },
    OptimisticHeadAdvanced { slot: u64 },
    ForceUpdateFired { finalized_slot: u64 },
}

/// Split an inclusive period range into chunks no larger than the beacon
/// API's per-request cap.
pub fn chunkify_range(from_period: u64, to_period: u64, items_per_chunk: u64) -> Vec<(u64, u64)> {
    if from_period > to_period {
        return Vec::new();
    }
    let items_per_chunk = items_per_chunk.max(1);

    let mut chunks = Vec::new();
    let mut start = from_period;
    loop {
        let end = (start + items_per_chunk - 1).min(to_period);
        chunks.push((start, end));
        if end >= to_period {
            break;
        }
        start = end + 1;
    }
    chunks
}

/// Owns the light client and feeds it updates from the beacon node.
pub struct SyncDriver {
    api: BeaconApiClient,
    client: LightClient,
    config: SyncConfig,
    events: broadcast::Sender<SyncEvent>,
    last_optimistic_slot: Option<u64>,
    last_finalized_slot: Option<u64>,
}

impl SyncDriver {
    /// Build a driver, resuming from a persisted snapshot when one exists
    /// and still validates, otherwise bootstrapping from the node's latest
    /// finalized root.
    pub async fn bootstrap(api: BeaconApiClient, config: SyncConfig) -> Result<Self, SyncError> {
        let (events, _) = broadcast::channel(64);

        if let Some(path) = config.store_path.as_deref() {
            if path.exists() {
                match persist::load(path) {
                    Ok(snapshot) => {
                        let client = LightClient::from_store(
                            snapshot.store,
                            snapshot.genesis_validators_root,
                            ForkSchedule::mainnet(),
                        )?;
                        info!(
                            finalized_slot = client.finalized_head().beacon.slot,
                            "resumed from store snapshot"
                        );
                        return Ok(Self {
                            api,
                            client,
                            config,
                            events,
                            last_optimistic_slot: None,
                            last_finalized_slot: None,
                        });
                    }
                    Err(e) => warn!("ignoring unusable store snapshot: {e}"),
                }
            }
        }

        let genesis_validators_root = api.genesis_validators_root().await?;
        let trusted_block_root = api.finalized_block_root().await?;
        info!(root = %hex::encode(trusted_block_root), "bootstrapping from finalized root");

        let bootstrap = api.bootstrap(&trusted_block_root).await?;
        let client = LightClient::bootstrap(
            &trusted_block_root,
            &bootstrap,
            genesis_validators_root,
            ForkSchedule::mainnet(),
        )?;
        let slot = client.finalized_head().beacon.slot;
        info!(slot, "bootstrap complete");

        let driver = Self {
            api,
            client,
            config,
            events,
            last_optimistic_slot: None,
            last_finalized_slot: None,
        };
        driver.emit(SyncEvent::BootstrapComplete { slot, trusted_block_root });
        Ok(driver)
    }

    pub fn light_client(&self) -> &LightClient {
        &self.client
    }

    /// Subscribe to progress notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Catch up from the store's period to the present, one bounded chunk of
    /// updates at a time, in the order the node returns them.
    pub async fn catch_up(&mut self) -> Result<(), SyncError> {
        let from = self.client.finalized_period();
        let to = sync_committee_period_at_slot(clock::current_slot(Duration::ZERO));
        info!(from, to, "starting historical catch-up");
        self.sync_range(from, to).await?;
        info!(
            finalized_slot = self.client.finalized_head().beacon.slot,
            "catch-up done"
        );
        Ok(())
    }

    /// Run the steady-state loop until the shutdown signal flips.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), SyncError> {
        let mut optimistic_ticks =
            interval(Duration::from_secs(self.config.optimistic_poll_interval_secs));
        let mut finality_ticks =
            interval(Duration::from_secs(self.config.finality_poll_interval_secs));
        let lookahead = sleep(clock::time_until_next_epoch());
        tokio::pin!(lookahead);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("shutdown signal received");
                    break;
                }
                _ = optimistic_ticks.tick() => {
                    self.evaluate_force_update()?;
                    self.poll_optimistic().await?;
                }
                _ = finality_ticks.tick() => {
                    self.evaluate_force_update()?;
                    self.poll_finality().await?;
                }
                () = &mut lookahead => {
                    self.evaluate_force_update()?;
                    self.committee_lookahead().await?;
                    lookahead.as_mut().reset(Instant::now() + clock::time_until_next_epoch());
                }
            }
        }
        Ok(())
    }

    async fn sync_range(&mut self, from_period: u64, to_period: u64) -> Result<(), SyncError> {
        for (chunk_from, chunk_to) in
            chunkify_range(from_period, to_period, self.config.updates_per_request)
        {
            let count = chunk_to + 1 - chunk_from;
            let updates = self.api.updates(chunk_from, count).await?;
            debug!(
                from = chunk_from,
                to = chunk_to,
                updates = updates.len(),
                "processing update batch"
            );
            for update in &updates {
                let current_slot = clock::current_slot(MAX_CLOCK_DISPARITY);
                let result = self.client.process_update(update, current_slot);
                if let Some(outcome) = self.settle(result)? {
                    self.after_outcome(&outcome);
                }
            }
        }
        Ok(())
    }

    /// The force-update fallback is evaluated at the start of every
    /// periodic wake.
    fn evaluate_force_update(&mut self) -> Result<(), SyncError> {
        let current_slot = clock::current_slot(Duration::ZERO);
        if let Some(finalized_slot) = self.client.force_update(current_slot)? {
            warn!(finalized_slot, "update timeout elapsed, forced best pending update");
            self.emit(SyncEvent::ForceUpdateFired { finalized_slot });
            self.snapshot();
        }
        Ok(())
    }

    async fn poll_optimistic(&mut self) -> Result<(), SyncError> {
        let update = match self.api.optimistic_update().await {
            Ok(update) => update,
            Err(e) => {
                warn!("unable to retrieve optimistic update: {e}");
                return Ok(());
            }
        };

        let attested_slot = update.attested_header.beacon.slot;
        if self.last_optimistic_slot == Some(attested_slot) {
            return Ok(());
        }
        self.last_optimistic_slot = Some(attested_slot);

        debug!(slot = attested_slot, "processing optimistic update");
        let current_slot = clock::current_slot(MAX_CLOCK_DISPARITY);
        let result = self.client.process_optimistic_update(update, current_slot);
        if let Some(outcome) = self.settle(result)? {
            self.after_outcome(&outcome);
        }
        Ok(())
    }

    async fn poll_finality(&mut self) -> Result<(), SyncError> {
        let update = match self.api.finality_update().await {
            Ok(update) => update,
            Err(e) => {
                warn!("unable to retrieve finality update: {e}");
                return Ok(());
            }
        };

        let finalized_slot = update.finalized_header.beacon.slot;
        if self.last_finalized_slot == Some(finalized_slot) {
            return Ok(());
        }
        self.last_finalized_slot = Some(finalized_slot);

        debug!(slot = finalized_slot, "processing finality update");
        let current_slot = clock::current_slot(MAX_CLOCK_DISPARITY);
        let result = self.client.process_finality_update(update, current_slot);
        if let Some(outcome) = self.settle(result)? {
            self.after_outcome(&outcome);
        }
        Ok(())
    }

    /// Close to the end of the current sync committee period, re-fetch that
    /// period's update so the next committee is known before rotation.
    async fn committee_lookahead(&mut self) -> Result<(), SyncError> {
        let current_slot = clock::current_slot(Duration::ZERO);
        let epoch_in_period = epoch_at_slot(current_slot) % EPOCHS_PER_SYNC_COMMITTEE_PERIOD;
        if EPOCHS_PER_SYNC_COMMITTEE_PERIOD - epoch_in_period > self.config.lookahead_epochs {
            return Ok(());
        }

        let period = sync_committee_period_at_slot(current_slot);
        debug!(period, "sync committee lookahead");
        match self.sync_range(period, period).await {
            Ok(()) => Ok(()),
            // A failed fetch here retries at the next epoch boundary.
            Err(SyncError::Api(e)) => {
                warn!("lookahead fetch failed: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sort rejected updates from fatal store corruption: rejections are
    /// logged and skipped, corruption aborts the driver.
    fn settle(
        &self,
        result: Result<UpdateOutcome, ProcessError>,
    ) -> Result<Option<UpdateOutcome>, SyncError> {
        match result {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) if e.is_fatal() => Err(SyncError::Process(e)),
            Err(e) => {
                warn!("update rejected: {e}");
                Ok(None)
            }
        }
    }

    fn after_outcome(&mut self, outcome: &UpdateOutcome) {
        if outcome.applied {
            info!(
                finalized_slot = outcome.finalized_slot,
                optimistic_slot = outcome.optimistic_slot,
                "finalized head advanced"
            );
            self.emit(SyncEvent::UpdateApplied {
                finalized_slot: outcome.finalized_slot,
                optimistic_slot: outcome.optimistic_slot,
            });
            self.snapshot();
        } else if outcome.optimistic_advanced {
            debug!(slot = outcome.optimistic_slot, "optimistic head advanced");
            self.emit(SyncEvent::OptimisticHeadAdvanced {
                slot: outcome.optimistic_slot,
            });
        }
    }

    fn emit(&self, event: SyncEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn snapshot(&self) {
        if let Some(path) = self.config.store_path.as_deref() {
            if let Err(e) =
                persist::save(path, self.client.genesis_validators_root(), self.client.store())
            {
                warn!("failed to snapshot store: {e}");
            }
        }
    }
}
