//! HTTP client for the beacon node's light client endpoints.
//!
//! The node is an untrusted data source: everything fetched here goes
//! through lantern-core verification before it is believed. This module only
//! handles transport and decoding.

use crate::beacon_api::*;
use lantern_core::types::beacon::{
    LightClientBootstrap, LightClientFinalityUpdate, LightClientOptimisticUpdate,
    LightClientUpdate, Root, MAX_REQUEST_LIGHT_CLIENT_UPDATES,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Errors from talking to the beacon node.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] DecodeError),
}

/// A thin typed client over the beacon REST API.
pub struct BeaconApiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl BeaconApiClient {
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// `GET /eth/v1/beacon/genesis`
    pub async fn genesis_validators_root(&self) -> Result<Root, ApiError> {
        let response: ApiGenesisResponse = self.get_json("/eth/v1/beacon/genesis").await?;
        Ok(response.to_core()?)
    }

    /// `GET /eth/v1/beacon/headers/finalized` — the trusted block root for
    /// bootstrapping.
    pub async fn finalized_block_root(&self) -> Result<Root, ApiError> {
        let response: ApiFinalizedRootResponse =
            self.get_json("/eth/v1/beacon/headers/finalized").await?;
        Ok(response.to_core()?)
    }

    /// `GET /eth/v1/beacon/light_client/bootstrap/{root}`
    pub async fn bootstrap(&self, trusted_block_root: &Root) -> Result<LightClientBootstrap, ApiError> {
        let path = format!(
            "/eth/v1/beacon/light_client/bootstrap/0x{}",
            hex::encode(trusted_block_root)
        );
        let response: ApiBootstrapResponse = self.get_json(&path).await?;
        Ok(response.data.to_core()?)
    }

    /// `GET /eth/v1/beacon/light_client/updates?start_period=P&count=N`,
    /// N capped at 128. Updates come back in ascending period order.
    pub async fn updates(
        &self,
        start_period: u64,
        count: u64,
    ) -> Result<Vec<LightClientUpdate>, ApiError> {
        let count = count.min(MAX_REQUEST_LIGHT_CLIENT_UPDATES);
        let path = format!(
            "/eth/v1/beacon/light_client/updates?start_period={}&count={}",
            start_period, count
        );
        let envelopes: Vec<ApiUpdateEnvelope> = self.get_json(&path).await?;
        envelopes
            .iter()
            .map(|envelope| envelope.data.to_core().map_err(ApiError::from))
            .collect()
    }

    /// `GET /eth/v1/beacon/light_client/finality_update`
    pub async fn finality_update(&self) -> Result<LightClientFinalityUpdate, ApiError> {
        let response: ApiFinalityUpdateResponse = self
            .get_json("/eth/v1/beacon/light_client/finality_update")
            .await?;
        Ok(response.data.to_core()?)
    }

    /// `GET /eth/v1/beacon/light_client/optimistic_update`
    pub async fn optimistic_update(&self) -> Result<LightClientOptimisticUpdate, ApiError> {
        let response: ApiOptimisticUpdateResponse = self
            .get_json("/eth/v1/beacon/light_client/optimistic_update")
            .await?;
        Ok(response.data.to_core()?)
    }
}
