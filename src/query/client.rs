//! Indexer GraphQL client
//!
//! Thin wrapper around the explorer's GraphQL endpoint. Transport failures,
//! non-2xx statuses and GraphQL `errors` all surface as
//! [`AuditError::SourceUnavailable`]; there is no retry here.

use super::builders::{epoch_blocks_query, stakers_query};
use super::QuerySource;
use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::tables::{RawBlock, RawStake};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Client configuration
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// GraphQL URL (e.g., "https://graphql.minaexplorer.com")
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl IndexerConfig {
    pub fn from_audit_config(config: &AuditConfig) -> Self {
        Self {
            url: config.endpoint.clone(),
            timeout: config.request_timeout,
        }
    }
}

/// GraphQL client for the chain indexer
pub struct IndexerClient {
    client: Client,
    config: IndexerConfig,
}

impl IndexerClient {
    pub fn new(config: IndexerConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Send a query and return its `data` object
    async fn send(&self, query: &str) -> Result<Value> {
        let body = serde_json::json!({ "query": query });

        let response = self.client.post(&self.config.url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::SourceUnavailable(format!(
                "{} returned status {}",
                self.config.url, status
            )));
        }

        let mut json: Value = response.json().await?;

        if let Some(errors) = json.get("errors") {
            if !errors.is_null() {
                return Err(AuditError::SourceUnavailable(format!("GraphQL error: {}", errors)));
            }
        }

        match json.get_mut("data") {
            Some(data) if !data.is_null() => Ok(data.take()),
            _ => Err(AuditError::SourceUnavailable(
                "GraphQL response missing data".to_string(),
            )),
        }
    }

    /// Send a query and deserialize the array under `data.<field>`
    async fn fetch_list<T: DeserializeOwned>(&self, query: &str, field: &str) -> Result<Vec<T>> {
        let mut data = self.send(query).await?;
        let list = match data.get_mut(field) {
            Some(list) => list.take(),
            None => {
                return Err(AuditError::SourceUnavailable(format!(
                    "GraphQL response missing data.{}",
                    field
                )))
            }
        };
        let items: Vec<T> = serde_json::from_value(list)?;
        debug!(field, count = items.len(), "indexer query complete");
        Ok(items)
    }
}

impl QuerySource for IndexerClient {
    async fn epoch_blocks(&self, epoch: u32, creator: Option<&str>) -> Result<Vec<RawBlock>> {
        debug!(epoch, creator, "fetching epoch blocks");
        self.fetch_list(&epoch_blocks_query(epoch, creator), "blocks").await
    }

    async fn stakes(&self, delegate: &str, ledger_hash: &str) -> Result<Vec<RawStake>> {
        debug!(delegate, ledger_hash, "fetching stakers");
        self.fetch_list(&stakers_query(delegate, ledger_hash), "stakes").await
    }
}
