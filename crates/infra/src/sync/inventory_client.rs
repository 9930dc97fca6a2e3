use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};

use videopalace_catalog::CatalogItem;
use videopalace_core::CatalogItemId;
use videopalace_inventory::UNITS_PER_CATALOG_ITEM;

use super::{SyncError, SynchronizationDispatcher};

/// Body of `POST /inventory` on the inventory service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectCreateRequest<'a> {
    source_id: CatalogItemId,
    title: &'a str,
    total_quantity: i32,
}

/// Coupled strategy: create the inventory record through the inventory service's
/// direct-create endpoint and report the remote outcome.
///
/// No retries. The remote side applies its own creation rules; nothing here
/// deduplicates.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl InventoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }
}

#[async_trait]
impl SynchronizationDispatcher for InventoryClient {
    fn strategy(&self) -> &'static str {
        "direct"
    }

    #[instrument(skip(self, item), fields(source_id = %item.id, base_url = %self.base_url), err)]
    async fn propagate(&self, item: &CatalogItem) -> Result<(), SyncError> {
        let body = DirectCreateRequest {
            source_id: item.id,
            title: &item.title,
            total_quantity: UNITS_PER_CATALOG_ITEM,
        };

        let response = self
            .http
            .post(format!("{}/inventory", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Remote {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: Some(status.as_u16()),
                message,
            });
        }

        info!(source_id = %item.id, status = status.as_u16(), "inventory record created remotely");
        Ok(())
    }

    /// Sequential calls; the batch reports the outcome of the **last** call only.
    ///
    /// An earlier failure followed by a success yields `Ok`, and a final failure
    /// yields `Err` even when every earlier call succeeded. An empty batch is `Ok`.
    async fn propagate_all(&self, items: &[CatalogItem]) -> Result<(), SyncError> {
        let mut last = Ok(());
        for item in items {
            last = self.propagate(item).await;
            if let Err(err) = &last {
                warn!(source_id = %item.id, error = %err, "direct inventory create failed");
            }
        }
        last
    }
}
