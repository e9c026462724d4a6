//! Metric-key chunking and batch retrieval

use crate::client::{decode, ControllerApi};
use crate::error::{CollectorError, Result};
use crate::models::{
    MetricBatchRequest, MetricBatchResult, MetricKeyDefinition, ResourceClass, METRICS_DATA_PATH,
};

/// Keys per batch request the metrics endpoint is known to accept
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// Split `items` into consecutive groups of at most `size`, preserving order.
/// A `size` of zero is treated as one.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Build one batch request per key chunk
pub fn build_requests(
    class: ResourceClass,
    keys: &[MetricKeyDefinition],
    resource_ids: &[String],
    chunk_size: usize,
) -> Vec<MetricBatchRequest> {
    let key_names: Vec<String> = keys.iter().map(|k| k.key.clone()).collect();
    chunk(&key_names, chunk_size)
        .into_iter()
        .map(|batch| MetricBatchRequest::new(class, batch, resource_ids.to_vec()))
        .collect()
}

/// Issues batch metric queries for a class
pub struct MetricFetcher<'a> {
    api: &'a dyn ControllerApi,
    chunk_size: usize,
}

impl<'a> MetricFetcher<'a> {
    pub fn new(api: &'a dyn ControllerApi, chunk_size: usize) -> Self {
        Self { api, chunk_size }
    }

    /// Run one query per key chunk, sequentially. The first failure aborts.
    pub async fn fetch_all(
        &self,
        class: ResourceClass,
        keys: &[MetricKeyDefinition],
        resource_ids: &[String],
    ) -> Result<Vec<MetricBatchResult>> {
        let requests = build_requests(class, keys, resource_ids, self.chunk_size);
        let mut results = Vec::with_capacity(requests.len());
        for request in &requests {
            results.push(self.fetch(request).await?);
        }
        Ok(results)
    }

    /// Issue a single batch query
    pub async fn fetch(&self, request: &MetricBatchRequest) -> Result<MetricBatchResult> {
        let body = serde_json::to_value(request).map_err(|source| CollectorError::Malformed {
            path: METRICS_DATA_PATH.to_string(),
            source,
        })?;
        let value = self.api.post_json(METRICS_DATA_PATH, &body).await?;
        decode(METRICS_DATA_PATH, value)
    }
}
