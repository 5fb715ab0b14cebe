use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;

use crate::aggregate::PageAggregator;
use crate::config::{BackendConfig, RefreshConfig};
use crate::errors::FetchError;
use crate::fetch::{HttpPageFetcher, PageFetcher};
use crate::query_builder::{ListQuery, Resource};
use crate::retry::RetryPolicy;
use crate::types::{AggregatedResult, Dataset};

/// Entry point for dashboard queries. Built from explicit configuration;
/// nothing about the backend is global.
pub struct AssetClient {
    aggregator: PageAggregator,
    retry: RetryPolicy,
    page_size: u32,
}

impl AssetClient {
    pub fn new(backend: &BackendConfig, refresh: &RefreshConfig) -> Result<Self, FetchError> {
        let fetcher = Arc::new(HttpPageFetcher::new(backend)?);
        Self::with_fetcher(fetcher, backend, refresh)
    }

    pub fn with_fetcher(
        fetcher: Arc<dyn PageFetcher>,
        backend: &BackendConfig,
        refresh: &RefreshConfig,
    ) -> Result<Self, FetchError> {
        backend.validate()?;

        info!(
            "Asset client ready: {} via {} (page size {}, max {} pages, {} retries)",
            backend.base_url,
            fetcher.name(),
            backend.page_size,
            backend.max_pages,
            refresh.retries
        );

        Ok(Self {
            aggregator: PageAggregator::new(fetcher, backend.base_url()?)
                .with_max_pages(backend.max_pages),
            retry: RetryPolicy::from_config(refresh),
            page_size: backend.page_size,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the full paged walk, retrying it from the first page on failure.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &ListQuery,
    ) -> Result<AggregatedResult<T>, FetchError> {
        let query = query.clone().with_page_size(self.page_size);
        self.retry
            .execute(|| self.aggregator.collect_all::<T>(&query))
            .await
    }

    pub async fn fetch_dataset(&self, query: &ListQuery) -> Result<Dataset, FetchError> {
        Ok(match query.resource {
            Resource::Machines => Dataset::Machines(self.fetch(query).await?),
            Resource::BreakdownMaintenance | Resource::PeriodicMaintenance => {
                Dataset::Maintenance(self.fetch(query).await?)
            }
            Resource::SpareParts => Dataset::SpareParts(self.fetch(query).await?),
            Resource::Equipment => Dataset::Equipment(self.fetch(query).await?),
            Resource::Units => Dataset::Units(self.fetch(query).await?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{machine_page, ScriptedFetcher};
    use crate::filter::Scope;
    use crate::query_builder;

    #[tokio::test]
    async fn test_fetch_dataset_dispatches_on_resource() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 5, Some(page < 2), None))));
        let client = AssetClient::with_fetcher(fetcher, &BackendConfig::default(), &RefreshConfig::default())
            .unwrap()
            .with_retry(RetryPolicy::immediate(0));

        let dataset = client
            .fetch_dataset(&query_builder::machines_by_status("Active", &Scope::Unscoped))
            .await
            .unwrap();

        assert!(matches!(dataset, Dataset::Machines(_)));
        assert_eq!(dataset.count(), 10);
    }

    #[tokio::test]
    async fn test_configured_page_size_reaches_the_url() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 1, Some(false), None))));
        let backend = BackendConfig { page_size: 25, ..Default::default() };
        let client = AssetClient::with_fetcher(fetcher.clone(), &backend, &RefreshConfig::default()).unwrap();

        let result: AggregatedResult<crate::types::Machine> = client
            .fetch(&query_builder::machines(vec![], &Scope::Unscoped))
            .await
            .unwrap();

        assert_eq!(result.count, 1);
        let urls = fetcher.urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].as_str().contains("pageSize=25"));
        assert!(urls[0].path().ends_with("/machines:list"));
    }

    #[test]
    fn test_rejects_invalid_backend() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 1, None, None))));
        let backend = BackendConfig { base_url: "   ".to_string(), ..Default::default() };
        let result = AssetClient::with_fetcher(fetcher, &backend, &RefreshConfig::default());
        assert!(matches!(result, Err(FetchError::Config(_))));
    }
}
