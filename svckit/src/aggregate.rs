use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::DEFAULT_MAX_PAGES;
use crate::errors::FetchError;
use crate::fetch::PageFetcher;
use crate::metrics;
use crate::query_builder::ListQuery;
use crate::types::AggregatedResult;

/// Walks a list endpoint page by page and concatenates everything into one
/// snapshot. Pages are requested strictly in order, one at a time.
pub struct PageAggregator {
    fetcher: Arc<dyn PageFetcher>,
    base_url: Url,
    max_pages: u32,
}

impl PageAggregator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: Url) -> Self {
        Self {
            fetcher,
            base_url,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Hard cap on requests per aggregation, applied even when the backend
    /// keeps reporting more pages.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub async fn collect_all<T: DeserializeOwned>(
        &self,
        query: &ListQuery,
    ) -> Result<AggregatedResult<T>, FetchError> {
        let resource = query.resource.name();
        let result = self
            .collect_raw(query)
            .await
            .and_then(|items| decode_items(items).map(AggregatedResult::from_items));

        metrics::record_aggregation(resource, result.is_ok());
        result
    }

    /// Collects raw items. Any page failure aborts the whole walk; nothing
    /// collected so far is returned.
    pub async fn collect_raw(&self, query: &ListQuery) -> Result<Vec<Value>, FetchError> {
        let resource = query.resource.name();
        let mut collected: Vec<Value> = Vec::new();
        let mut reported_count;
        let mut page: u32 = 1;

        loop {
            let url = query.page_url(&self.base_url, page)?;

            let start = Instant::now();
            let outcome = self.fetcher.fetch_page(&url).await;
            metrics::record_page_fetch(resource, outcome.is_ok(), start.elapsed().as_secs_f64());

            let envelope = outcome.map_err(|e| {
                warn!("{} page {} failed via {}: {}", resource, page, self.fetcher.name(), e);
                e
            })?;

            let has_more = envelope.has_more_after(page);
            reported_count = envelope.meta.count;
            collected.extend(envelope.data);
            page += 1;

            if !has_more {
                break;
            }
            if page > self.max_pages {
                warn!(
                    "{} still reports more pages after {} requests, stopping",
                    resource, self.max_pages
                );
                break;
            }
        }

        if let Some(reported) = reported_count {
            if reported as usize != collected.len() {
                debug!(
                    "{}: backend reported count {} but {} items were collected",
                    resource,
                    reported,
                    collected.len()
                );
                metrics::record_count_mismatch(resource);
            }
        }

        debug!("{}: collected {} items over {} pages", resource, collected.len(), page - 1);
        Ok(collected)
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, FetchError> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(FetchError::from))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::filter::Scope;
    use crate::query_builder;
    use crate::types::{Machine, PageEnvelope, PageMeta};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves pages from a script and records every requested page number.
    pub(crate) struct ScriptedFetcher {
        script: Box<dyn Fn(u32) -> Result<PageEnvelope<Value>, FetchError> + Send + Sync>,
        pub(crate) requested: Mutex<Vec<u32>>,
        pub(crate) urls: Mutex<Vec<Url>>,
    }

    impl ScriptedFetcher {
        pub(crate) fn new(
            script: impl Fn(u32) -> Result<PageEnvelope<Value>, FetchError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                script: Box::new(script),
                requested: Mutex::new(Vec::new()),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }

        pub(crate) fn urls(&self) -> Vec<Url> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, url: &Url) -> Result<PageEnvelope<Value>, FetchError> {
            let page: u32 = url
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap();
            self.requested.lock().unwrap().push(page);
            self.urls.lock().unwrap().push(url.clone());
            (self.script)(page)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub(crate) fn machine_page(page: u32, size: usize, has_next: Option<bool>, total: Option<u32>) -> PageEnvelope<Value> {
        let data = (0..size)
            .map(|i| {
                let id = (page as usize) * 1000 + i;
                json!({"id": id, "machine_id": format!("M-{}", id)})
            })
            .collect();
        PageEnvelope {
            data,
            meta: PageMeta {
                count: Some(999),
                page,
                page_size: size as u32,
                total_pages: total,
                has_next,
            },
        }
    }

    fn base() -> Url {
        Url::parse("http://backend.test/api/").unwrap()
    }

    fn query() -> ListQuery {
        query_builder::machines(vec![], &Scope::Unscoped)
    }

    #[tokio::test]
    async fn test_has_next_drives_exactly_n_requests_in_order() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| {
            Ok(machine_page(page, 3, Some(page < 4), None))
        }));
        let aggregator = PageAggregator::new(fetcher.clone(), base());

        let result: AggregatedResult<Machine> = aggregator.collect_all(&query()).await.unwrap();

        assert_eq!(fetcher.requests(), vec![1, 2, 3, 4]);
        assert_eq!(result.items.len(), 12);
        assert_eq!(result.items[0].machine_id, "M-1000");
        assert_eq!(result.items[3].machine_id, "M-2000");
        assert_eq!(result.items[11].machine_id, "M-4002");
    }

    #[tokio::test]
    async fn test_total_pages_continues_without_has_next() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 2, None, Some(3)))));
        let aggregator = PageAggregator::new(fetcher.clone(), base());

        let result: AggregatedResult<Machine> = aggregator.collect_all(&query()).await.unwrap();

        assert_eq!(fetcher.requests(), vec![1, 2, 3]);
        assert_eq!(result.count, 6);
    }

    #[tokio::test]
    async fn test_endless_has_next_stops_at_one_hundred_requests() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 1, Some(true), None))));
        let aggregator = PageAggregator::new(fetcher.clone(), base());

        let result: AggregatedResult<Machine> = aggregator.collect_all(&query()).await.unwrap();

        assert_eq!(fetcher.requests().len(), 100);
        assert_eq!(fetcher.requests().last(), Some(&100));
        assert_eq!(result.count, 100);
    }

    #[tokio::test]
    async fn test_configured_cap_is_respected() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 1, None, Some(50)))));
        let aggregator = PageAggregator::new(fetcher.clone(), base()).with_max_pages(5);

        let result: AggregatedResult<Machine> = aggregator.collect_all(&query()).await.unwrap();

        assert_eq!(fetcher.requests(), vec![1, 2, 3, 4, 5]);
        assert_eq!(result.count, 5);
    }

    #[tokio::test]
    async fn test_count_is_recomputed_not_copied() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 4, Some(page < 2), None))));
        let aggregator = PageAggregator::new(fetcher, base());

        let result: AggregatedResult<Machine> = aggregator.collect_all(&query()).await.unwrap();

        assert_eq!(result.count, 8);
        assert_eq!(result.count, result.items.len());
        assert_eq!(result.page_size, 8);
        assert_eq!(result.total_pages, 1);
        assert!(!result.has_next);
    }

    #[tokio::test]
    async fn test_failure_midway_returns_no_partial_items() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| {
            if page == 3 {
                Err(FetchError::HttpStatus { code: 500, url: "page3".to_string() })
            } else {
                Ok(machine_page(page, 2, Some(page < 5), None))
            }
        }));
        let aggregator = PageAggregator::new(fetcher.clone(), base());

        let result: Result<AggregatedResult<Machine>, _> = aggregator.collect_all(&query()).await;

        assert!(matches!(result, Err(FetchError::HttpStatus { code: 500, .. })));
        assert_eq!(fetcher.requests(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_undecodable_item_fails_whole_aggregation() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| {
            let mut envelope = machine_page(page, 2, Some(false), None);
            envelope.data.push(json!({"id": "not-a-number"}));
            Ok(envelope)
        }));
        let aggregator = PageAggregator::new(fetcher, base());

        let result: Result<AggregatedResult<Machine>, _> = aggregator.collect_all(&query()).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    fn mismatches(resource: &str) -> u64 {
        metrics::COUNT_MISMATCH_COUNTER.with_label_values(&[resource]).get()
    }

    #[tokio::test]
    async fn test_count_mismatch_is_counted_only_when_counts_differ() {
        let query = query_builder::equipment(vec![], &Scope::Unscoped);
        let resource = query.resource.name();
        let before = mismatches(resource);

        let wrong = Arc::new(ScriptedFetcher::new(|page| {
            let mut envelope = machine_page(page, 2, Some(page < 2), None);
            envelope.meta.count = Some(5);
            Ok(envelope)
        }));
        let items = PageAggregator::new(wrong, base()).collect_raw(&query).await.unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(mismatches(resource), before + 1);

        let consistent = Arc::new(ScriptedFetcher::new(|page| {
            let mut envelope = machine_page(page, 2, Some(page < 2), None);
            envelope.meta.count = Some(4);
            Ok(envelope)
        }));
        let items = PageAggregator::new(consistent, base()).collect_raw(&query).await.unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(mismatches(resource), before + 1);
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let fetcher = Arc::new(ScriptedFetcher::new(|page| Ok(machine_page(page, 0, Some(false), Some(0)))));
        let aggregator = PageAggregator::new(fetcher.clone(), base());

        let result: AggregatedResult<Machine> = aggregator.collect_all(&query()).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(fetcher.requests(), vec![1]);
    }
}
