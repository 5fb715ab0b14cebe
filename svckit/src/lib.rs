pub mod aggregate;
pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod filter;
pub mod metrics;
pub mod query_builder;
pub mod retry;
pub mod types;

pub use aggregate::PageAggregator;
pub use cache::{QueryCache, QueryStatus};
pub use client::AssetClient;
pub use errors::FetchError;
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use filter::{DateRange, FilterExpr, Op, Predicate, Scope};
pub use query_builder::{ListQuery, Resource};
pub use retry::RetryPolicy;
