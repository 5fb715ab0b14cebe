use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::FetchError;

/// Upper bound on page requests per aggregation.
pub const DEFAULT_MAX_PAGES: u32 = 100;

pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Backend connection settings. Static per deployment: the same headers are
/// attached to every list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub hostname: String,
    pub authenticator: String,
    pub timezone: String,
    pub locale: String,
    pub role: String,
    pub with_acl_meta: bool,
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:13000/api".to_string(),
            bearer_token: String::new(),
            hostname: "localhost".to_string(),
            authenticator: "basic".to_string(),
            timezone: "+00:00".to_string(),
            locale: "en-US".to_string(),
            role: "admin".to_string(),
            with_acl_meta: true,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.base_url.trim().is_empty() {
            return Err(FetchError::Config("backend.base_url is empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(FetchError::Config("backend.page_size must be positive".to_string()));
        }
        if self.max_pages == 0 {
            return Err(FetchError::Config("backend.max_pages must be positive".to_string()));
        }
        self.base_url()?;
        Ok(())
    }

    /// Base URL with a trailing slash so collection paths join beneath it.
    pub fn base_url(&self) -> Result<Url, FetchError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/", trimmed))?)
    }

    pub fn headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !self.bearer_token.is_empty() {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", self.bearer_token))?);
        }

        let custom = [
            ("x-hostname", self.hostname.as_str()),
            ("x-authenticator", self.authenticator.as_str()),
            ("x-timezone", self.timezone.as_str()),
            ("x-with-acl-meta", if self.with_acl_meta { "true" } else { "false" }),
            ("x-role", self.role.as_str()),
            ("x-locale", self.locale.as_str()),
        ];
        for (name, value) in custom {
            headers.insert(HeaderName::from_static(name), header_value(value)?);
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value)
        .map_err(|e| FetchError::Config(format!("invalid header value {:?}: {}", value, e)))
}

/// Polling cadence for the presentation layer and the retry budget of one
/// aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub refetch_interval_secs: u64,
    pub stale_after_secs: u64,
    pub units_refetch_interval_secs: u64,
    pub units_stale_after_secs: u64,
    pub retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refetch_interval_secs: 30,
            stale_after_secs: 25,
            units_refetch_interval_secs: 60,
            units_stale_after_secs: 30,
            retries: 2,
            retry_initial_delay_ms: 1_000,
            retry_max_delay_ms: 30_000,
        }
    }
}

impl RefreshConfig {
    pub fn refetch_interval(&self) -> Duration {
        Duration::from_secs(self.refetch_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn units_refetch_interval(&self) -> Duration {
        Duration::from_secs(self.units_refetch_interval_secs)
    }

    pub fn units_stale_after(&self) -> Duration {
        Duration::from_secs(self.units_stale_after_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_dir: String,
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            json_logs: false,
        }
    }
}
