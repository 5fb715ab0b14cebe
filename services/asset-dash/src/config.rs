use anyhow::Result;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use svckit::config::{BackendConfig, ObservabilityConfig, RefreshConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetDashConfig {
    pub backend: BackendConfig,
    pub refresh: RefreshConfig,
    pub observability: ObservabilityConfig,
}

/// YAML file (optional) overlaid with `ASSET_DASH__SECTION__KEY` variables,
/// e.g. `ASSET_DASH__BACKEND__BEARER_TOKEN`.
pub fn load_config(path: &str) -> Result<AssetDashConfig> {
    let config = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("ASSET_DASH")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("does/not/exist/asset-dash").unwrap();
        assert_eq!(config.backend.max_pages, 100);
        assert_eq!(config.backend.page_size, 200);
        assert_eq!(config.refresh.refetch_interval_secs, 30);
        assert_eq!(config.refresh.stale_after_secs, 25);
        assert_eq!(config.refresh.retries, 2);
    }

    #[test]
    fn test_yaml_overrides_selected_keys() {
        let dir = std::env::temp_dir().join(format!("asset-dash-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dash.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "backend:\n  base_url: https://assets.example.com/api\n  timezone: \"+05:30\"\n  max_pages: 20\nrefresh:\n  refetch_interval_secs: 10\n"
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.backend.base_url, "https://assets.example.com/api");
        assert_eq!(config.backend.timezone, "+05:30");
        assert_eq!(config.backend.max_pages, 20);
        assert_eq!(config.backend.page_size, 200);
        assert_eq!(config.refresh.refetch_interval_secs, 10);
        assert_eq!(config.refresh.stale_after_secs, 25);

        std::fs::remove_dir_all(&dir).ok();
    }
}
