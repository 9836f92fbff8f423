use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solu_engine::{AuditStrategy, DEFAULT_BASE_URL, EngineConfig, ProbePolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{Args, OutputFormat};

const APP_NAME: &str = "solu-cli";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root URL of the archive
    pub base_url: String,

    /// Default output format
    pub default_output_format: OutputFormat,

    /// Timeout for a single existence probe, in seconds
    pub probe_timeout: u64,

    /// Timeout for a page fetch, in seconds
    pub fetch_timeout: u64,

    /// Whether scraped pages and audits are cached
    pub cache_enabled: bool,

    /// Cache directory, system temp when unset
    pub cache_dir: Option<PathBuf>,

    /// How long cached pages and audits stay fresh, in seconds
    pub cache_ttl: u64,

    /// Strategy used by `audit` without `--fresh`
    pub audit_strategy: AuditStrategy,

    /// Overrides the per-strategy probe policy
    pub probe_policy: Option<ProbePolicy>,

    /// Pause between forced-fresh probes, in milliseconds
    pub probe_pacing_ms: u64,

    /// User agent string for requests
    pub user_agent: Option<String>,

    /// Verify the archive host's TLS certificates
    pub verify_certs: bool,

    /// Enable colored output
    pub colored_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_output_format: OutputFormat::Pretty,
            probe_timeout: 8,
            fetch_timeout: 12,
            cache_enabled: true,
            cache_dir: None,
            cache_ttl: 24 * 60 * 60,
            audit_strategy: AuditStrategy::BatchedCached,
            probe_policy: None,
            probe_pacing_ms: 50,
            user_agent: None,
            verify_certs: false,
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Use confy for default location
                confy::load(APP_NAME, None).context("Failed to load configuration")
            }
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }

    /// Engine configuration with command-line overrides applied
    pub fn engine_config(&self, args: &Args) -> Result<EngineConfig> {
        let (probe_timeout, fetch_timeout) = match args.timeout {
            Some(secs) => (secs, secs),
            None => (self.probe_timeout, self.fetch_timeout),
        };
        let ttl = Duration::from_secs(self.cache_ttl);

        let mut builder = EngineConfig::builder()
            .with_base_url(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?
            .with_probe_timeout(Duration::from_secs(probe_timeout))
            .with_fetch_timeout(Duration::from_secs(fetch_timeout))
            .with_catalog_ttl(ttl)
            .with_audit_ttl(ttl)
            .with_audit_strategy(self.audit_strategy)
            .with_probe_pacing(Duration::from_millis(self.probe_pacing_ms))
            .danger_accept_invalid_certs(!(self.verify_certs || args.verify_certs));

        if let Some(policy) = self.probe_policy {
            builder = builder.with_probe_policy(policy);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.with_user_agent(user_agent);
        }

        let cache_enabled = self.cache_enabled && !args.no_cache;
        builder = builder.with_caching_enabled(cache_enabled);
        if cache_enabled {
            if let Some(dir) = args.cache_dir.as_ref().or(self.cache_dir.as_ref()) {
                builder = builder.with_cache_dir(dir.clone());
            }
        }

        Ok(builder.build())
    }

    pub fn output_format(&self, args: &Args) -> OutputFormat {
        args.output.unwrap_or(self.default_output_format)
    }
}
