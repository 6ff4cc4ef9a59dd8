//! Configuration management for the shard mirror resolver

use crate::error::{MirrorError, Result};
use crate::models::FallbackRoot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for mirror discovery and probing
///
/// Shared read-only (behind an `Arc`) by the candidate generator, the prober and
/// the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Prefix letters tried by the prefix-swap strategy, in priority order
    #[serde(default = "default_fallback_prefixes")]
    pub fallback_prefixes: Vec<String>,

    /// `label.tld` entries tried by the root-swap strategy, in priority order
    #[serde(default = "default_fallback_roots")]
    pub fallback_roots: Vec<String>,

    /// Maximum number of candidates probed per broken reference (default: 30)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Highest shard number swept by the shard strategy, inclusive (default: 15)
    #[serde(default = "default_max_shard_number")]
    pub max_shard_number: u16,

    /// Per-probe timeout in milliseconds (default: 5000)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Images this wide or narrower count as placeholders (default: 10)
    #[serde(default = "default_min_image_width")]
    pub min_image_width: u32,

    /// Bytes a probe will buffer while looking for the image header (default: 16MB)
    #[serde(default = "default_max_probe_bytes")]
    pub max_probe_bytes: usize,

    /// Probe an image's current URL before treating it as broken (default: true)
    #[serde(default = "default_true")]
    pub verify_original: bool,

    /// User-Agent sent with probe requests (optional)
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_fallback_prefixes() -> Vec<String> {
    ["n", "x", "t", "s", "w", "m", "c", "u", "k"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fallback_roots() -> Vec<String> {
    [
        "mbdny.org",
        "mbrtz.org",
        "bato.to",
        "mbwbm.org",
        "mbznp.org",
        "mbqgu.org",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_attempts() -> usize {
    30
}

fn default_max_shard_number() -> u16 {
    15
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_min_image_width() -> u32 {
    10
}

fn default_max_probe_bytes() -> usize {
    16 * 1024 * 1024 // 16MB
}

fn default_true() -> bool {
    true
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig {
            fallback_prefixes: default_fallback_prefixes(),
            fallback_roots: default_fallback_roots(),
            max_attempts: default_max_attempts(),
            max_shard_number: default_max_shard_number(),
            probe_timeout_ms: default_probe_timeout_ms(),
            min_image_width: default_min_image_width(),
            max_probe_bytes: default_max_probe_bytes(),
            verify_original: default_true(),
            user_agent: None,
        }
    }
}

impl MirrorConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    /// * `Ok(MirrorConfig)` if loading and validation succeed
    /// * `Err(MirrorError)` if the file cannot be read or the config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            MirrorError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: MirrorConfig = serde_yaml::from_str(content).map_err(|e| {
            MirrorError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - every fallback prefix is one or more ASCII letters
    /// - every fallback root is `label.tld` with a supported TLD
    /// - max_attempts must be > 0
    /// - max_shard_number must fit in three digits
    /// - probe_timeout_ms must be > 0
    /// - max_probe_bytes must be at least 1KB
    pub fn validate(&self) -> Result<()> {
        const MAX_SHARD_NUMBER: u16 = 999;
        const MIN_PROBE_BYTES: usize = 1024;

        for prefix in &self.fallback_prefixes {
            if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(MirrorError::ConfigError(format!(
                    "fallback prefix '{}' must be one or more ASCII letters",
                    prefix
                )));
            }
        }

        for root in &self.fallback_roots {
            if FallbackRoot::parse(root).is_none() {
                return Err(MirrorError::ConfigError(format!(
                    "fallback root '{}' must be 'label.tld' with tld one of org, net, to",
                    root
                )));
            }
        }

        if self.max_attempts == 0 {
            return Err(MirrorError::ConfigError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.max_shard_number > MAX_SHARD_NUMBER {
            return Err(MirrorError::ConfigError(format!(
                "max_shard_number must be at most {}, got {}",
                MAX_SHARD_NUMBER, self.max_shard_number
            )));
        }

        if self.probe_timeout_ms == 0 {
            return Err(MirrorError::ConfigError(
                "probe_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_probe_bytes < MIN_PROBE_BYTES {
            return Err(MirrorError::ConfigError(format!(
                "max_probe_bytes must be at least {} bytes, got {}",
                MIN_PROBE_BYTES, self.max_probe_bytes
            )));
        }

        Ok(())
    }

    /// Per-probe timeout as a `Duration`
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Fallback prefixes, lowercased, in declaration order
    pub fn prefixes(&self) -> impl Iterator<Item = String> + '_ {
        self.fallback_prefixes.iter().map(|p| p.to_ascii_lowercase())
    }

    /// Fallback roots split into label and TLD, in declaration order.
    ///
    /// Entries that are not `label.tld` are skipped.
    pub fn roots(&self) -> impl Iterator<Item = FallbackRoot> + '_ {
        self.fallback_roots.iter().filter_map(|r| FallbackRoot::parse(r))
    }
}
