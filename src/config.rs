use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::roots;

/// Resolver tunables. The binary runs with `Config::default()`; TOML loading
/// exists for embedding the resolver elsewhere.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Per-query timeout. There is no overall budget for a whole run.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Destination port for every query
    #[serde(default = "default_port")]
    pub port: u16,
    /// Referrals followed before an iterative run gives up
    #[serde(default = "default_max_referrals")]
    pub max_referrals: u32,
    /// Use additional-section glue instead of looking NS hostnames up
    #[serde(default)]
    pub use_glue: bool,
    /// Replaces the built-in root table when set
    #[serde(default)]
    pub root_servers: Option<Vec<Ipv4Addr>>,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Where the system (recursive) resolver sends its queries.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Pinned nameservers; when empty they come from `resolv_conf`
    #[serde(default)]
    pub nameservers: Vec<Ipv4Addr>,
    #[serde(default = "default_resolv_conf")]
    pub resolv_conf: String,
    /// Used when `resolv_conf` is missing or lists no IPv4 nameserver
    #[serde(default = "default_fallback_nameservers")]
    pub fallback_nameservers: Vec<Ipv4Addr>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nameservers: Vec::new(),
            resolv_conf: default_resolv_conf(),
            fallback_nameservers: default_fallback_nameservers(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            port: default_port(),
            max_referrals: default_max_referrals(),
            use_glue: false,
            root_servers: None,
            resolver: ResolverConfig::default(),
        }
    }
}

// Default value functions
fn default_timeout_ms() -> u64 { 3000 }
fn default_port() -> u16 { 53 }
fn default_max_referrals() -> u32 { 16 }
fn default_resolv_conf() -> String { "/etc/resolv.conf".to_string() }
fn default_fallback_nameservers() -> Vec<Ipv4Addr> {
    vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(1, 1, 1, 1)]
}

impl Config {
    /// Library API for embedders; the `iterdns` binary never reads a file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path.display(), e))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        if self.max_referrals == 0 {
            anyhow::bail!("max_referrals must be greater than zero");
        }
        if matches!(&self.root_servers, Some(list) if list.is_empty()) {
            anyhow::bail!("root_servers override must list at least one address");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Initial candidate list for an iterative run.
    pub fn roots(&self) -> Vec<Ipv4Addr> {
        match &self.root_servers {
            Some(list) => list.clone(),
            None => roots::root_addrs(),
        }
    }
}
