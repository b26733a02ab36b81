//! Gateway configuration types.
//!
//! Config is loaded once at startup from a YAML file and validated before
//! the server opens its listener. Invalid configs are rejected with a clear
//! error rather than silently falling back to defaults.
//!
//! # Example
//! ```yaml
//! context:
//!   http_address: "0.0.0.0:8080"
//!   uyuni:
//!     default:
//!       user: admin
//!       password: secret
//!       port: 8000
//!       tls: false
//!       skip_cert_check: true
//!     hosts:
//!       host-a.example.org: {}
//!       host-b.example.org:
//!         port: 8010
//! ```
//!
//! Per-host settings are merged over `default` with a fresh map built for
//! every host — never by mutating the shared `default` map in place, so one
//! host's override can never leak into a sibling host's lookup.

use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub context: ContextConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "defaults::http_address")]
    pub http_address: String,
    pub uyuni: UyuniConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UyuniConfig {
    #[serde(default)]
    pub default: BTreeMap<String, YamlValue>,
    #[serde(default)]
    pub hosts: BTreeMap<String, BTreeMap<String, YamlValue>>,
}

/// Fully-resolved per-host connection settings, after merging `default` with
/// that host's overrides.
#[derive(Debug, Clone)]
pub struct HostSetup {
    pub user: String,
    pub password: String,
    pub port: u16,
    pub tls: bool,
    pub skip_cert_check: bool,
    pub timeout_ms: u64,
}

impl GatewayConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content).context("parsing gateway config YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.context.uyuni.hosts.is_empty(),
            "gateway config must register at least one backend host"
        );
        for fqdn in self.context.uyuni.hosts.keys() {
            self.host_setup(fqdn)
                .with_context(|| format!("resolving settings for host `{fqdn}`"))?;
        }
        Ok(())
    }

    /// Resolve the merged settings for a single configured host. Builds a
    /// fresh map rather than mutating `default`, so resolving one host's
    /// settings can never affect another host's.
    pub fn host_setup(&self, fqdn: &str) -> anyhow::Result<HostSetup> {
        let overrides = self
            .context
            .uyuni
            .hosts
            .get(fqdn)
            .ok_or_else(|| anyhow::anyhow!("host `{fqdn}` is not configured"))?;

        let mut merged = self.context.uyuni.default.clone();
        for (k, v) in overrides {
            merged.insert(k.clone(), v.clone());
        }

        let get_str = |key: &str| -> anyhow::Result<String> {
            merged
                .get(key)
                .and_then(YamlValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("missing or non-string `{key}`"))
        };
        let get_u64 = |key: &str, default: u64| -> u64 {
            merged.get(key).and_then(YamlValue::as_u64).unwrap_or(default)
        };
        let get_bool = |key: &str, default: bool| -> bool {
            merged.get(key).and_then(YamlValue::as_bool).unwrap_or(default)
        };

        Ok(HostSetup {
            user: get_str("user")?,
            password: get_str("password")?,
            port: get_u64("port", 8000) as u16,
            tls: get_bool("tls", false),
            skip_cert_check: get_bool("skip_cert_check", false),
            timeout_ms: get_u64("timeout_ms", 30_000),
        })
    }

    /// FQDNs of every configured host, in a stable (alphabetical) order —
    /// used to register backend contexts deterministically at startup.
    pub fn host_fqdns(&self) -> Vec<String> {
        self.context.uyuni.hosts.keys().cloned().collect()
    }
}

mod defaults {
    pub fn http_address() -> String {
        "0.0.0.0:8080".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
context:
  http_address: "0.0.0.0:9090"
  uyuni:
    default:
      user: admin
      password: secret
      port: 8000
      tls: false
      skip_cert_check: true
    hosts:
      host-a.example.org: {}
      host-b.example.org:
        port: 8010
        user: special
"#;

    #[test]
    fn host_without_overrides_inherits_default() {
        let cfg: GatewayConfig = serde_yaml::from_str(DOC).unwrap();
        let setup = cfg.host_setup("host-a.example.org").unwrap();
        assert_eq!(setup.user, "admin");
        assert_eq!(setup.port, 8000);
        assert!(setup.skip_cert_check);
    }

    #[test]
    fn host_override_does_not_leak_into_sibling_host() {
        let cfg: GatewayConfig = serde_yaml::from_str(DOC).unwrap();
        let b = cfg.host_setup("host-b.example.org").unwrap();
        assert_eq!(b.user, "special");
        assert_eq!(b.port, 8010);

        // host-a must still see the unmodified default, proving the merge
        // for host-b did not mutate a shared map.
        let a = cfg.host_setup("host-a.example.org").unwrap();
        assert_eq!(a.user, "admin");
        assert_eq!(a.port, 8000);
    }

    #[test]
    fn unconfigured_host_is_rejected() {
        let cfg: GatewayConfig = serde_yaml::from_str(DOC).unwrap();
        assert!(cfg.host_setup("unknown.example.org").is_err());
    }

    #[test]
    fn validate_rejects_empty_host_list() {
        let doc = r#"
context:
  uyuni:
    default: {}
    hosts: {}
"#;
        let cfg: GatewayConfig = serde_yaml::from_str(doc).unwrap();
        assert!(cfg.validate().is_err());
    }
}
