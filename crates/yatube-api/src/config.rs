use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::warn;

use yatube_db::{FollowPolicy, Paginator};

/// Placeholder JWT secrets that must not reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Deployment settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Posts per page. Fixed for the lifetime of the process.
    pub page_size: u32,
    pub index_cache_ttl: Duration,
    pub follow_policy: FollowPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            db_path: "yatube.db".into(),
            jwt_secret: "dev-secret-change-me".into(),
            page_size: 10,
            index_cache_ttl: Duration::from_secs(20),
            follow_policy: FollowPolicy::Exclusive,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys keep
    /// their defaults, malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(host) = lookup("YATUBE_HOST") {
            cfg.host = host;
        }
        if let Some(port) = lookup("YATUBE_PORT") {
            cfg.port = port.parse().with_context(|| format!("YATUBE_PORT={port}"))?;
        }
        if let Some(path) = lookup("YATUBE_DB_PATH") {
            cfg.db_path = path.into();
        }
        if let Some(secret) = lookup("YATUBE_JWT_SECRET") {
            cfg.jwt_secret = secret;
        }
        if let Some(size) = lookup("YATUBE_PAGE_SIZE") {
            cfg.page_size = size
                .parse()
                .with_context(|| format!("YATUBE_PAGE_SIZE={size}"))?;
            if cfg.page_size == 0 {
                bail!("YATUBE_PAGE_SIZE must be at least 1");
            }
        }
        if let Some(secs) = lookup("YATUBE_INDEX_CACHE_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("YATUBE_INDEX_CACHE_SECS={secs}"))?;
            cfg.index_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(policy) = lookup("YATUBE_FOLLOW_POLICY") {
            cfg.follow_policy = policy
                .parse()
                .map_err(anyhow::Error::msg)
                .context("YATUBE_FOLLOW_POLICY")?;
        }

        if cfg.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&cfg.jwt_secret.as_str()) {
            warn!("YATUBE_JWT_SECRET is unset or still a placeholder; sessions are forgeable");
        }

        Ok(cfg)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.index_cache_ttl, Duration::from_secs(20));
        assert_eq!(cfg.follow_policy, FollowPolicy::Exclusive);
        assert_eq!(cfg.bind_addr().unwrap().port(), 8000);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from_pairs(&[
            ("YATUBE_PORT", "9001"),
            ("YATUBE_PAGE_SIZE", "25"),
            ("YATUBE_INDEX_CACHE_SECS", "0"),
            ("YATUBE_FOLLOW_POLICY", "multi"),
            ("YATUBE_DB_PATH", "/tmp/blog.db"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.paginator().per_page(), 25);
        assert!(cfg.index_cache_ttl.is_zero());
        assert_eq!(cfg.follow_policy, FollowPolicy::Multi);
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/blog.db"));
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(from_pairs(&[("YATUBE_PORT", "http")]).is_err());
        assert!(from_pairs(&[("YATUBE_PAGE_SIZE", "0")]).is_err());
        assert!(from_pairs(&[("YATUBE_PAGE_SIZE", "-3")]).is_err());
        assert!(from_pairs(&[("YATUBE_FOLLOW_POLICY", "everyone")]).is_err());
    }
}
