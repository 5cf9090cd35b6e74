//! Tests for configuration parsing and defaulting.

use std::time::Duration;

use muninn::{CacheDomain, CacheTopology, MuninnConfig};

#[test]
fn empty_table_is_a_valid_config() {
    let config: MuninnConfig = toml::from_str("").unwrap();
    assert_eq!(config.topology, CacheTopology::Memory);
    assert!(config.redis_url.is_none());
    assert_eq!(config.namespace, "muninn");
    assert_eq!(config.sweep_interval_secs, 300);
    assert_eq!(config.durable_op_timeout_ms, 2000);
    assert_eq!(config.invalidation.poll_interval_secs, 12 * 3600);
    assert_eq!(config.invalidation.initial_delay_secs, 60);
}

#[test]
fn parse_minimal_config() {
    let toml = r#"
        topology = "hybrid"
        redis_url = "redis://cache:6379"
    "#;
    let config: MuninnConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.topology, CacheTopology::Hybrid);
    assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
    // Defaults preserved.
    assert_eq!(config.ttl.search_secs, 2 * 3600);
    assert_eq!(config.ttl.artwork_secs, 14 * 24 * 3600);
}

#[test]
fn parse_full_config() {
    let toml = r#"
        topology = "durable"
        redis_url = "redis://cache:6379"
        namespace = "metahub"
        write_queue_size = 64
        sweep_interval_secs = 120
        durable_op_timeout_ms = 500

        [ttl]
        search_secs = 600
        negative_secs = 300

        [invalidation]
        poll_interval_secs = 3600
        initial_delay_secs = 5
        overlap_secs = 60
        fallback_domain = "catalog"
    "#;
    let config: MuninnConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.topology, CacheTopology::Hybrid);
    assert_eq!(config.namespace, "metahub");
    assert_eq!(config.write_queue_size, 64);
    assert_eq!(config.durable_op_timeout(), Duration::from_millis(500));
    assert_eq!(config.ttl.search_secs, 600);
    assert_eq!(config.ttl.negative_secs, 300);
    // Untouched TTLs keep defaults.
    assert_eq!(config.ttl.metadata_secs, 12 * 3600);
    assert_eq!(config.invalidation.poll_interval_secs, 3600);
    assert_eq!(config.invalidation.fallback_domain(), CacheDomain::Catalog);
}

#[test]
fn ttl_for_domain_reflects_overrides() {
    let toml = r#"
        [ttl]
        seasons_secs = 42
    "#;
    let config: MuninnConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.ttl.for_domain(CacheDomain::Seasons), Duration::from_secs(42));
    assert_eq!(
        config.ttl.for_domain(CacheDomain::Validation),
        Duration::from_secs(7 * 24 * 3600)
    );
}

#[test]
fn from_env_reads_muninn_variables() {
    // Defaults first, while nothing is set. Kept in one test with the
    // override assertions so parallel test threads never race on the
    // process environment.
    let config = MuninnConfig::from_env();
    assert_eq!(config.topology, CacheTopology::Memory);
    assert_eq!(config.namespace, "muninn");
    assert_eq!(config.sweep_interval_secs, 300);

    // SAFETY: this test owns these variables and no other test reads them.
    unsafe {
        std::env::set_var("MUNINN_CACHE_MODE", "hybrid");
        std::env::set_var("MUNINN_REDIS_URL", "redis://env:6379");
        std::env::set_var("MUNINN_NAMESPACE", "envspace");
        std::env::set_var("MUNINN_POLL_INTERVAL_SECS", "900");
        std::env::set_var("MUNINN_FALLBACK_DOMAIN", "catalog");
    }

    let config = MuninnConfig::from_env();
    assert_eq!(config.topology, CacheTopology::Hybrid);
    assert_eq!(config.redis_url.as_deref(), Some("redis://env:6379"));
    assert_eq!(config.namespace, "envspace");
    assert_eq!(config.invalidation.poll_interval_secs, 900);
    assert_eq!(config.invalidation.fallback_domain(), CacheDomain::Catalog);

    // SAFETY: see above.
    unsafe {
        std::env::remove_var("MUNINN_CACHE_MODE");
        std::env::remove_var("MUNINN_REDIS_URL");
        std::env::remove_var("MUNINN_NAMESPACE");
        std::env::remove_var("MUNINN_POLL_INTERVAL_SECS");
        std::env::remove_var("MUNINN_FALLBACK_DOMAIN");
    }
}
