//! Integration tests for config layering and source construction.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use fleetwatch_config::{
    Config, ConfigError, RemoteSection, SourceKind, build_source, load_config_from,
    resolve_remote_password, save_config_to,
};

const SEED: &str = r#"[
  {
    "name": "VXSQL1",
    "ip": "172.16.1.150",
    "type": "Database Server",
    "services": [
      { "name": "SQL Server", "status": "online" },
      { "name": "SQLAgent", "status": "offline" }
    ],
    "specs": { "cpu": "Xeon", "cores": 8, "ram": "32 GB", "storage": "1 TB", "os": "Windows Server 2019" },
    "uptime": "99.98%",
    "lastReboot": "2024-03-01 08:00:00"
  }
]"#;

// ── Layering ────────────────────────────────────────────────────────

#[test]
fn test_missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let cfg = load_config_from(Path::new("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.source.kind, SourceKind::Simulated);
        assert_eq!(cfg.remote.program, "pwsh");
        Ok(())
    });
}

#[test]
fn test_file_then_env_override() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [cache]
            ttl_secs = 15

            [reboot]
            delay_secs = 2

            [source]
            kind = "live"
            seed_file = "fleet.json"
            "#,
        )?;
        jail.set_env("FLEETWATCH_CACHE__TTL_SECS", "5");
        jail.set_env("FLEETWATCH_SIMULATION__SEED", "7");

        let cfg = load_config_from(Path::new("config.toml")).unwrap();
        assert_eq!(cfg.cache.ttl_secs, 5);
        assert_eq!(cfg.cache.refresh_interval_secs, 30);
        assert_eq!(cfg.reboot.delay_secs, 2);
        assert_eq!(cfg.simulation.seed, Some(7));
        assert_eq!(cfg.source.kind, SourceKind::Live);
        assert_eq!(
            cfg.source.seed_file.as_deref(),
            Some(Path::new("fleet.json"))
        );
        Ok(())
    });
}

#[test]
fn test_malformed_file_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[cache]\nttl_secs = \"soon\"\n")?;
        let err = load_config_from(Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}

#[test]
fn test_save_then_load_preserves_sections() {
    Jail::expect_with(|jail| {
        let path = jail.directory().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.defaults.output = "json".into();
        cfg.reboot.delay_secs = 9;
        cfg.remote.username = Some("svc-fleet".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        Ok(())
    });
}

// ── Translation ─────────────────────────────────────────────────────

#[test]
fn test_fleet_config_carries_durations_and_weights() {
    let mut cfg = Config::default();
    cfg.cache.ttl_secs = 10;
    cfg.reboot.delay_secs = 3;
    cfg.simulation.seed = Some(42);

    let fleet = cfg.fleet_config().unwrap();
    assert_eq!(fleet.cache_ttl.as_secs(), 10);
    assert_eq!(fleet.reboot.delay.as_secs(), 3);
    assert_eq!(fleet.rng_seed, Some(42));
    assert!((fleet.simulation.online - 0.8).abs() < f64::EPSILON);
}

#[test]
fn test_invalid_weights_are_rejected() {
    let mut cfg = Config::default();
    cfg.simulation.online_weight = 0.0;
    cfg.simulation.warning_weight = 0.0;
    cfg.simulation.offline_weight = 0.0;

    let err = cfg.fleet_config().unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn test_zero_event_capacity_is_rejected() {
    let mut cfg = Config::default();
    cfg.cache.event_capacity = 0;
    assert!(cfg.fleet_config().is_err());
}

// ── Source construction ─────────────────────────────────────────────

#[test]
fn test_default_source_is_simulated() {
    let source = build_source(&Config::default()).unwrap();
    assert_eq!(source.name(), "simulated");
}

#[test]
fn test_live_source_requires_seed_file() {
    let mut cfg = Config::default();
    cfg.source.kind = SourceKind::Live;
    let Err(err) = build_source(&cfg) else {
        panic!("live source without inventory should fail");
    };
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "source.seed_file"));
}

#[test]
fn test_seed_file_feeds_both_sources() {
    let dir = tempfile::tempdir().unwrap();
    let seed = dir.path().join("fleet.json");
    std::fs::write(&seed, SEED).unwrap();

    let mut cfg = Config::default();
    cfg.source.seed_file = Some(seed);
    assert_eq!(build_source(&cfg).unwrap().name(), "simulated");

    cfg.source.kind = SourceKind::Live;
    assert_eq!(build_source(&cfg).unwrap().name(), "live");
}

#[test]
fn test_unreadable_seed_file_surfaces_core_error() {
    let mut cfg = Config::default();
    cfg.source.seed_file = Some("/nonexistent/fleetwatch/fleet.json".into());
    let Err(err) = build_source(&cfg) else {
        panic!("missing seed file should fail");
    };
    assert!(matches!(err, ConfigError::Core(_)));
}

// ── Credentials ─────────────────────────────────────────────────────

#[test]
fn test_password_env_takes_precedence() {
    Jail::expect_with(|jail| {
        jail.set_env("FLEET_REMOTE_PW", "from-env");
        let remote = RemoteSection {
            password_env: Some("FLEET_REMOTE_PW".into()),
            password: Some("from-file".into()),
            ..RemoteSection::default()
        };
        let secret = resolve_remote_password(&remote).unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        Ok(())
    });
}
