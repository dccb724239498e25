use std::fs;
use std::time::Duration;

use gallery_cache::config::{CacheConfig, from_yaml_file};
use gallery_cache::Error;
use tempfile::tempdir;

#[test]
fn defaults_match_the_designed_bounds() {
    let cfg = CacheConfig::default();
    assert_eq!(cfg.ready_capacity, 10);
    assert_eq!(cfg.ring_capacity, 10);
    assert_eq!(cfg.history_limit, 10_000);
    assert_eq!(cfg.idle_poll, Duration::from_millis(100));
    assert_eq!(cfg.advance_wait, Duration::from_secs(10));
    assert!(cfg.still_extensions.iter().any(|e| e == "jpg"));
    assert!(cfg.animated_extensions.iter().any(|e| e == "gif"));
    cfg.validate().unwrap();
}

#[test]
fn yaml_overrides_merge_with_defaults() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("config.yaml");
    fs::write(
        &path,
        concat!(
            "ready-capacity: 4\n",
            "idle-poll: 50ms\n",
            "advance-wait: 2s\n",
            "animated-extensions: [gif, webp]\n",
        ),
    )
    .unwrap();

    let cfg = from_yaml_file(&path).unwrap();
    assert_eq!(cfg.ready_capacity, 4);
    assert_eq!(cfg.idle_poll, Duration::from_millis(50));
    assert_eq!(cfg.advance_wait, Duration::from_secs(2));
    assert_eq!(cfg.animated_extensions, vec!["gif", "webp"]);
    // Untouched fields keep their defaults.
    assert_eq!(cfg.ring_capacity, 10);
    assert_eq!(cfg.history_limit, 10_000);
    cfg.validate().unwrap();
}

#[test]
fn missing_file_is_an_io_error() {
    let tmp = tempdir().unwrap();
    match from_yaml_file(&tmp.path().join("nope.yaml")) {
        Err(Error::Io(_)) => {}
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn malformed_yaml_is_a_config_error() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("config.yaml");
    fs::write(&path, "ready-capacity: [broken").unwrap();
    match from_yaml_file(&path) {
        Err(Error::Config(_)) => {}
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn validate_rejects_degenerate_bounds() {
    let zero_ready = CacheConfig {
        ready_capacity: 0,
        ..CacheConfig::default()
    };
    assert!(zero_ready.validate().is_err());

    let wait_below_poll = CacheConfig {
        idle_poll: Duration::from_secs(1),
        advance_wait: Duration::from_millis(10),
        ..CacheConfig::default()
    };
    assert!(wait_below_poll.validate().is_err());

    let no_extensions = CacheConfig {
        still_extensions: Vec::new(),
        animated_extensions: Vec::new(),
        ..CacheConfig::default()
    };
    assert!(no_extensions.validate().is_err());
}
