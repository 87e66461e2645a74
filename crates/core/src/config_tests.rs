// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_keys_fall_back_to_defaults() {
    let cfg = ServerConfig::parse("{}", std::path::Path::new("config.json")).unwrap();
    assert_eq!(cfg, ServerConfig::default());
}

#[test]
fn recognized_keys_override_defaults() {
    let json = r#"{
        "irods_host": "archive.example.org",
        "irods_port": 1247,
        "irods_zone_name": "tape",
        "irods_user_name": "alice",
        "is_resource_server": true,
        "connection_timeout": 60,
        "resource_name": "demoResc",
        "housekeeping": 12,
        "stop_timeout": 5
    }"#;
    let cfg = ServerConfig::parse(json, std::path::Path::new("config.json")).unwrap();
    assert_eq!(cfg.irods_host, "archive.example.org");
    assert_eq!(cfg.zone, "tape");
    assert_eq!(cfg.user, "alice");
    assert!(cfg.is_resource_server);
    assert_eq!(cfg.connection_timeout_secs, 60);
    assert_eq!(cfg.resource_name, "demoResc");
    assert_eq!(cfg.housekeeping_keep_hours, 12);
    assert_eq!(cfg.housekeeping_interval_seconds, 12 * 3600);
    assert_eq!(cfg.stop_timeout_minutes, 5);
}

#[test]
fn unrecognized_keys_are_ignored() {
    let json = r#"{"irods_host": "a", "something_unknown": 42}"#;
    let cfg = ServerConfig::parse(json, std::path::Path::new("config.json")).unwrap();
    assert_eq!(cfg.irods_host, "a");
}

#[test]
fn invalid_json_is_a_parse_error() {
    let err = ServerConfig::parse("not json", std::path::Path::new("config.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_, _)));
}

#[test]
fn expand_remote_path_substitutes_zone_and_user() {
    let mut cfg = ServerConfig::default();
    cfg.zone = "tape".to_string();
    cfg.user = "alice".to_string();
    assert_eq!(cfg.expand_remote_path("/{zone}/home/{user}/a.dat"), "/tape/home/alice/a.dat");
}

#[test]
fn default_home_uses_zone_and_user() {
    let mut cfg = ServerConfig::default();
    cfg.zone = "tape".to_string();
    cfg.user = "alice".to_string();
    assert_eq!(cfg.default_home(), "/tape/home/alice");
}
