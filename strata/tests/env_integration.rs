//! Integration tests for environment variable binding.
//!
//! Every test here mutates the process environment, so all of them are
//! marked `#[serial]` and restore variables through [`EnvGuard`].

mod common;

use common::EnvGuard;
use serial_test::serial;
use strata::{Instance, Tier};

#[test]
#[serial]
fn test_explicit_binding_is_live() {
    let config = Instance::new();
    config.bind_env("id2", &["ID"]);

    let guard = EnvGuard::new("ID", "2");
    assert_eq!(config.get_int("id2"), 2);

    std::env::set_var("ID", "22");
    assert_eq!(config.get_int("id2"), 22);
    drop(guard);

    assert!(config.get("id2").is_none());
}

#[test]
#[serial]
fn test_bind_without_name_uses_prefix() {
    let _guard = EnvGuard::new("WANGJUAN_ID", "1");

    let config = Instance::new();
    config.set_env_prefix("wangjuan");
    config.bind_env("id", &[]);
    assert_eq!(config.get_int("id"), 1);
}

#[test]
#[serial]
fn test_automatic_env_with_prefix() {
    let _guard = EnvGuard::new("WANGJUAN_ID_AUTO", "3");

    let config = Instance::new();
    config.set_env_prefix("WANGJUAN");
    assert!(config.get("id_auto").is_none());

    config.automatic_env();
    assert_eq!(config.get_int("id_auto"), 3);
    assert_eq!(config.source_of("ID_AUTO"), Some(Tier::Env));
}

#[test]
#[serial]
fn test_key_replacer() {
    let _guard = EnvGuard::new("WANGJUAN_ID_REPLACER", "4");

    let config = Instance::new();
    config.set_env_prefix("WANGJUAN");
    config.automatic_env();
    config.set_env_key_replacer(&[(".", "_")]);
    assert_eq!(config.get_int("id.replacer"), 4);
}

#[test]
#[serial]
fn test_env_outranks_file_not_override() {
    let _guard = EnvGuard::new("STRATA_IT_PORT", "9000");

    let config = Instance::new();
    config.set_default("port", 80).unwrap();
    config.set_config_type("yaml");
    config.read_config(b"port: 8080\n").unwrap();
    config.bind_env("port", &["STRATA_IT_PORT"]);
    assert_eq!(config.get_int("port"), 9000);

    config.set("port", 1).unwrap();
    assert_eq!(config.get_int("port"), 1);
}

#[test]
#[serial]
fn test_first_present_variable_wins() {
    let _missing = EnvGuard::remove("STRATA_IT_PRIMARY");
    let _fallback = EnvGuard::new("STRATA_IT_FALLBACK", "fallback");

    let config = Instance::new();
    config.bind_env("endpoint", &["STRATA_IT_PRIMARY", "STRATA_IT_FALLBACK"]);
    assert_eq!(config.get_string("endpoint"), "fallback");

    let _primary = EnvGuard::new("STRATA_IT_PRIMARY", "primary");
    assert_eq!(config.get_string("endpoint"), "primary");
}

#[test]
#[serial]
fn test_empty_value_policy() {
    let _guard = EnvGuard::new("STRATA_IT_EMPTY", "");

    let config = Instance::new();
    config.set_default("empty", "default").unwrap();
    config.bind_env("empty", &["STRATA_IT_EMPTY"]);
    assert_eq!(config.get_string("empty"), "default");

    config.allow_empty_env(true);
    assert_eq!(config.get_string("empty"), "");
    assert!(config.is_set("empty"));
}

#[test]
#[serial]
fn test_alias_reaches_env_binding() {
    let _guard = EnvGuard::new("STRATA_IT_VERBOSE", "true");

    let config = Instance::new();
    config.bind_env("verbose", &["STRATA_IT_VERBOSE"]);
    config.register_alias("loud", "verbose");
    assert!(config.get_bool("LOUD"));
}

#[test]
#[serial]
fn test_bound_env_keys_appear_in_settings() {
    let _guard = EnvGuard::new("STRATA_IT_MYSQL_ADDR", "db.local");

    let config = Instance::new();
    config.set_default("mysql.port", 3306).unwrap();
    config.bind_env("mysql.addr", &["STRATA_IT_MYSQL_ADDR"]);

    assert_eq!(config.all_keys(), ["mysql.addr", "mysql.port"]);
    let mysql = config.get_string_map("mysql");
    assert_eq!(mysql["addr"].as_str(), Some("db.local"));
}

#[test]
#[serial]
fn test_mapping_from_json_env() {
    let _guard = EnvGuard::new("STRATA_IT_TAGS", r#"{"Team": "core", "tier": "1"}"#);

    let config = Instance::new();
    config.bind_env("tags", &["STRATA_IT_TAGS"]);
    let tags = config.get_string_map_string("tags");
    assert_eq!(tags["team"], "core");
    assert_eq!(tags["tier"], "1");
}
