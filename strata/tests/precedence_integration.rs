//! Integration tests for tier precedence, flag binding, aliases and
//! instance isolation.

use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use serde::Deserialize;
use strata::{ClapFlags, FlagSet, Instance, Tier, Value};
use tempfile::TempDir;

fn command() -> Command {
    Command::new("demo")
        .arg(Arg::new("flagname").long("flagname").default_value("1234"))
        .arg(Arg::new("port").long("port").default_value("80"))
        .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
}

fn flags(args: &[&str]) -> Arc<dyn FlagSet> {
    let mut argv = vec!["demo"];
    argv.extend_from_slice(args);
    Arc::new(ClapFlags::new(command().try_get_matches_from(argv).unwrap()))
}

#[test]
fn test_file_beats_default_and_flag_beats_file() {
    let config = Instance::new();
    config.set_default("port", 1).unwrap();
    config.set_config_type("yaml");
    config.read_config(b"port: 2\n").unwrap();
    assert_eq!(config.get_int("port"), 2);

    config.bind_flag("port", flags(&["--port", "3"]), "port");
    assert_eq!(config.get_int("port"), 3);
    assert_eq!(config.source_of("port"), Some(Tier::Flag));
}

#[test]
fn test_flag_bound_first_still_wins() {
    let config = Instance::new();
    config.bind_flag("port", flags(&["--port", "3"]), "port");
    config.set_config_type("yaml");
    config.read_config(b"port: 2\n").unwrap();
    config.set_default("port", 1).unwrap();
    assert_eq!(config.get_int("port"), 3);
}

#[test]
fn test_unchanged_flag_default_is_last_resort() {
    let config = Instance::new();
    config.bind_flags(&flags(&[]));
    assert_eq!(config.get_int("flagname"), 1234);
    assert!(!config.is_set("flagname"));

    config.set_default("flagname", 5).unwrap();
    assert_eq!(config.get_int("flagname"), 5);
    assert!(config.is_set("flagname"));
}

#[test]
fn test_switch_flag() {
    let config = Instance::new();
    config.set_default("verbose", true).unwrap();
    config.bind_flag("verbose", flags(&[]), "verbose");
    assert!(config.get_bool("verbose"));

    let config = Instance::new();
    config.bind_flag("verbose", flags(&["--verbose"]), "verbose");
    assert!(config.get_bool("verbose"));
}

#[test]
fn test_override_beats_everything() {
    let config = Instance::new();
    config.bind_flag("port", flags(&["--port", "3"]), "port");
    config.set("port", 4).unwrap();
    assert_eq!(config.get_int("port"), 4);
    assert_eq!(config.source_of("PORT"), Some(Tier::Override));
}

#[test]
fn test_alias_symmetry() {
    let config = Instance::new();
    config.register_alias("nameA", "nameB");
    config.set("nameA", "erer").unwrap();
    assert_eq!(config.get_string("nameB"), "erer");

    config.set("nameB", "other").unwrap();
    assert_eq!(config.get_string("nameA"), "other");
}

#[test]
fn test_alias_registered_after_values() {
    let config = Instance::new();
    config.set_default("nameA", "d").unwrap();
    config.bind_flag("nameA", flags(&["--port", "9"]), "port");
    config.register_alias("nameA", "nameB");

    assert_eq!(config.get_string("nameB"), "9");
    assert_eq!(config.all_keys(), ["nameb"]);
}

#[test]
fn test_alias_of_alias_target() {
    let config = Instance::new();
    config.register_alias("a", "b");
    config.set("a", 1).unwrap();
    config.register_alias("b", "c");

    assert_eq!(config.get_int("a"), 1);
    assert_eq!(config.source_of("a"), Some(Tier::Override));
}

#[test]
fn test_instance_isolation() {
    let x = Instance::new();
    let y = Instance::new();
    x.set_default("ContentDir", "content").unwrap();
    y.set_default("ContentDir", "foobar").unwrap();

    assert_eq!(x.get_string("contentdir"), "content");
    assert_eq!(y.get_string("contentdir"), "foobar");
    assert_ne!(x.all_settings(), y.all_settings());
}

#[test]
fn test_all_settings_merges_tiers() {
    let config = Instance::new();
    config.set_default("mysql.port", 3306).unwrap();
    config.set_config_type("yaml");
    config.read_config(b"mysql:\n  addr: file\n").unwrap();
    config.set("name", "override").unwrap();

    let yaml = serde_yaml::to_string(&config.all_settings()).unwrap();
    assert_eq!(yaml, "mysql:\n  addr: file\n  port: 3306\nname: override\n");
}

#[test]
fn test_scalar_override_hides_file_mapping() {
    #[derive(Deserialize)]
    struct Root {
        a: String,
    }

    let config = Instance::new();
    config.set_config_type("yaml");
    config.read_config(b"a:\n  b: 1\n").unwrap();
    config.set("a", "scalar").unwrap();
    assert_eq!(config.get_string("a"), "scalar");

    assert_eq!(config.all_keys(), ["a"]);
    assert_eq!(config.all_settings().get("a"), Some(&Value::from("scalar")));

    let root: Root = config.unmarshal().unwrap();
    assert_eq!(root.a, "scalar");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.yaml");
    config.write_config_as(path.to_str().unwrap()).unwrap();
    let written = Instance::new();
    written.set_config_file(path.to_str().unwrap());
    written.read_in_config().unwrap();
    assert_eq!(written.get_string("a"), "scalar");
    assert!(written.sub("a").is_none());
}

#[test]
fn test_sub_tree() {
    let config = Instance::new();
    config.set_config_type("yaml");
    config.read_config(b"cache:\n  size: 10\n  ttl: 5m\n").unwrap();
    config.set_default("cache.policy", "lru").unwrap();

    let cache = config.sub("cache").unwrap();
    assert_eq!(cache.get_int("size"), 10);
    assert_eq!(cache.get_string("policy"), "lru");
    assert_eq!(cache.get_duration("ttl").as_secs(), 300);
}
