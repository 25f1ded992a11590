use std::{fs, time::Duration};

use harbor_host::config::{ConfigLoadError, ConfigLoader, EnvConfig};
use harbor_model::ResourceKind;
use tempfile::TempDir;

const MODEL: &str = r#"
shutdown_timeout = "5s"

[server]
host = "0.0.0.0"
port = 9100

[sandbox]
codespace_name = "from-file"
port_forwarding_domain = "app.github.dev"

[[resources]]
name = "cache"
kind = "container"
endpoints = [
  { name = "tcp", scheme = "tcp", port = 6379 },
  { name = "metrics", scheme = "http", port = 9121, internal = true },
]

[[simulated_resources]]
name = "warmup"
startup_delay = "2m 30s"
"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("harbor.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn file_model_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, MODEL);

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(EnvConfig::default())
        .unwrap();
    let config = load.config;

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
    assert!(!config.metadata.sample_model);

    let cache = &config.resources[0];
    assert_eq!(cache.kind, ResourceKind::Container);
    assert_eq!(cache.endpoints.len(), 2);
    assert!(cache.endpoints[1].is_internal());

    assert_eq!(config.simulated_resources[0].name, "warmup");
    assert_eq!(
        config.simulated_resources[0].startup_delay,
        Duration::from_secs(150)
    );

    // codespace settings without CODESPACES stay disabled, with a warning
    assert!(!config.sandbox.enabled);
    assert!(
        load.warnings
            .items
            .iter()
            .any(|w| w.message.contains("CODESPACES"))
    );
}

#[test]
fn environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, MODEL);

    let env = EnvConfig {
        codespaces: Some(true),
        codespace_name: Some("fluffy-train".into()),
        health_port: Some(9200),
        shutdown_timeout: Some("1s".into()),
        ..EnvConfig::default()
    };
    let config = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(env)
        .unwrap()
        .config;

    assert!(config.sandbox.enabled);
    assert_eq!(config.sandbox.codespace_name.as_deref(), Some("fluffy-train"));
    assert_eq!(
        config.sandbox.port_forwarding_domain.as_deref(),
        Some("app.github.dev")
    );
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9200);
    assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
}

#[test]
fn config_path_from_environment_is_used() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, MODEL);

    let env = EnvConfig {
        config_path: Some(path),
        ..EnvConfig::default()
    };
    let config = ConfigLoader::new().load_from_env(env).unwrap().config;
    assert_eq!(config.resources[0].name, "cache");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = ConfigLoader::new()
        .with_config_path(dir.path().join("absent.toml"))
        .load_from_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn missing_config_from_environment_is_an_error() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.toml");
    let env = EnvConfig {
        config_path: Some(absent.clone()),
        ..EnvConfig::default()
    };

    let err = ConfigLoader::new().load_from_env(env).unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { path } if path == absent));
}

#[test]
fn explicit_path_wins_over_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, MODEL);
    let env = EnvConfig {
        config_path: Some(dir.path().join("absent.toml")),
        ..EnvConfig::default()
    };

    let config = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(env)
        .unwrap()
        .config;
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
}

#[test]
fn without_a_file_the_sample_model_is_used() {
    let load = ConfigLoader::new()
        .load_from_env(EnvConfig::default())
        .unwrap();

    assert!(load.config.metadata.sample_model);
    let names: Vec<&str> = load
        .config
        .resources
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["pg", "pgadmin", "apiservice", "webfrontend"]);
    assert_eq!(load.config.simulated_resources[0].name, "provisioner");
    assert_eq!(
        load.config.simulated_resources[0].startup_delay,
        Duration::from_secs(20)
    );
    assert!(
        load.warnings
            .items
            .iter()
            .any(|w| w.message.contains("sample application model"))
    );
}

#[test]
fn invalid_duration_is_reported_with_its_field() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [[simulated_resources]]
        name = "warmup"
        startup_delay = "soon"
        "#,
    );

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(EnvConfig::default())
        .unwrap_err();
    match err {
        ConfigLoadError::InvalidDuration { field, value, .. } => {
            assert_eq!(field, "warmup.startup_delay");
            assert_eq!(value, "soon");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_and_invalid_names_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [[resources]]
        name = "pg"
        kind = "container"

        [[simulated_resources]]
        name = "pg"
        "#,
    );
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::DuplicateResource { name } if name == "pg"));

    let path = write_config(
        &dir,
        r#"
        [[resources]]
        name = "web_frontend"
        kind = "project"
        "#,
    );
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::InvalidModel(_)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[[resources]\nname = ");
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_from_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Parse { .. }));
}
