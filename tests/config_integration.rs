use barista_chat::config::{AppConfig, DEFAULT_MODEL, OverlapPolicy};
use serial_test::serial;
use std::env;
use std::fs;

const ENV_VARS: &[&str] = &[
    "CONFIG_FILE",
    "PORT",
    "PROXY_ENDPOINT",
    "PROXY_MODEL",
    "OPENAI_KEY",
    "OVERLAP_POLICY",
    "BARISTA_SERVER__PORT",
    "BARISTA_PROXY__MODEL",
    "BARISTA_WIDGET__RESET_CONTINUATION_ON_CLEAR",
    "BARISTA_PROXY__TIMEOUT_SECS",
    "BARISTA_SERVER__REQUEST_TIMEOUT_SECS",
];

// Clear environment variables that might interfere with tests
fn clear_env_vars() {
    for var in ENV_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn load(args: &[&str]) -> Result<AppConfig, config::ConfigError> {
    let argv = std::iter::once("barista-chat").chain(args.iter().copied());
    AppConfig::load_from_args(argv)
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]).expect("defaults should load");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.proxy.model, DEFAULT_MODEL);
    assert!(config.proxy.api_key.is_empty());
    assert_eq!(config.widget.overlap_policy, OverlapPolicy::Serialize);
    assert!(!config.widget.reset_continuation_on_clear);
    assert_eq!(config.persona.bot_prefix, "👽 ");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("BARISTA_SERVER__PORT", "9090");
        env::set_var("BARISTA_PROXY__MODEL", "gpt-4.1-mini");
        env::set_var("BARISTA_WIDGET__RESET_CONTINUATION_ON_CLEAR", "true");
    }

    let config = load(&[]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.proxy.model, "gpt-4.1-mini");
    assert!(config.widget.reset_continuation_on_clear);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("BARISTA_SERVER__PORT", "9090");
        env::set_var("OPENAI_KEY", "sk-from-env");
    }

    let config = load(&["--port", "8181", "--overlap-policy", "Concurrent"])
        .expect("Failed to load config");
    assert_eq!(config.server.port, 8181);
    assert_eq!(config.proxy.api_key, "sk-from-env");
    assert_eq!(config.widget.overlap_policy, OverlapPolicy::Concurrent);

    // The key never shows up in debug output.
    assert!(!format!("{:?}", config.proxy).contains("sk-from-env"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("barista.yaml");
    fs::write(
        &file_path,
        r#"
server:
  port: 7070
persona:
  loading_text: "Brewing..."
widget:
  overlap_policy: concurrent
"#,
    )
    .expect("Failed to write temp config");

    // Point AppConfig at the file through the env fallback of --config
    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = load(&[]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.persona.loading_text, "Brewing...");
    // Unset persona fields keep their defaults.
    assert_eq!(config.persona.bot_prefix, "👽 ");
    assert_eq!(config.widget.overlap_policy, OverlapPolicy::Concurrent);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let cwd_path = "config.yaml";
    fs::write(cwd_path, "server:\n  port: 6060\n").expect("Failed to write ./config.yaml");

    let config = load(&[]);
    fs::remove_file(cwd_path).unwrap();

    assert_eq!(config.expect("Failed to load config").server.port, 6060);
}

#[test]
#[serial]
fn test_invalid_endpoint_is_rejected() {
    clear_env_vars();

    let err = load(&["--endpoint", "ftp://proxy.example"]).unwrap_err();
    assert!(err.to_string().contains("http or https"));

    let err = load(&["--endpoint", "not a url"]).unwrap_err();
    assert!(err.to_string().contains("not a valid URL"));
}

#[test]
#[serial]
fn test_empty_model_is_rejected() {
    clear_env_vars();
    assert!(load(&["--model", "  "]).is_err());
}

#[test]
#[serial]
fn test_proxy_timeout_longer_than_request_timeout_is_rejected() {
    clear_env_vars();
    unsafe {
        env::set_var("BARISTA_PROXY__TIMEOUT_SECS", "300");
    }

    let err = load(&[]).unwrap_err();
    assert!(err.to_string().contains("server.request_timeout_secs"));

    unsafe {
        env::set_var("BARISTA_SERVER__REQUEST_TIMEOUT_SECS", "600");
    }
    let config = load(&[]).expect("longer request timeout should load");
    assert_eq!(config.proxy.timeout_secs, 300);

    clear_env_vars();
}
