//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file from the working directory when one exists
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ODATALINK_SERVICE_ROOT`: Service root URL (required)
//! - `ODATALINK_JSON_FORMAT`: `light` or `verbose`
//! - `ODATALINK_TIMEOUT_SECS`: Request timeout in seconds
//! - `ODATALINK_MAX_ATTEMPTS`: Transport attempts per request
//! - `ODATALINK_USER_AGENT`: User agent header value
//! - `ODATALINK_ACCESS_TOKEN`: Static bearer token
//! - `ODATALINK_BATCH`: Whether `execute` uses `$batch` (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./odatalink.json` or `./odatalink.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../odatalink.json` or `../odatalink.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use odatalink_domain::{ClientConfig, ClientError, JsonDialect, JsonFormat, Result};

const ENV_SERVICE_ROOT: &str = "ODATALINK_SERVICE_ROOT";
const ENV_JSON_FORMAT: &str = "ODATALINK_JSON_FORMAT";
const ENV_TIMEOUT_SECS: &str = "ODATALINK_TIMEOUT_SECS";
const ENV_MAX_ATTEMPTS: &str = "ODATALINK_MAX_ATTEMPTS";
const ENV_USER_AGENT: &str = "ODATALINK_USER_AGENT";
const ENV_ACCESS_TOKEN: &str = "ODATALINK_ACCESS_TOKEN";
const ENV_BATCH: &str = "ODATALINK_BATCH";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading an
/// optional `.env` file). If the service root is missing, falls back to
/// loading from a config file.
///
/// # Errors
/// Returns `ClientError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load() -> Result<ClientConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(ClientError::config(format!("Invalid .env file: {e}"))),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `ODATALINK_SERVICE_ROOT` is required; every other setting falls
/// back to its default.
///
/// # Errors
/// Returns `ClientError::Config` if the service root is missing or any
/// variable has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::new(env_var(ENV_SERVICE_ROOT)?);

    if let Some(format) = optional_env(ENV_JSON_FORMAT) {
        let dialect = format
            .parse::<JsonDialect>()
            .map_err(|e| ClientError::config(format!("Invalid JSON format: {e}")))?;
        config.json_format = JsonFormat { dialect, ..config.json_format };
    }
    if let Some(timeout) = optional_env(ENV_TIMEOUT_SECS) {
        config.timeout_secs = timeout
            .parse::<u64>()
            .map_err(|e| ClientError::config(format!("Invalid timeout: {e}")))?;
    }
    if let Some(attempts) = optional_env(ENV_MAX_ATTEMPTS) {
        config.max_attempts = attempts
            .parse::<usize>()
            .map_err(|e| ClientError::config(format!("Invalid max attempts: {e}")))?;
    }
    if let Some(agent) = optional_env(ENV_USER_AGENT) {
        config.user_agent = agent;
    }
    config.access_token = optional_env(ENV_ACCESS_TOKEN);
    config.batch_by_default = env_bool(ENV_BATCH, false);

    config.validate()
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ClientError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ClientError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ClientError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ClientError::config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)?.validate()
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ClientError::config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ClientError::config(format!("Invalid JSON format: {e}"))),
        _ => Err(ClientError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
        candidates.push(cwd.join("../odatalink.json"));
        candidates.push(cwd.join("../odatalink.toml"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("odatalink.json"),
        dir.join("odatalink.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `ClientError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| ClientError::config(format!("Missing required environment variable: {key}")))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 7] = [
        ENV_SERVICE_ROOT,
        ENV_JSON_FORMAT,
        ENV_TIMEOUT_SECS,
        ENV_MAX_ATTEMPTS,
        ENV_USER_AGENT,
        ENV_ACCESS_TOKEN,
        ENV_BATCH,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("ODATALINK_TEST_BOOL_YES", "YES");
        std::env::set_var("ODATALINK_TEST_BOOL_OFF", "off");
        std::env::remove_var("ODATALINK_TEST_BOOL_MISSING");

        assert!(env_bool("ODATALINK_TEST_BOOL_YES", false));
        assert!(!env_bool("ODATALINK_TEST_BOOL_OFF", true));
        assert!(env_bool("ODATALINK_TEST_BOOL_MISSING", true));
        assert!(!env_bool("ODATALINK_TEST_BOOL_MISSING", false));

        std::env::remove_var("ODATALINK_TEST_BOOL_YES");
        std::env::remove_var("ODATALINK_TEST_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var(ENV_SERVICE_ROOT, "https://host/_api");
        std::env::set_var(ENV_JSON_FORMAT, "verbose");
        std::env::set_var(ENV_TIMEOUT_SECS, "10");
        std::env::set_var(ENV_MAX_ATTEMPTS, "3");
        std::env::set_var(ENV_USER_AGENT, "tests/1.0");
        std::env::set_var(ENV_ACCESS_TOKEN, "secret");
        std::env::set_var(ENV_BATCH, "true");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.service_root_url, "https://host/_api/");
        assert_eq!(config.json_format.dialect, JsonDialect::Verbose);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.user_agent, "tests/1.0");
        assert_eq!(config.access_token.as_deref(), Some("secret"));
        assert!(config.batch_by_default);
    }

    #[test]
    fn test_load_from_env_missing_root() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var(ENV_SERVICE_ROOT, "https://host/");
        std::env::set_var(ENV_TIMEOUT_SECS, "soon");
        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(ClientError::Config { .. })));
    }

    #[test]
    fn test_load_from_file_toml() {
        let mut file = Builder::new().suffix(".toml").tempfile().expect("temp file");
        writeln!(
            file,
            r#"
service_root_url = "https://host/v1.0"
batch_by_default = true

[json_format]
dialect = "light"
casing = "camel"
"#
        )
        .expect("write config");

        let config = load_from_file(Some(file.path().to_path_buf())).expect("config");
        assert_eq!(config.service_root_url, "https://host/v1.0/");
        assert!(config.batch_by_default);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_load_from_file_rejects_unknown_extension() {
        let file = Builder::new().suffix(".yaml").tempfile().expect("temp file");
        let err = load_from_file(Some(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));
    }

    #[test]
    fn test_load_from_file_missing_path() {
        let err = load_from_file(Some(PathBuf::from("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }
}
