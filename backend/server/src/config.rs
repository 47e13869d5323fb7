use std::{env, fmt::Display, fs::read_to_string, path::Path, str::FromStr, time::Duration};

use roster::{GatewayConfig, remote::DEFAULT_SERVER_URL};
use thiserror::Error;
use tracing::{info, warn};

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {message}")]
    Invalid { key: String, message: String },

    #[error("Secret {0} not found in {SECRETS_DIR} or the environment")]
    MissingSecret(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub parse_server_url: String,
    pub parse_application_id: String,
    pub parse_rest_api_key: String,
    pub session_ttl: Duration,
    pub request_timeout: Duration,
    pub cors_max_age: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            parse_server_url: try_load("PARSE_SERVER_URL", DEFAULT_SERVER_URL)?,
            parse_application_id: read_secret("PARSE_APPLICATION_ID")?,
            parse_rest_api_key: read_secret("PARSE_REST_API_KEY")?,
            session_ttl: Duration::from_secs(try_load("SESSION_TTL_SECS", "3600")?),
            request_timeout: Duration::from_millis(try_load("REQUEST_TIMEOUT_MS", "5000")?),
            cors_max_age: Duration::from_secs(try_load("CORS_MAX_AGE_SECS", "3600")?),
        })
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            server_url: self.parse_server_url.clone(),
            application_id: self.parse_application_id.clone(),
            rest_api_key: self.parse_rest_api_key.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key: key.to_string(),
                message: e.to_string(),
            }
        })
}

/// Docker secret file first, then a plain environment variable of the same name.
fn read_secret(secret_name: &str) -> Result<String, ConfigError> {
    let path = Path::new(SECRETS_DIR).join(secret_name);

    match read_to_string(&path) {
        Ok(secret) => return Ok(secret.trim().to_string()),
        Err(e) => warn!("Failed to read {secret_name} from file: {e}"),
    }

    var(secret_name)
        .map(|secret| secret.trim().to_string())
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| ConfigError::MissingSecret(secret_name.to_string()))
}
