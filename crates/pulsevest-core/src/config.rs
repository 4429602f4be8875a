use crate::app_config::{AppConfig, Environment, SignatureAlgorithm, StorageCredentials};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a pure
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PULSEVEST_ENV", "development"))?;

    let bind_addr = parse("PULSEVEST_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PULSEVEST_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("PULSEVEST_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PULSEVEST_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PULSEVEST_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let rate_limit_max_requests = parse_usize("PULSEVEST_RATE_LIMIT_MAX_REQUESTS", "120")?;
    let rate_limit_window_secs = parse_u64("PULSEVEST_RATE_LIMIT_WINDOW_SECS", "60")?;

    let storage = parse_storage_credentials(
        optional("PULSEVEST_STORAGE_CLOUD_NAME"),
        optional("PULSEVEST_STORAGE_API_KEY"),
        optional("PULSEVEST_STORAGE_API_SECRET"),
    )?;
    let storage_base_url = or_default("PULSEVEST_STORAGE_BASE_URL", "https://api.cloudinary.com");
    let storage_signature_algorithm =
        parse_signature_algorithm(&or_default("PULSEVEST_STORAGE_SIGNATURE_ALGORITHM", "sha1"))?;
    let upload_timeout_secs = parse_u64("PULSEVEST_UPLOAD_TIMEOUT_SECS", "120")?;
    let upload_max_bytes = parse_usize("PULSEVEST_UPLOAD_MAX_BYTES", "104857600")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        rate_limit_max_requests,
        rate_limit_window_secs,
        storage,
        storage_base_url,
        storage_signature_algorithm,
        upload_timeout_secs,
        upload_max_bytes,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than the three known names.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSEVEST_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

fn parse_signature_algorithm(s: &str) -> Result<SignatureAlgorithm, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "sha1" => Ok(SignatureAlgorithm::Sha1),
        "sha256" => Ok(SignatureAlgorithm::Sha256),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSEVEST_STORAGE_SIGNATURE_ALGORITHM".to_string(),
            reason: format!("expected sha1 or sha256; got '{other}'"),
        }),
    }
}

/// Storage credentials are all-or-nothing: a partial set is a misconfiguration.
fn parse_storage_credentials(
    cloud_name: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
) -> Result<Option<StorageCredentials>, ConfigError> {
    match (cloud_name, api_key, api_secret) {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(Some(StorageCredentials {
            cloud_name,
            api_key,
            api_secret,
        })),
        (None, None, None) => Ok(None),
        (cloud_name, api_key, _) => {
            let missing = if cloud_name.is_none() {
                "PULSEVEST_STORAGE_CLOUD_NAME"
            } else if api_key.is_none() {
                "PULSEVEST_STORAGE_API_KEY"
            } else {
                "PULSEVEST_STORAGE_API_SECRET"
            };
            Err(ConfigError::InvalidEnvVar {
                var: missing.to_string(),
                reason: "storage credentials must be set together".to_string(),
            })
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
