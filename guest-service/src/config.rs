use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use guestlist_shared::store::dynamo::{
    GUEST_SERIALS_TABLE_NAME, GUEST_TABLE_NAME, NOTIFICATION_LOG_TABLE_NAME,
};
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
// API Gateway stage the routes sit under when deployed
const STAGE_PREFIX: &str = "/Prod";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub guests_table: String,
    pub serials_table: String,
    pub notification_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub remove_base_path: bool,
    pub host: IpAddr,
    pub port: u16,
    pub store_timeout: Duration,
    /// Passthrough filter endpoints are for trusted internal callers only
    pub allow_raw_filters: bool,
    pub lambda_function: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            guests_table: GUEST_TABLE_NAME.to_string(),
            serials_table: GUEST_SERIALS_TABLE_NAME.to_string(),
            notification_table: NOTIFICATION_LOG_TABLE_NAME.to_string(),
            dynamodb_endpoint: None,
            remove_base_path: true,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            allow_raw_filters: true,
            lambda_function: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let lambda_function = var("AWS_LAMBDA_FUNCTION_NAME");

        Ok(Self {
            guests_table: var("GUESTS_TABLE").unwrap_or(defaults.guests_table),
            serials_table: var("GUEST_SERIALS_TABLE").unwrap_or(defaults.serials_table),
            notification_table: var("NOTIFICATION_LOG_TABLE")
                .unwrap_or(defaults.notification_table),
            dynamodb_endpoint: var("DYNAMODB_ENDPOINT"),
            // Locally there is no stage prefix unless asked for
            remove_base_path: parse_bool("REMOVE_BASE_PATH", lambda_function.is_none())?,
            host: parse_var("HOST", defaults.host)?,
            port: parse_var("PORT", defaults.port)?,
            store_timeout: Duration::from_secs(parse_var(
                "STORE_TIMEOUT_SECS",
                DEFAULT_STORE_TIMEOUT_SECS,
            )?),
            allow_raw_filters: parse_bool("ALLOW_RAW_FILTERS", defaults.allow_raw_filters)?,
            lambda_function,
        })
    }

    pub fn route_prefix(&self) -> &'static str {
        if self.remove_base_path {
            ""
        } else {
            STAGE_PREFIX
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn is_lambda(&self) -> bool {
        self.lambda_function.is_some()
    }
}

// Unset and empty are the same thing
fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                reason: "expected true or false".into(),
            }),
        },
    }
}
