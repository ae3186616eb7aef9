use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::chat::FailurePolicy;

pub const DEFAULT_API_VERSION: &str = "2023-06-01-preview";
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60 * 10;

/// Required settings as `(primary, legacy)` environment variable names.
/// The legacy name is only consulted when the primary one is unset or
/// empty.
const ENDPOINT_VARS: (&str, &str) = ("ENDPOINT_URL", "AZURE_OPENAI_ENDPOINT");
const API_KEY_VARS: (&str, &str) = ("API_KEY", "AZURE_OPENAI_API_KEY");
const MODEL_VARS: (&str, &str) = ("MODEL_NAME", "AZURE_OPENAI_MODEL");

const API_VERSION_VAR: &str = "CHAT_API_VERSION";
const SYSTEM_MESSAGE_VAR: &str = "CHAT_SYSTEM_MESSAGE";
const REQUEST_TIMEOUT_VAR: &str = "CHAT_REQUEST_TIMEOUT_SECS";
const ON_FAILURE_VAR: &str = "CHAT_ON_FAILURE";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(
        "Please set ENDPOINT_URL, API_KEY, and MODEL_NAME environment variables (missing: {})",
        .0.join(", ")
    )]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub api_version: String,
    pub system_message: String,
    /// `None` means the request may block until the peer gives up.
    pub request_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. Empty values are
    /// treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |(primary, legacy): (&str, &str)| get(primary).or_else(|| get(legacy));

        let endpoint = required(ENDPOINT_VARS);
        let api_key = required(API_KEY_VARS);
        let model = required(MODEL_VARS);

        let (endpoint, api_key, model) = match (endpoint, api_key, model) {
            (Some(endpoint), Some(api_key), Some(model)) => (endpoint, api_key, model),
            (endpoint, api_key, model) => {
                let missing = [
                    (endpoint.is_none(), ENDPOINT_VARS.0),
                    (api_key.is_none(), API_KEY_VARS.0),
                    (model.is_none(), MODEL_VARS.0),
                ]
                .into_iter()
                .filter_map(|(is_missing, name)| is_missing.then_some(name))
                .collect();
                return Err(ConfigError::Missing(missing));
            }
        };

        let api_version = get(API_VERSION_VAR).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let system_message =
            get(SYSTEM_MESSAGE_VAR).unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string());

        let request_timeout = match get(REQUEST_TIMEOUT_VAR) {
            None => Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        name: REQUEST_TIMEOUT_VAR,
                        value,
                    });
                }
            },
        };

        let failure_policy = match get(ON_FAILURE_VAR) {
            None => FailurePolicy::default(),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: ON_FAILURE_VAR,
                value,
            })?,
        };

        Ok(Self {
            endpoint,
            api_key,
            model,
            api_version,
            system_message,
            request_timeout,
            failure_policy,
        })
    }
}
