use crate::credentials::Service;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SOURCE_LANG: &str = "german";
pub const DEFAULT_TARGET_LANGS: [&str; 4] = ["spanish", "german", "polish", "english"];
pub const DEFAULT_FALLBACK_TARGET_CODE: &str = "en";
pub const DEFAULT_POOL_SIZE: usize = 12;
pub const DEFAULT_TRIAL_DAYS: i64 = 7;
pub const DEFAULT_ADMIN_USER_ID: i64 = 1;
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

pub const ENV_DEEPL_API_KEY: &str = "DEEPL_API_KEY";
pub const ENV_PONS_API_SECRET: &str = "PONS_API_SECRET";
pub const ENV_GOOGLE_TRANSLATE_API_KEY: &str = "GOOGLE_TRANSLATE_API_KEY";
pub const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_TRIAL_DAYS: &str = "POLYGLOT_TRIAL_DAYS";
pub const ENV_ADMIN_USER: &str = "POLYGLOT_ADMIN_USER";
pub const ENV_POOL_SIZE: &str = "POLYGLOT_POOL_SIZE";

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Deployment-wide fallback keys, handed to admins, trial accounts and
/// anonymous callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedKeys {
    pub deepl: Option<ApiKey>,
    pub pons: Option<ApiKey>,
    pub google: Option<ApiKey>,
    pub groq: Option<ApiKey>,
}

impl SharedKeys {
    pub fn get(&self, service: Service) -> Option<&ApiKey> {
        match service {
            Service::DeepL => self.deepl.as_ref(),
            Service::Pons => self.pons.as_ref(),
            Service::Google => self.google.as_ref(),
            Service::Groq => self.groq.as_ref(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialPolicy {
    pub trial_days: i64,
    pub admin_user_id: i64,
    pub admin_username: String,
}

impl TrialPolicy {
    pub fn new(
        trial_days: i64,
        admin_user_id: i64,
        admin_username: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if trial_days <= 0 {
            return Err(ConfigError::ZeroTrialDays);
        }
        Ok(Self {
            trial_days,
            admin_user_id,
            admin_username: admin_username.into(),
        })
    }

    pub fn trial_length(&self) -> chrono::Duration {
        chrono::Duration::days(self.trial_days)
    }
}

impl Default for TrialPolicy {
    fn default() -> Self {
        Self {
            trial_days: DEFAULT_TRIAL_DAYS,
            admin_user_id: DEFAULT_ADMIN_USER_ID,
            admin_username: DEFAULT_ADMIN_USERNAME.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageDefaults {
    pub source: String,
    pub targets: Vec<String>,
    pub fallback_target_code: String,
}

impl Default for LanguageDefaults {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_LANG.to_owned(),
            targets: DEFAULT_TARGET_LANGS.iter().map(|s| (*s).to_owned()).collect(),
            fallback_target_code: DEFAULT_FALLBACK_TARGET_CODE.to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolSize(usize);

impl PoolSize {
    pub fn new(width: usize) -> Result<Self, ConfigError> {
        if width == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        Ok(Self(width))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for PoolSize {
    fn default() -> Self {
        Self(DEFAULT_POOL_SIZE)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub languages: LanguageDefaults,
    pub shared_keys: SharedKeys,
    pub trial: TrialPolicy,
    pub pool_size: PoolSize,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("worker pool size must be > 0")]
    ZeroPoolSize,
    #[error("trial length must be > 0 days")]
    ZeroTrialDays,
    #[error("{key}: expected a number, got {value:?}")]
    InvalidNumber { key: String, value: String },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Empty environment values count as unset so a blank `.env` line does not
/// fail startup.
pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) if !v.trim().is_empty() => Ok(Some(ApiKey::new(v)?)),
            _ => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_number_with_default<N>(
    cli_value: Option<N>,
    env_key: &str,
    env: &impl Env,
    default: N,
) -> Result<N, ConfigError>
where
    N: std::str::FromStr,
{
    if let Some(v) = cli_value {
        return Ok(v);
    }
    match env.var(env_key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber {
                key: env_key.to_owned(),
                value: raw,
            }),
        None => Ok(default),
    }
}

/// Command-line values for the shared keys. Unset fields fall back to the
/// environment.
#[derive(Clone, Debug, Default)]
pub struct SharedKeyArgs {
    pub deepl: Option<String>,
    pub pons: Option<String>,
    pub google: Option<String>,
    pub groq: Option<String>,
}

/// Resolves the deployment fallback keys, flags first.
pub fn resolve_shared_keys(
    cli: SharedKeyArgs,
    env: &impl Env,
) -> Result<SharedKeys, ConfigError> {
    Ok(SharedKeys {
        deepl: resolve_api_key(cli.deepl, ENV_DEEPL_API_KEY, env)?,
        pons: resolve_api_key(cli.pons, ENV_PONS_API_SECRET, env)?,
        google: resolve_api_key(cli.google, ENV_GOOGLE_TRANSLATE_API_KEY, env)?,
        groq: resolve_api_key(cli.groq, ENV_GROQ_API_KEY, env)?,
    })
}
