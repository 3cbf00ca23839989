//! Credentials read from the environment.
//!
//! Every value is wrapped in [`SecretString`] as soon as it is read, so it
//! never appears in `Debug` output or logs.

use secrecy::SecretString;

use courier_types::config::ConfigError;

pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const LINE_CHANNEL_ACCESS_TOKEN: &str = "LINE_CHANNEL_ACCESS_TOKEN";
pub const LINE_CHANNEL_SECRET: &str = "LINE_CHANNEL_SECRET";

/// The three credentials the relay cannot run without.
pub struct RelaySecrets {
    pub google_api_key: SecretString,
    pub line_channel_access_token: SecretString,
    pub line_channel_secret: SecretString,
}

impl RelaySecrets {
    /// Read all credentials from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`. Absent and blank values are both
    /// treated as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| -> Result<SecretString, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
                .ok_or(ConfigError::MissingEnv(key))
        };

        Ok(Self {
            google_api_key: require(GOOGLE_API_KEY)?,
            line_channel_access_token: require(LINE_CHANNEL_ACCESS_TOKEN)?,
            line_channel_secret: require(LINE_CHANNEL_SECRET)?,
        })
    }
}

impl std::fmt::Debug for RelaySecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySecrets").finish_non_exhaustive()
    }
}
