use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::client::{Coverage, RegistryConfig};
use crate::commands::ServerConfig;
use crate::security::auth::Credentials;
use crate::utils::logging::LogLevel;

/// A SORACOM CLI profile (`~/.soracom/<name>.json`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub auth_key_id: String,
    #[serde(default)]
    pub auth_key: String,
    #[serde(default)]
    pub coverage_type: Option<Coverage>,
}

impl Profile {
    pub fn path(home: &Path, name: &str) -> PathBuf {
        home.join(".soracom").join(format!("{name}.json"))
    }

    pub fn load(home: &Path, name: &str) -> Result<Self> {
        let path = Self::path(home, name);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to load profile {name}: reading {}", path.display()))?;
        let profile: Profile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to load profile {name}: parsing JSON"))?;
        if profile.auth_key_id.is_empty() || profile.auth_key.is_empty() {
            bail!("Failed to load profile {name}: Profile does not contain required authKeyId and authKey");
        }
        Ok(profile)
    }
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub coverage: Option<Coverage>,
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub coverage: Coverage,
    pub log_level: LogLevel,
    pub jp_endpoint: Option<String>,
    pub global_endpoint: Option<String>,
}

impl Config {
    pub fn from_env(overrides: &Overrides) -> Result<Self> {
        let home = dirs::home_dir();
        Self::resolve(|key| std::env::var(key).ok(), home.as_deref(), overrides)
    }

    /// Profile credentials win over `SORACOM_AUTH_KEY_ID`/`SORACOM_AUTH_KEY`.
    /// Coverage: flag, then `SORACOM_COVERAGE_TYPE`, then profile, then `jp`.
    pub fn resolve<F>(lookup: F, home: Option<&Path>, overrides: &Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let profile = match overrides.profile.clone().or_else(|| var("SORACOM_PROFILE")) {
            Some(name) => {
                let home = home.context("Cannot find home directory")?;
                Some(Profile::load(home, &name)?)
            }
            None => None,
        };

        let auth_key_id = profile
            .as_ref()
            .map(|p| p.auth_key_id.clone())
            .or_else(|| var("SORACOM_AUTH_KEY_ID"));
        let auth_key = profile
            .as_ref()
            .map(|p| p.auth_key.clone())
            .or_else(|| var("SORACOM_AUTH_KEY"));
        let (Some(auth_key_id), Some(auth_key)) = (auth_key_id, auth_key) else {
            bail!(
                "Authentication required: Set SORACOM_AUTH_KEY_ID and SORACOM_AUTH_KEY environment variables, or use SORACOM_PROFILE environment variable to specify a SORACOM CLI profile"
            );
        };

        let coverage = match overrides.coverage {
            Some(coverage) => coverage,
            None => match var("SORACOM_COVERAGE_TYPE") {
                Some(raw) => raw
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("invalid SORACOM_COVERAGE_TYPE")?,
                None => profile.as_ref().and_then(|p| p.coverage_type).unwrap_or_default(),
            },
        };

        let log_level = match overrides.log_level {
            Some(level) => level,
            None => match var("SORACOM_LOG_LEVEL") {
                Some(raw) => raw
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("invalid SORACOM_LOG_LEVEL")?,
                None => LogLevel::default(),
            },
        };

        Ok(Self {
            credentials: Credentials::new(auth_key_id, auth_key),
            coverage,
            log_level,
            jp_endpoint: var("SORACOM_ENDPOINT_JP"),
            global_endpoint: var("SORACOM_ENDPOINT_G"),
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            credentials: self.credentials.clone(),
            coverage: self.coverage,
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        let mut config = RegistryConfig::default();
        if let Some(endpoint) = &self.jp_endpoint {
            config.jp_endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &self.global_endpoint {
            config.global_endpoint = endpoint.clone();
        }
        config
    }
}
