//! Client configuration.
//!
//! The file format is the Firebase web config object (`apiKey`, `projectId`, ...)
//! serialized as JSON, optionally extended with a `routes` section. Values are
//! resolved with priority: environment variables > config file > defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const IDENTITY_TOOLKIT_V1_API: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_V1_API: &str = "https://securetoken.googleapis.com/v1";
const FIRESTORE_V1_API: &str = "https://firestore.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Config is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Routes the navigation guard redirects between.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Routes {
    pub login: String,
    pub home: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub api_key: String,
    pub project_id: String,
    pub auth_domain: Option<String>,
    /// Identity Toolkit base URL.
    pub auth_url: String,
    /// Secure Token base URL, used for ID token refresh.
    pub token_url: String,
    /// Firestore REST base URL, without the `projects/...` suffix.
    pub firestore_url: String,
    pub routes: Routes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            auth_domain: None,
            auth_url: IDENTITY_TOOLKIT_V1_API.to_string(),
            token_url: SECURE_TOKEN_V1_API.to_string(),
            firestore_url: FIRESTORE_V1_API.to_string(),
            routes: Routes::default(),
        }
    }
}

impl Config {
    /// Parses a Firebase web config JSON object. Unknown keys such as
    /// `storageBucket` or `measurementId` are ignored.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads configuration with priority: env vars > config file > defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading overrides through `var` instead of
    /// the process environment.
    pub fn load_with_env<F>(path: Option<&Path>, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
                Self::from_json(&contents)?
            }
            None => Self::default(),
        };
        config.apply_env(var);
        config.validate()?;
        Ok(config)
    }

    /// Applies `BUDDYCALL_*` overrides and the Firebase emulator host variables.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = var("BUDDYCALL_API_KEY") {
            self.api_key = api_key;
        }
        if let Some(project_id) = var("BUDDYCALL_PROJECT_ID") {
            self.project_id = project_id;
        }
        if let Some(host) = var("FIREBASE_AUTH_EMULATOR_HOST") {
            self.auth_url = format!("http://{}/identitytoolkit.googleapis.com/v1", host);
            self.token_url = format!("http://{}/securetoken.googleapis.com/v1", host);
        }
        if let Some(host) = var("FIRESTORE_EMULATOR_HOST") {
            self.firestore_url = format!("http://{}/v1", host);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingField("apiKey"));
        }
        if self.project_id.is_empty() {
            return Err(ConfigError::MissingField("projectId"));
        }
        Ok(())
    }

    /// Resource name of the default database.
    pub fn database_name(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    pub fn database_url(&self) -> String {
        format!(
            "{}/{}",
            self.firestore_url.trim_end_matches('/'),
            self.database_name()
        )
    }
}
