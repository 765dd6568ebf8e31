//! Credential providers
//!
//! The session asks for a credential before every orchestration, so a key
//! added while the program runs is picked up on the next request.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::LlmConfig;

pub trait CredentialProvider: Send + Sync {
    /// The API key, or `None` when absent or blank
    fn credential(&self) -> Option<String>;

    /// Where the user should put a key, for the missing-key message
    fn hint(&self) -> String;
}

/// Reads the key from an environment variable, then from a key file
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
    file: Option<PathBuf>,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>, file: Option<PathBuf>) -> Self {
        Self { var: var.into(), file }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.api_key_env.clone(), config.api_key_file.clone())
    }
}

impl CredentialProvider for EnvCredentials {
    fn credential(&self) -> Option<String> {
        if let Ok(value) = std::env::var(&self.var)
            && !value.trim().is_empty()
        {
            debug!(var = %self.var, "credential: found in environment");
            return Some(value.trim().to_string());
        }

        let path = self.file.as_ref()?;
        match fs::read_to_string(path) {
            Ok(content) if !content.trim().is_empty() => {
                debug!(?path, "credential: found in key file");
                Some(content.trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                warn!(?path, error = %e, "credential: failed to read key file");
                None
            }
        }
    }

    fn hint(&self) -> String {
        match &self.file {
            Some(path) => format!("{} environment variable (or write it to {})", self.var, path.display()),
            None => format!("{} environment variable", self.var),
        }
    }
}

/// A fixed key
#[derive(Clone)]
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredentials {
    fn credential(&self) -> Option<String> {
        self.0.as_ref().filter(|k| !k.trim().is_empty()).cloned()
    }

    fn hint(&self) -> String {
        "API key".to_string()
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticCredentials").field(&self.0.as_ref().map(|_| "***")).finish()
    }
}
