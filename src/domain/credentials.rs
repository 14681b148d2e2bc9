// Credential and preference domain models
use serde::{Deserialize, Serialize};

/// Collector credentials read from the preference store on every start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub auth_token: Option<String>,
    pub collector_url: String,
}

impl Credentials {
    pub fn new(auth_token: Option<String>, collector_url: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
            collector_url: collector_url.into(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.auth_token.is_some()
    }
}

/// Settings that survive process restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Preferences {
    pub auth_token: Option<String>,
    pub api_url: Option<String>,
    pub tracking_enabled: bool,
}

impl Preferences {
    pub fn credentials(&self, default_url: &str) -> Credentials {
        let url = self
            .api_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_url.to_string());
        Credentials::new(self.auth_token.clone(), url)
    }
}
