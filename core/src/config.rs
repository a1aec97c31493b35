//! Connection settings shared by every resource client.

use crate::error::ConfigurationError;

pub const DEFAULT_BASE_URL: &str = "https://site-api.datocms.com";

const TOKEN_VAR: &str = "DATO_API_TOKEN";
const BASE_URL_VAR: &str = "DATO_BASE_URL";

/// Access token, base URL and extra headers for a `SiteClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_token: String,
    pub base_url: String,
    /// Sent with every site API request, after the standard headers.
    pub extra_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            extra_headers: Vec::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Read `DATO_API_TOKEN` and, optionally, `DATO_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let token = lookup(TOKEN_VAR)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigurationError::InvalidConfig(format!("{TOKEN_VAR} is not set")))?;
        let config = Self::new(token);
        Ok(match lookup(BASE_URL_VAR) {
            Some(url) if !url.trim().is_empty() => config.with_base_url(url.trim()),
            _ => config,
        })
    }

    /// Reject configurations no request could succeed with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.api_token.trim().is_empty() {
            return Err(ConfigurationError::InvalidConfig("api token is empty".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidConfig(format!(
                "base url `{}` must start with http:// or https://",
                self.base_url
            )));
        }
        Ok(())
    }
}
