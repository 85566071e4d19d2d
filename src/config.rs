use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_API_URL: &str =
    "https://sharingphotoapp-bwbrbnd9e5csf6hj.canadacentral-01.azurewebsites.net/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            token: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Reads `PHOTOFEED_*` variables from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("PHOTOFEED_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_owned();
        }

        config.token = lookup("PHOTOFEED_TOKEN").filter(|v| !v.trim().is_empty());

        if let Some(value) = lookup("PHOTOFEED_TIMEOUT_SECS") {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid {
                    name: "PHOTOFEED_TIMEOUT_SECS",
                    expected: "a positive number of seconds",
                    value: value.clone(),
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = lookup("PHOTOFEED_PAGE_SIZE") {
            config.page_size = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
                .ok_or(ConfigError::Invalid {
                    name: "PHOTOFEED_PAGE_SIZE",
                    expected: "between 1 and 100",
                    value: value.clone(),
                })?;
        }

        Ok(config)
    }
}
