//! Startup configuration: credentials from the environment plus file-based
//! settings. Every failure here is fatal for the binaries.
pub mod llm;

use std::env;
use std::path::PathBuf;

pub const DEFAULT_SUBSCRIBERS_PATH: &str = "data/subscribers.csv";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub(crate) fn require(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub from: String,
}

/// Everything read from the process environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub serp_api_key: String,
    pub news_api_key: String,
    pub reddit: RedditCredentials,
    /// `None` when no SMTP variables are set; mail surfaces then refuse to send.
    pub smtp: Option<SmtpSettings>,
    pub subscribers_path: PathBuf,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let smtp = match env::var("SMTP_HOST") {
            Ok(h) if !h.trim().is_empty() => Some(SmtpSettings {
                host: h.trim().to_string(),
                user: require("SMTP_USER")?,
                pass: require("SMTP_PASS")?,
                from: require("DIGEST_EMAIL_FROM")?,
            }),
            _ => None,
        };
        Ok(Self {
            serp_api_key: require("SERP_API_KEY")?,
            news_api_key: require("NEWS_API_KEY")?,
            reddit: RedditCredentials {
                client_id: require("REDDIT_CLIENT_ID")?,
                secret: require("REDDIT_SECRET")?,
            },
            smtp,
            subscribers_path: env::var("SUBSCRIBERS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SUBSCRIBERS_PATH)),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}
