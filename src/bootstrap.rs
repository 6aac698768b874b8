// src/bootstrap.rs
//! Builds every external client from the environment. Binaries call this
//! once at startup and exit on error; the core only sees the built clients.
use std::sync::Arc;

use tracing::info;

use crate::config::llm::LlmConfig;
use crate::config::{ConfigError, Settings};
use crate::ingest::config::load_catalog_default;
use crate::ingest::discussion::{DiscussionFetcher, DiscussionSettings};
use crate::ingest::news::NewsFetcher;
use crate::ingest::providers::{newsapi::NewsApiClient, reddit::RedditClient, serpapi::SerpApiClient};
use crate::insight::InsightGenerator;
use crate::llm;
use crate::notify::{CsvSubscriberStore, Distributor, MailTransport, SmtpMailer, SubscriberStore};

pub struct Runtime {
    pub settings: Settings,
    pub llm_config: LlmConfig,
    pub insights: Arc<InsightGenerator>,
    pub subscribers: Arc<dyn SubscriberStore>,
    /// `None` when SMTP is not configured.
    pub mailer: Option<Arc<dyn MailTransport>>,
}

impl Runtime {
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Settings::from_env()?;
        let llm_config = LlmConfig::load_default()?;
        // Safe diagnostics: provider + enabled + key length only
        info!(
            "LLM cfg loaded: provider={}, model={}, enabled={}, key_len={}",
            llm_config.provider,
            llm_config.model,
            llm_config.enabled,
            llm_config.api_key.len()
        );

        let catalog = load_catalog_default().map_err(|e| ConfigError::Invalid(format!("{e:#}")))?;
        info!(communities = catalog.communities.len(), "sources catalog loaded");

        let client_err = |e: crate::ingest::FetchError| ConfigError::Invalid(format!("http client: {e}"));
        let serp = SerpApiClient::new(settings.serp_api_key.clone()).map_err(client_err)?;
        let newsapi = NewsApiClient::new(settings.news_api_key.clone()).map_err(client_err)?;
        let reddit = RedditClient::new(
            settings.reddit.client_id.clone(),
            settings.reddit.secret.clone(),
        )
        .map_err(client_err)?;
        let llm = llm::build_client(&llm_config)
            .map_err(|e| ConfigError::Invalid(format!("LLM client: {e}")))?;

        let insights = InsightGenerator::new(
            NewsFetcher::new(Arc::new(serp)),
            NewsFetcher::new(Arc::new(newsapi)),
            DiscussionFetcher::new(Arc::new(reddit), catalog, DiscussionSettings::default()),
            llm,
        );

        let mailer: Option<Arc<dyn MailTransport>> = match &settings.smtp {
            Some(smtp) => Some(Arc::new(SmtpMailer::new(smtp)?)),
            None => {
                info!("SMTP not configured; email delivery disabled");
                None
            }
        };

        Ok(Self {
            subscribers: Arc::new(CsvSubscriberStore::new(settings.subscribers_path.clone())),
            settings,
            llm_config,
            insights: Arc::new(insights),
            mailer,
        })
    }

    pub fn distributor(&self) -> Option<Distributor> {
        self.mailer
            .clone()
            .map(|m| Distributor::new(self.subscribers.clone(), m))
    }
}
