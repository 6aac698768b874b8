pub mod newsapi;
pub mod reddit;
pub mod serpapi;

use std::time::Duration;

use crate::ingest::types::FetchError;

pub(crate) const USER_AGENT: &str =
    "market-intel-digest/0.1 (market discussion and news digest)";

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()
        .map_err(FetchError::from)
}

/// Non-2xx → `FetchError::Status`, otherwise decode JSON.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
}
