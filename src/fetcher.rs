use crate::{
    error::{AppResult, ErrorReason, FetchError},
    types::CertMap,
};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Downloads the certificate bundle from a fixed upstream URL.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(url: &str, timeout: Duration) -> AppResult<Self> {
        let url = Url::parse(url).map_err(|e| ErrorReason::InvalidSourceUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ErrorReason::InvalidSourceUrl(format!(
                "unsupported scheme `{}`",
                url.scheme()
            ))
            .into());
        }
        if timeout.is_zero() {
            return Err(ErrorReason::InvalidFetchTimeout.into());
        }

        let client = Client::builder()
            .build()
            .map_err(ErrorReason::HttpClient)?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch and decode the whole bundle.
    ///
    /// The request is abandoned as soon as `cancel` fires or the timeout
    /// elapses, whichever comes first.
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<CertMap, FetchError> {
        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.fetch_inner() => result,
        };
        trace!("fetcher.fetch({}) = {:?}", &self.url, result.as_ref().map(CertMap::len));
        result
    }

    async fn fetch_inner(&self) -> Result<CertMap, FetchError> {
        // The timeout covers the body download as well.
        let response = self
            .client
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::BadStatus(response.status()));
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;
        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }
}
