//! Profile link reachability check used by user verification.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

/// Off-chain check that a profile link resolves.
#[async_trait]
pub trait LinkChecker: Send + Sync {
    /// `Ok(())` when the link answered 200, otherwise a description of what went wrong.
    async fn check(&self, link: &Url) -> Result<(), String>;
}

/// `LinkChecker` issuing a bounded-timeout GET.
#[derive(Debug, Clone)]
pub struct HttpLinkChecker {
    client: reqwest::Client,
}

impl HttpLinkChecker {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("credchain-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkChecker for HttpLinkChecker {
    async fn check(&self, link: &Url) -> Result<(), String> {
        match self.client.get(link.clone()).send().await {
            Ok(response) if response.status() == StatusCode::OK => Ok(()),
            Ok(response) => Err(format!("status {}", response.status())),
            Err(e) if e.is_timeout() => Err("timed out".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}
