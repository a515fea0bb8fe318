use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Where the review file comes from. Implementations only deliver bytes;
/// parsing happens in [`crate::ingest`].
#[async_trait]
pub trait DatasetSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch(&self) -> Result<Vec<u8>>;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read '{}'", self.path.display()))
    }
}

pub struct HttpSource {
    http: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url) -> Self {
        Self {
            http: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", self.url))?
            .error_for_status()?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// `http(s)://` locations are fetched over the network, everything else is
/// read from disk.
pub fn source_from_location(location: &str) -> Arc<dyn DatasetSource> {
    let location = location.trim();
    if location.starts_with("http://") || location.starts_with("https://") {
        if let Ok(url) = Url::parse(location) {
            return Arc::new(HttpSource::new(url));
        }
    }
    Arc::new(FileSource::new(location))
}
