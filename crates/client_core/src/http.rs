use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;
use url::Url;

const FALLBACK_FILENAME: &str = "download.zip";

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    ok: bool,
}

pub struct BackendHttp {
    http: Client,
    backend_url: String,
}

impl BackendHttp {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            backend_url: backend_url.into(),
        }
    }

    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.backend_url.trim_end_matches('/'));
        let body: HealthResponse = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to reach backend: {url}"))?
            .error_for_status()?
            .json()
            .await
            .context("backend health response was not valid json")?;
        Ok(body.ok)
    }

    pub async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request download: {url}"))?
            .error_for_status()?
            .bytes()
            .await
            .context("failed to read download body")?;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
        let target = dir.join(download_filename(url));
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("failed to write '{}'", target.display()))?;

        info!(path = %target.display(), size_bytes = bytes.len(), "http: download saved");
        Ok(target)
    }
}

pub(crate) fn download_filename(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
