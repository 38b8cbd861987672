use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

use crate::error::Result;

/// File-backed queue of URLs waiting to be processed, one per line.
#[derive(Debug)]
pub struct Backlog {
    path: PathBuf,
    urls: Vec<String>,
}

impl Backlog {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut backlog = Backlog {
            path: path.into(),
            urls: Vec::new(),
        };
        backlog.reload().await?;
        Ok(backlog)
    }

    pub async fn reload(&mut self) -> Result<()> {
        self.urls = read_urls(&self.path).await?;
        Ok(())
    }

    pub fn peek(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub async fn remove(&mut self, url: &str) -> Result<()> {
        let remaining: Vec<String> = read_urls(&self.path)
            .await?
            .into_iter()
            .filter(|u| u != url)
            .collect();

        let mut contents = String::with_capacity(remaining.iter().map(|u| u.len() + 1).sum());
        for u in &remaining {
            contents.push_str(u);
            contents.push('\n');
        }
        fs::write(&self.path, contents).await?;

        self.urls = remaining;
        info!("Removed {} from source file", url);
        Ok(())
    }
}

async fn read_urls(path: &Path) -> Result<Vec<String>> {
    if !fs::try_exists(path).await? {
        error!("Source file not found: {}", path.display());
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path).await?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
