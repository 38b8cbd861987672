use std::fmt;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub output_path: PathBuf,
}

impl fmt::Display for LedgerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f"),
            self.url,
            self.output_path.display()
        )
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Ledger { path: path.into() }
    }

    pub async fn append(&self, url: &str, output_path: &Path) -> Result<LedgerRecord> {
        let record = LedgerRecord {
            timestamp: Local::now(),
            url: url.to_string(),
            output_path: output_path.to_path_buf(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", record).as_bytes()).await?;
        file.flush().await?;

        Ok(record)
    }
}
