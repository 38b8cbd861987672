use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::backlog::Backlog;
use crate::config::Config;
use crate::converter::html_to_markdown;
use crate::document::DocumentWriter;
use crate::enrichment::{Enricher, LabeledReplyParser};
use crate::error::{AppError, Result};
use crate::extractor::extract_metadata;
use crate::fetcher::Fetcher;
use crate::ledger::Ledger;
use crate::llm::{GeminiClient, TextGenerator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: bool,
}

pub struct Pipeline {
    fetcher: Fetcher,
    enricher: Enricher,
    writer: DocumentWriter,
    backlog: Backlog,
    ledger: Ledger,
    delay: Duration,
}

impl Pipeline {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let generator = GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
        )?;
        let fetcher = Fetcher::new(config.fetch_timeout, config.max_retries)?;

        let pipeline = Pipeline::new(
            fetcher,
            Box::new(generator),
            DocumentWriter::new(&config.output_dir),
            Backlog::load(&config.source_file).await?,
            Ledger::new(&config.processed_file),
            config.delay_between_requests,
        )
        .await?;

        info!(
            "URL processor initialized with output directory: {}",
            config.output_dir.display()
        );
        Ok(pipeline)
    }

    pub async fn new(
        fetcher: Fetcher,
        generator: Box<dyn TextGenerator>,
        writer: DocumentWriter,
        backlog: Backlog,
        ledger: Ledger,
        delay: Duration,
    ) -> Result<Self> {
        writer.ensure_output_dir().await?;

        Ok(Pipeline {
            fetcher,
            enricher: Enricher::new(generator, Box::new(LabeledReplyParser)),
            writer,
            backlog,
            ledger,
            delay,
        })
    }

    pub fn backlog(&self) -> &Backlog {
        &self.backlog
    }

    pub async fn run(&mut self) -> RunSummary {
        let urls = self.backlog.urls().to_vec();
        let mut summary = RunSummary {
            total: urls.len(),
            ..RunSummary::default()
        };

        if urls.is_empty() {
            info!("No URLs to process");
            return summary;
        }

        info!("Found {} URLs to process", urls.len());

        for (i, url) in urls.iter().enumerate() {
            info!("Processing URL {}/{}", i + 1, urls.len());

            match self.process_url(url).await {
                Ok(_) => {
                    summary.succeeded += 1;
                    info!("Successfully processed {}", url);
                }
                Err(e) if e.is_fatal() => {
                    summary.failed += 1;
                    summary.aborted = true;
                    error!("Stopping due to Gemini API error: {}", e);
                    break;
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Failed to process {}: {}", url, e);
                }
            }

            if i + 1 < urls.len() {
                info!("Waiting {} seconds before next request...", self.delay.as_secs());
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            "Processing complete: {} succeeded, {} failed, {} remaining",
            summary.succeeded,
            summary.failed,
            self.backlog.len()
        );
        summary
    }

    pub async fn process_url(&mut self, url: &str) -> Result<PathBuf> {
        info!("Processing: {}", url);

        let html = self
            .fetcher
            .fetch(url)
            .await
            .ok_or_else(|| AppError::FetchError(format!("Failed to fetch content for {}", url)))?;

        let metadata = extract_metadata(&html, url);
        let markdown = html_to_markdown(&metadata.content_html);

        let enrichment = self.enricher.enrich(&markdown, &metadata, url).await?;

        let output_path = self.writer.write(url, &metadata, &enrichment).await?;
        info!("Created file: {}", output_path.display());

        self.backlog.remove(url).await?;
        self.ledger.append(url, &output_path).await?;

        Ok(output_path)
    }
}
