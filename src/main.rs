use std::process::ExitCode;
use tracing::{error, info};
use link_enricher::{
    config::Config,
    logging::init_logging,
    pipeline::Pipeline,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&config.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Fatal error: failed to set up logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut pipeline = match Pipeline::from_config(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Fatal error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl-C stops the run between steps
    let outcome = tokio::select! {
        result = pipeline.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(summary) => {
            if summary.aborted {
                info!("Run stopped early; {} URLs left in backlog", pipeline.backlog().len());
            }
            ExitCode::SUCCESS
        }
        None => {
            info!("Processing interrupted by user");
            ExitCode::SUCCESS
        }
    }
}
