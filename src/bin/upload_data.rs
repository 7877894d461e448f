use clap::Parser;
use gorse_etl::config::args::UploadArgs;
use gorse_etl::core::workflow::{next_steps, TrainingOutcome};
use gorse_etl::utils::{logger, validation::Validate};
use gorse_etl::{AppConfig, GorseClient, LocalStorage, UploadMode, UploadWorkflow};

/// Strict uploader: both CSV exports and a reachable Gorse are required.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = UploadArgs::parse();

    let mut config = match AppConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    logger::init_logger(config.logging.format, args.verbose);
    tracing::info!("=== Gorse Data Upload ===");

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let client = match GorseClient::new(config.gorse.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let storage = LocalStorage::new(config.upload.data_dir.clone());
    let workflow = UploadWorkflow::new(storage, client.clone(), config.upload.clone(), UploadMode::Strict);

    let report = match workflow.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("❌ Upload aborted: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!(
                "💡 Please ensure Gorse is running and accessible at {}",
                config.gorse.dashboard_url()
            );
            std::process::exit(1);
        }
    };

    println!("=== Upload Complete ===");
    println!("Items uploaded: {}", report.items);
    println!("Feedback entries uploaded: {}", report.feedback);
    if report.training == TrainingOutcome::Triggered {
        println!("Training triggered; wait a few minutes before querying recommendations.");
    }
    println!("Next steps:");
    for step in next_steps(&client, &config.upload) {
        println!("  {}", step);
    }

    Ok(())
}
