use clap::Parser;
use gorse_etl::config::args::UploadArgs;
use gorse_etl::core::workflow::{next_steps, RecommendationOutcome};
use gorse_etl::utils::{logger, validation::Validate};
use gorse_etl::{AppConfig, GorseClient, LocalStorage, UploadMode, UploadWorkflow};

/// Uploads items and feedback (falling back to built-in samples), triggers
/// training, waits, then checks recommendations for the test users.
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
    tracing::info!("=== Gorse Real Estate Recommendation System ===");

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let client = GorseClient::new(config.gorse.clone())?;
    let storage = LocalStorage::new(config.upload.data_dir.clone());
    let workflow = UploadWorkflow::new(storage, client.clone(), config.upload.clone(), UploadMode::Lenient);

    match workflow.run().await {
        Ok(report) => {
            println!("=== Setup Complete ===");
            println!("Items uploaded: {}", report.items);
            println!("Feedback entries uploaded: {}", report.feedback);

            let with_results = report
                .recommendations
                .iter()
                .filter(|c| matches!(c.outcome, RecommendationOutcome::Found(_)))
                .count();
            if !report.recommendations.is_empty() {
                println!(
                    "Recommendations available for {}/{} test users",
                    with_results,
                    report.recommendations.len()
                );
            }

            println!("Next steps:");
            for step in next_steps(&client, &config.upload) {
                println!("  {}", step);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Upload failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
