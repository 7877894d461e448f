use clap::Parser;
use gorse_etl::config::args::ExtractArgs;
use gorse_etl::core::{ConfigProvider, Storage};
use gorse_etl::utils::{logger, validation::Validate};
use gorse_etl::{AppConfig, EtlEngine, EventLogPipeline, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ExtractArgs::parse();

    let mut config = match AppConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    // Logging
    logger::init_logger(config.logging.format, args.verbose);
    tracing::info!("Starting process_data");
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(".".to_string());

    // A missing export is not an error for this entry point.
    if !storage.exists(config.input_csv()).await {
        println!("❌ File not found: {}", config.input_csv());
        println!("Please ensure the CSV file is in the current directory.");
        return Ok(());
    }

    let output_dir = config.output_dir().to_string();
    let pipeline = EventLogPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok(report) => {
            println!("✅ SUCCESS!");
            println!("Created files in '{}/':", report.output_dir);
            println!("1. feedback.csv - {} interactions", report.feedback_rows);
            println!("2. items.csv - {} properties", report.item_rows);
            println!("3. users.csv - {} users", report.user_rows);
            if report.sample_written {
                println!("✓ Created test_sample.csv");
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Extraction failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ Failed to create one or more files in '{}/'", output_dir);
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
