use clap::Parser;
use review_moderation::utils::error::ErrorSeverity;
use review_moderation::utils::{logger, validation::Validate};
use review_moderation::{CliConfig, ModerationError, ModerationOrchestrator, ReviewText};
use std::io::Read;

fn exit_code(e: &ModerationError) -> i32 {
    match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: ModerationError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

fn read_review(config: &CliConfig) -> Result<ReviewText, ModerationError> {
    let text = match &config.text {
        Some(text) => text.clone(),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    ReviewText::new(text)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting review-moderation CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        fail(e);
    }

    let review = read_review(&config).unwrap_or_else(|e| fail(e));

    let orchestrator = ModerationOrchestrator::from_config(&config).unwrap_or_else(|e| fail(e));
    if let Err(e) = orchestrator.check_ready().await {
        fail(e);
    }

    let decision = orchestrator.moderate(review.as_str()).await;
    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(())
}
