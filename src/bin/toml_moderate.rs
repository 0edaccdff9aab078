use anyhow::Context;
use clap::Parser;
use review_moderation::utils::{logger, validation::Validate};
use review_moderation::{ConfigProvider, ModerationOrchestrator, ReviewText, TomlConfig};
use std::io::Read;

#[derive(Parser)]
#[command(name = "toml-moderate")]
#[command(about = "Review moderation with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "moderation.toml")]
    config: String,

    /// Review text; read from stdin when omitted
    #[arg(short, long)]
    text: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Validate configuration and probe the model, without moderating anything
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    let verbose = args.verbose || config.verbose_logging();
    if config.json_logging() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting {}", config.service_name());
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let settings = config
        .moderation_settings()
        .context("building moderation settings")?;
    tracing::info!(
        "✅ Configuration validated: backend={}, timeout={:?}, retries={}",
        settings.backend.name(),
        config.timeout(),
        settings.retry_attempts
    );

    let orchestrator =
        ModerationOrchestrator::from_settings(&settings).context("initialising model backend")?;
    orchestrator
        .check_ready()
        .await
        .context("model readiness check")?;

    if args.check {
        tracing::info!("🔍 CHECK MODE - configuration and model backend are ready");
        return Ok(());
    }

    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading review from stdin")?;
            buffer.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    let review = ReviewText::new(text)?;

    let decision = orchestrator.moderate(review.as_str()).await;
    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(())
}
