use clap::Parser;
use portfolio_report::adapters::gemini::GeminiClient;
use portfolio_report::adapters::yahoo::YahooPriceSource;
use portfolio_report::config::toml_config::TomlConfig;
use portfolio_report::core::assets::extract_assets;
use portfolio_report::core::prompts::report_prompt;
use portfolio_report::core::sections::{SectionValidator, SECTION_COUNT};
use portfolio_report::core::ConfigProvider;
use portfolio_report::utils::error::ErrorSeverity;
use portfolio_report::utils::{logger, validation::Validate};
use portfolio_report::{LocalStorage, ReportEngine, ReportPipeline};

#[derive(Parser)]
#[command(name = "toml-report")]
#[command(about = "Portfolio report pipeline driven by a TOML configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "report-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Validate the input and show sections and rows without network calls
    #[arg(long)]
    dry_run: bool,

    /// Print the report-generation prompt for a goal and exit
    #[arg(long, value_name = "GOAL")]
    print_prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 只輸出產生報告用的提示詞，不需要配置檔
    if let Some(goal) = &args.print_prompt {
        println!("{}", report_prompt(goal));
        return Ok(());
    }

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
    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based report tool");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No network calls, no files written");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let generator = GeminiClient::new(
        &config.gemini.endpoint,
        &config.gemini.model,
        config.api_key().or_else(|| std::env::var("GEMINI_API_KEY").ok()),
    );
    if !generator.has_api_key() {
        tracing::warn!(
            "⚠️ No Gemini API key, tickers will use the override table and suffix rule"
        );
    }
    let prices = YahooPriceSource::new(&config.prices.endpoint);

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = ReportPipeline::new(storage, config, generator, prices);
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Report completed successfully!");
            println!("✅ Report completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Report failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Report: {} ({})", config.report.name, config.owner());
    println!("  Input: {}", config.input_path());
    if let Some(holdings) = config.holdings_path() {
        println!("  Holdings: {}", holdings);
    }
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    println!("  Benchmark: {}", config.benchmark_ticker());
    println!("  Ticker Suffix: {}", config.ticker_suffix());
    println!("  Concurrent Requests: {}", config.concurrent_requests());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(config.input_path())?;
    let validated = SectionValidator::validate_report(&raw);

    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📑 Sections ({}/{}):", validated.report.len(), SECTION_COUNT);
    if !validated.is_recognized() {
        println!("  ⚠️ No sections recognized, the raw text would be rendered as-is");
    }
    for section in &validated.report.sections {
        println!("  {}. {}", section.index, section.title);
    }

    let assets = extract_assets(&validated.text);
    println!();
    println!("📋 Asset Rows ({}):", assets.len());
    for asset in &assets {
        println!(
            "  {} | {} | {} | {}",
            asset.name, asset.asset_type, asset.invested_amount, asset.current_value
        );
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if config.compress_outputs() {
        println!("  Compression: ZIP bundle");
    }
    if !config.returns_enabled() {
        println!("  Returns: disabled");
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
