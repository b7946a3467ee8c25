use anyhow::Context;
use clap::Parser;
use intake_bot::adapters::console::parse_console_line;
use intake_bot::core::{ConfigProvider, SessionStore};
use intake_bot::utils::{logger, validation::Validate};
use intake_bot::{
    CliConfig, ConsolePresenter, InMemorySessionStore, IntakeBot, IntakeEngine, LocalStorage,
    TomlConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let toml = match &cli.config {
        Some(path) => Some(
            TomlConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path))?,
        ),
        None => None,
    };

    let verbose = cli.verbose || toml.as_ref().is_some_and(|c| c.verbose());
    if cli.json_logs || toml.as_ref().is_some_and(|c| c.json_logs()) {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting intake bot");
    if verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match toml {
        Some(config) => {
            tracing::info!("📁 Using configuration for bot '{}'", config.bot.name);
            run(config).await
        }
        None => run(cli).await,
    }
}

async fn run<C: ConfigProvider + Validate>(config: C) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        anyhow::bail!(e.user_friendly_message());
    }

    tracing::info!(
        "📁 Signatures go to '{}', records to '{}'",
        config.signatures_dir(),
        config.records_dir()
    );
    tracing::info!("✍️ Signature app: {}", config.web_app_url());

    let engine = IntakeEngine::from_config(
        LocalStorage::default(),
        InMemorySessionStore::new(),
        &config,
    );
    let bot = IntakeBot::new(engine, ConsolePresenter::stdout());

    println!("Type `<user_id> <message>`, or `<user_id> !sig <json>` to submit a signature.");
    println!("Commands: /start, /cancel, /help. Ctrl+D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let Some(event) = parse_console_line(&line) else {
            if !line.trim().is_empty() {
                tracing::warn!("Expected `<user_id> <message>`, got {:?}", line);
            }
            continue;
        };

        if let Err(e) = bot.dispatch(event).await {
            tracing::error!("❌ {}", e);
        }
    }

    let abandoned = bot.engine().sessions().len();
    if abandoned > 0 {
        tracing::warn!("{} unfinished intake(s) dropped on exit", abandoned);
    }
    tracing::info!("👋 Input closed, shutting down");
    Ok(())
}
