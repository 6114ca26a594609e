use clap::Parser;
use taskline::cli::Cli;
use taskline::cli_handlers::handle_command;
use taskline::config::Config;
use taskline::context::AppContext;
use taskline::error::Result;
use taskline::logging::LoggingConfig;

#[tokio::main]
async fn main() {
    // Parse CLI arguments first to get logging configuration
    let cli = Cli::parse();

    let log_config = LoggingConfig::from_args(cli.quiet, cli.verbose, cli.json).with_env_overrides();
    if let Err(e) = taskline::logging::init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        let error_response = e.to_error_response();
        match serde_json::to_string_pretty(&error_response) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("{}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config = config.with_db_path(db);
    }

    let ctx = AppContext::open(config).await?;
    let result = handle_command(&ctx, cli.owner.as_deref(), cli.command).await;
    ctx.pool.close().await;

    result
}
