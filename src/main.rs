use clap::Parser;
use portward::cli::{Cli, Commands};
use portward::commands;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with env-filter support.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings_file = cli.global.settings_file.as_deref();

    let result = match cli.command {
        Commands::Start { services } => commands::start::run(settings_file, services).await,
        Commands::Services => commands::services::run().await,
        Commands::Contexts => commands::contexts::run().await,
        Commands::Init => commands::init::run(settings_file),
        Commands::Validate => commands::validate::run(settings_file),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
