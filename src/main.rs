//! linkpost - feed client with an optimistic, self-reconciling cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use linkpost::cli::args::ConfigAction;
use linkpost::cli::{commands, Cli, Commands};
use linkpost::config::{Config, ConfigManager};
use linkpost::error::FeedResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> FeedResult<()> {
    let cli = Cli::parse();
    linkpost::ui::init_theme();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // A broken file must not stop the commands that locate or replace it
    let config = match config_manager.load().await {
        Ok(config) => config,
        Err(e) if tolerates_bad_config(&cli.command) => {
            eprintln!("{} {}", style("Warning:").yellow(), e);
            Config::default()
        }
        Err(e) => return Err(e),
    };

    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Login(args) => commands::login(args, &config).await,
        Commands::Signup(args) => commands::signup(args, &config).await,
        Commands::Logout => commands::logout(&config).await,
        Commands::Whoami => commands::whoami(&config).await,
        Commands::Feed(args) => commands::feed(args, &config).await,
        Commands::Mine(args) => commands::mine(args, &config).await,
        Commands::Post(args) => commands::post(args, &config).await,
        Commands::Comment(args) => commands::comment(args, &config).await,
        Commands::Password(args) => commands::password(args, &config).await,
        Commands::Photo(args) => commands::photo(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

fn tolerates_bad_config(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Config(args)
            if matches!(args.action, Some(ConfigAction::Path) | Some(ConfigAction::Init { .. }))
    )
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug; `general.verbose`
/// raises the floor to info
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 if config.general.verbose => 1,
        n => n,
    };
    let filter = match level {
        0 => EnvFilter::new("linkpost=warn"),
        1 => EnvFilter::new("linkpost=info"),
        _ => EnvFilter::new("linkpost=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
