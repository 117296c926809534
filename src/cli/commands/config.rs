//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{FeedError, FeedResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.verbose",
    "general.log_format",
    "api.base_url",
    "api.timeout_secs",
    "api.feed_limit",
    "api.user_posts_limit",
    "session.path",
    "upload.max_photo_bytes",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> FeedResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> FeedResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply(&mut config, key, value) {
        ui::note(&ctx, "Valid keys", &VALID_KEYS.join("\n"));
        return Err(e);
    }
    config.validate().map_err(FeedError::User)?;

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Assign one dot-separated key
fn apply(config: &mut Config, key: &str, value: &str) -> FeedResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => config.general.log_format = value.to_string(),

        ["api", "base_url"] => config.api.base_url = value.trim_end_matches('/').to_string(),
        ["api", "timeout_secs"] => config.api.timeout_secs = parse_u32(value)?.into(),
        ["api", "feed_limit"] => config.api.feed_limit = parse_u32(value)?,
        ["api", "user_posts_limit"] => config.api.user_posts_limit = parse_u32(value)?,

        ["session", "path"] => {
            config.session.path = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }

        ["upload", "max_photo_bytes"] => {
            config.upload.max_photo_bytes = value
                .parse()
                .map_err(|_| FeedError::User(format!("Invalid number: {}", value)))?
        }

        _ => return Err(FeedError::User(format!("Unknown config key: {}", key))),
    }
    Ok(())
}

fn parse_bool(value: &str) -> FeedResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(FeedError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u32(value: &str) -> FeedResult<u32> {
    value
        .parse()
        .map_err(|_| FeedError::User(format!("Invalid number: {}", value)))
}
