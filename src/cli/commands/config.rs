//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{FinchError, FinchResult};
use console::style;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> FinchResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> FinchResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> FinchResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        println!(
            "{} Config already exists at {}",
            style("[WARN]").yellow(),
            path.display()
        );
        println!("  {}", style("Use --force to overwrite").dim());
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    println!(
        "{} Created config at {}",
        style("[OK]").green(),
        path.display()
    );
    Ok(())
}

async fn set_value(manager: &ConfigManager, config: &Config, key: &str, value: &str) -> FinchResult<()> {
    let mut updated = config.clone();
    apply(&mut updated, key, value)?;
    manager.save(&updated).await?;

    println!("{} Set {} = {}", style("[OK]").green(), key, value);
    Ok(())
}

/// Apply a dot-separated key to the config
fn apply(config: &mut Config, key: &str, value: &str) -> FinchResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,
        ["credential", "socket_path"] => config.credential.socket_path = value.into(),
        ["credential", "socket_mode"] => config.credential.socket_mode = parse_mode(value)?,
        ["credential", "header_read_timeout_secs"] => {
            config.credential.header_read_timeout_secs = parse_secs(value)?
        }
        ["helper", "dial_timeout_secs"] => config.helper.dial_timeout_secs = parse_secs(value)?,
        ["build", "engine"] => config.build.engine = value.to_string(),
        ["build", "engine_args"] => {
            config.build.engine_args = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }
        _ => {
            eprintln!("Valid keys:");
            for key in VALID_KEYS {
                eprintln!("  {}", key);
            }
            return Err(FinchError::User(format!("Unknown config key: {}", key)));
        }
    }
    Ok(())
}

const VALID_KEYS: &[&str] = &[
    "general.verbose",
    "general.log_format",
    "general.audit_log",
    "credential.socket_path",
    "credential.socket_mode",
    "credential.header_read_timeout_secs",
    "helper.dial_timeout_secs",
    "build.engine",
    "build.engine_args",
];

fn parse_bool(value: &str) -> FinchResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(FinchError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_log_format(value: &str) -> FinchResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(FinchError::User(format!(
            "Invalid log format: {}. Use text or json",
            value
        ))),
    }
}

/// Octal permission bits, with or without a `0o` prefix
fn parse_mode(value: &str) -> FinchResult<u32> {
    let digits = value.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o777)
        .ok_or_else(|| FinchError::User(format!("Invalid socket mode: {}", value)))
}

fn parse_secs(value: &str) -> FinchResult<u64> {
    value
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| FinchError::User(format!("Invalid number of seconds: {}", value)))
}
