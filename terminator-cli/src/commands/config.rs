//! Config command handlers

use crate::config::Config;
use crate::{ConfigAction, ConfigKey};
use anyhow::{Context as _, Result};
use clap::ValueEnum;
use colored::Colorize;
use std::path::PathBuf;

fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(PathBuf::from(p)),
        None => Config::default_path(),
    }
}

pub async fn handle(action: ConfigAction, explicit: Option<&str>) -> Result<()> {
    match action {
        ConfigAction::Init { path } => {
            let config_path = match path.as_deref().or(explicit) {
                Some(p) => {
                    let path = PathBuf::from(p);
                    Config::init_at(&path)?;
                    path
                }
                None => Config::init()?,
            };

            println!("{} Configuration initialized at: {}",
                "✓".green().bold(),
                config_path.display().to_string().cyan()
            );
            Ok(())
        }

        ConfigAction::Show => {
            let config_path = config_path(explicit)?;

            if !config_path.exists() {
                println!("{} No configuration file found. Run 'fil-terminator config init' first.",
                    "✗".red().bold()
                );
                return Ok(());
            }

            let config = Config::load(&config_path)?;
            let unset = || "(not set)".dimmed().to_string();

            println!("{}", "Configuration:".bold());
            println!("  API URL:              {}", config.api_url.as_deref().map(|u| u.cyan().to_string()).unwrap_or_else(unset));
            println!("  API Token:            {}", config.api_token.as_ref().map(|_| "********".cyan().to_string()).unwrap_or_else(unset));
            println!("  Workers:              {}", config.workers.to_string().cyan());
            println!("  Expiration Threshold: {} days", config.expiration_threshold_days.to_string().cyan());
            println!("  Offline Genesis:      {}", config.offline_genesis.to_string().cyan());
            println!();
            println!("Config file: {}", config_path.display().to_string().dimmed());

            Ok(())
        }

        ConfigAction::Set { key, value } => {
            let config_path = config_path(explicit)?;
            Config::init_at(&config_path)?;

            let mut config = Config::load(&config_path)?;
            apply(&mut config, key, &value)?;
            config.save(&config_path)?;

            let name = key
                .to_possible_value()
                .map(|v| v.get_name().to_string())
                .unwrap_or_default();
            println!("{} Set {} = {}",
                "✓".green().bold(),
                name,
                value.cyan()
            );
            Ok(())
        }
    }
}

fn apply(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
    match key {
        ConfigKey::ApiUrl => config.api_url = optional(value),
        ConfigKey::ApiToken => config.api_token = optional(value),
        ConfigKey::Workers => {
            config.workers = value.parse().context("workers must be a positive integer")?;
        }
        ConfigKey::ExpirationThresholdDays => {
            config.expiration_threshold_days =
                value.parse().context("threshold must be a whole number of days")?;
        }
        ConfigKey::OfflineGenesis => {
            config.offline_genesis = value.parse().context("expected true or false")?;
        }
    }
    Ok(())
}
