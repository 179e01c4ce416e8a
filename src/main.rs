mod api;
mod cli;
mod config;
mod db;
mod scheduler;
mod stats;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::db::Database;
use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Refresh { user } => handle_refresh(user),
        Commands::Status => handle_status(),
        Commands::Config { command } => handle_config_command(command),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;
    let counts = database.record_counts()?;

    println!("Cadence status");
    println!("- db_path: {}", config.db_path.display());
    println!("- users: {}", counts.users);
    println!("- tasks: {}", counts.tasks);
    println!("- breaks: {}", counts.breaks);
    println!("- mood_checkins: {}", counts.moods);
    println!(
        "- last_refreshed_at: {}",
        database
            .latest_refresh_at()?
            .map(|timestamp| timestamp.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_refresh(user: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let now = Local::now();

    match user {
        Some(user) => {
            let database = Database::open(&config.db_path)?;
            let snapshot = stats::refresh_user_snapshot(
                &database,
                now,
                &user,
                config.default_weekly_goal_hours,
            )?;

            println!("Snapshot refreshed: {user}");
            println!("- current_streak: {}", snapshot.streak.current_streak);
            println!("- longest_streak: {}", snapshot.streak.longest_streak);
            println!("- hours_worked: {}", snapshot.stats.hours_worked);
        }
        None => {
            let refreshed = stats::refresh_all_snapshots(&config, now)?;
            println!("Snapshots refreshed for {refreshed} user(s)");
        }
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    config.parse_refresh_time()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    let scheduler_config = Arc::clone(&shared_config);
    let scheduler_schedule_fallback = Arc::clone(&shared_config);
    let api_config = Arc::clone(&shared_config);

    info!("Cadence service started");

    tokio::select! {
        scheduler_result = scheduler::run_daily_scheduler(move || {
            let runtime_config = Config::load()
                .unwrap_or_else(|_| (*scheduler_schedule_fallback).clone());

            runtime_config.parse_refresh_time()
        }, move |now| {
            let config = Arc::clone(&scheduler_config);
            async move {
                let runtime_config = Config::load().unwrap_or_else(|_| (*config).clone());
                stats::refresh_all_snapshots(&runtime_config, now).map(|_| ())
            }
        }) => {
            scheduler_result?;
        }
        api_result = api::run_server(api_config) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}
