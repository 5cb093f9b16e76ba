mod api;
mod backend;
mod cache;
mod cli;
mod config;
mod engine;
mod error;
mod model;
mod scheduler;
mod store;
mod view;

use crate::backend::rest::RestBackend;
use crate::cache::SnapshotCache;
use crate::cli::onboard::{run_onboarding, test_connection};
use crate::cli::{
    Cli, Commands, ConfigCommands, HabitCommands, ReminderCommands, TaskCommands,
};
use crate::config::Config;
use crate::model::Category;
use crate::store::{AppStore, LoadSource};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use clap::Parser;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Store = AppStore<RestBackend>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding().await?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Doctor => handle_doctor().await,
        Commands::Dashboard => {
            let mut store = open_store(&load_config()?).await?;
            refresh_completion(&mut store).await;
            print!("{}", view::render_text(&store.dashboard()));
            Ok(())
        }
        Commands::Task { command } => handle_task_command(command).await,
        Commands::Habit { command } => handle_habit_command(command).await,
        Commands::Reminder { command } => handle_reminder_command(command).await,
        Commands::ClearCompleted { yes } => {
            let mut store = open_store(&load_config()?).await?;
            if !confirm("Delete all completed tasks?", yes)? {
                println!("Cancelled");
                return Ok(());
            }

            let cleared = store.clear_completed().await?;
            println!("Cleared {cleared} completed task(s)");
            refresh_completion(&mut store).await;
            Ok(())
        }
        Commands::Export { path } => {
            let store = open_store(&load_config()?).await?;
            handle_export(&store, path)
        }
        Commands::Import { path, yes } => {
            let mut store = open_store(&load_config()?).await?;
            handle_import(&mut store, &path, yes).await
        }
        Commands::Sweep => {
            let mut store = open_store(&load_config()?).await?;
            let removed = store.remove_expired_tasks().await?;
            println!("Removed {removed} expired task(s)");
            Ok(())
        }
        Commands::Watch => {
            let config = load_config()?;
            let store = Arc::new(Mutex::new(open_store(&config).await?));
            println!("Watching reminders (Ctrl+C to stop)");

            tokio::select! {
                checker_result = scheduler::run_reminder_checker(store, config.notify_reminders) => {
                    checker_result?;
                }
                _ = signal::ctrl_c() => {
                    info!("shutdown signal received");
                }
            }

            Ok(())
        }
        Commands::Serve => run_service(load_config()?).await,
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_dirs()?;
            config.save()?;

            let masked = if key.contains("api_key") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

async fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing");
    }

    let config = load_or_default_config()?;

    match config.resolve_backend_url() {
        Ok(url) => println!("[OK] backend URL: {url}"),
        Err(error) => {
            println!("[WARN] {error}");
            issues.push("backend url missing");
        }
    }

    if config.resolve_api_key().is_some() {
        println!("[OK] backend API key is configured");
    } else {
        println!("[WARN] backend API key is missing");
        issues.push("api key missing");
    }

    match SnapshotCache::open(&config.cache_path).and_then(|cache| cache.load()) {
        Ok(Some(snapshot)) => {
            let saved_at = DateTime::<Utc>::from_timestamp(snapshot.saved_at, 0)
                .map(|instant| instant.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| snapshot.saved_at.to_string());
            println!("[OK] snapshot cache reachable, last saved {saved_at}");
        }
        Ok(None) => println!("[OK] snapshot cache reachable (empty)"),
        Err(error) => {
            println!("[WARN] snapshot cache check failed: {error:#}");
            issues.push("cache unreachable");
        }
    }

    match test_connection(&config).await {
        Ok(tasks) => println!("[OK] backend reachable ({tasks} task(s))"),
        Err(error) => {
            println!("[WARN] backend check failed: {error:#}");
            issues.push("backend unreachable");
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn handle_task_command(command: TaskCommands) -> Result<()> {
    let mut store = open_store(&load_config()?).await?;

    match command {
        TaskCommands::Add {
            category,
            text,
            time,
            daily,
        } => {
            let category = category.parse::<Category>()?;
            let task = store
                .add_task(category, &text, time.as_deref(), daily)
                .await?;
            println!("Task added: #{} {} ({category})", task.id, task.text);
        }
        TaskCommands::Toggle { id } => {
            let completed = store.toggle_task(id).await?;
            let label = if completed { "completed" } else { "not completed" };
            println!("Task #{id} marked {label}");
        }
        TaskCommands::Delete { id, yes } => {
            if !confirm(&format!("Delete task #{id}?"), yes)? {
                println!("Cancelled");
                return Ok(());
            }
            let task = store.delete_task(id).await?;
            println!("Task deleted: #{} {}", task.id, task.text);
        }
        TaskCommands::List { category } => {
            let today = store.now().date_naive();
            let tasks = match category {
                Some(raw) => view::category_list(store.state(), raw.parse::<Category>()?, today),
                None => store.dashboard().due_today,
            };
            println!("{}", view::render_tasks(&tasks));
            return Ok(());
        }
    }

    refresh_completion(&mut store).await;
    Ok(())
}

async fn handle_habit_command(command: HabitCommands) -> Result<()> {
    let mut store = open_store(&load_config()?).await?;

    match command {
        HabitCommands::Add { text, time } => {
            let habit = store.add_habit(&text, time.as_deref()).await?;
            println!("Habit added: #{} {}", habit.id, habit.text);
        }
        HabitCommands::Toggle { id } => {
            let habit = store.toggle_habit(id).await?;
            println!("Habit #{id} streak: {}", habit.streak);
        }
        HabitCommands::Delete { id, yes } => {
            if !confirm(&format!("Delete habit #{id}?"), yes)? {
                println!("Cancelled");
                return Ok(());
            }
            let habit = store.delete_habit(id).await?;
            println!("Habit deleted: #{} {}", habit.id, habit.text);
        }
        HabitCommands::List => {
            let habits = view::habit_list(store.state(), &store.now());
            println!("{}", view::render_habits(&habits));
        }
    }

    Ok(())
}

async fn handle_reminder_command(command: ReminderCommands) -> Result<()> {
    let mut store = open_store(&load_config()?).await?;

    match command {
        ReminderCommands::Add { text, at } => {
            let trigger_at = parse_trigger_time(&at)?;
            let reminder = store.add_reminder(&text, trigger_at).await?;
            println!(
                "Reminder added: #{} {} at {}",
                reminder.id,
                reminder.text,
                reminder.trigger_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
        }
        ReminderCommands::Delete { id, yes } => {
            if !confirm(&format!("Delete reminder #{id}?"), yes)? {
                println!("Cancelled");
                return Ok(());
            }
            let reminder = store.delete_reminder(id).await?;
            println!("Reminder deleted: #{} {}", reminder.id, reminder.text);
        }
        ReminderCommands::List => {
            let reminders = view::active_reminders(store.state(), &store.now());
            println!("{}", view::render_reminders(&reminders));
        }
    }

    Ok(())
}

fn handle_export(store: &Store, path: Option<PathBuf>) -> Result<()> {
    let document = store.export_document()?;

    let target = match path {
        Some(path) if path.as_os_str() == "-" => {
            println!("{document}");
            return Ok(());
        }
        Some(path) => path,
        None => PathBuf::from(store.export_file_name()),
    };

    fs::write(&target, document)
        .with_context(|| format!("Failed to write export file: {}", target.display()))?;
    println!("Exported to {}", target.display());

    Ok(())
}

async fn handle_import(store: &mut Store, path: &Path, yes: bool) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let state = Store::parse_document(&content)?;

    if !confirm("This will replace all current data. Continue?", yes)? {
        println!("Cancelled");
        return Ok(());
    }

    let (tasks, habits, reminders) = (
        state.task_count(),
        state.habits.len(),
        state.reminders.len(),
    );
    store
        .import_state(state)
        .await
        .context("Import stopped before every record was written to the backend")?;
    println!("Imported {tasks} task(s), {habits} habit(s), {reminders} reminder(s) into the backend");

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_dirs()?;
    let store = Arc::new(Mutex::new(open_store(&config).await?));

    info!("DayTracker service started");

    tokio::select! {
        checker_result = scheduler::run_reminder_checker(Arc::clone(&store), config.notify_reminders) => {
            checker_result?;
        }
        api_result = api::run_server(Arc::clone(&store), config.api_port) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<Store> {
    let backend = RestBackend::from_config(config)?;
    let mut store = AppStore::new(backend);

    match SnapshotCache::open(&config.cache_path) {
        Ok(cache) => store = store.with_cache(cache),
        Err(error) => warn!(error = %error, "snapshot cache unavailable"),
    }

    match store.load_all().await {
        LoadSource::Backend => {
            if let Err(error) = store.remove_expired_tasks().await {
                warn!(error = %error, "failed to remove expired tasks");
            }
        }
        LoadSource::Cache => println!("Backend unreachable. Showing cached data."),
        LoadSource::Empty => println!("Backend unreachable and no cached data found."),
    }

    Ok(store)
}

async fn refresh_completion(store: &mut Store) {
    let stats = match store.sync_daily_completion().await {
        Ok(stats) => stats,
        Err(error) => {
            warn!(error = %error, "failed to record daily completion");
            store.stats()
        }
    };

    println!(
        "Today: {}/{} completed | overall streak: {} day(s)",
        stats.completed_today, stats.total_today, stats.overall_streak
    );
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation input")
}

fn parse_trigger_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .with_context(|| format!("Invalid reminder time: {raw}. Example: 2026-10-17 14:30"))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|instant| instant.with_timezone(&Utc))
        .with_context(|| format!("Reminder time does not exist in local time: {raw}"))
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_dirs()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load()
        .with_context(|| "Config file not found. Run `DayTracker onboard` first.".to_string())
}
