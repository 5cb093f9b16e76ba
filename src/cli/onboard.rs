use crate::backend::Backend;
use crate::backend::rest::RestBackend;
use crate::config::Config;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};
use url::Url;

pub async fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to DayTracker onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let existing = Config::load().unwrap_or_default();

    println!("\n[1/3] Backend URL");
    println!("  Project URL of the REST backend that stores your tasks.");

    let backend_url: String = Input::with_theme(&theme)
        .with_prompt("  Backend URL")
        .with_initial_text(existing.backend_url.clone())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            Url::parse(input.trim())
                .map(|_| ())
                .map_err(|_| "Use an absolute URL (example: https://project.supabase.co)")
        })
        .interact_text()
        .context("Failed to read backend URL")?;

    println!("\n[2/3] API key");
    let api_key = Password::with_theme(&theme)
        .with_prompt("  Backend API key")
        .allow_empty_password(existing.backend_api_key.is_some())
        .interact()
        .context("Failed to read backend API key")?;

    let mut config = existing;
    config.set_value("backend_url", &backend_url)?;
    if !api_key.trim().is_empty() {
        config.set_value("backend_api_key", &api_key)?;
    }

    println!("\n[3/3] Reminder notifications");
    config.notify_reminders = Confirm::with_theme(&theme)
        .with_prompt("  Show desktop notifications for reminders?")
        .default(config.notify_reminders)
        .interact()
        .context("Failed to read notification preference")?;

    config.ensure_bootstrap_dirs()?;
    config.save()?;

    let check = Confirm::with_theme(&theme)
        .with_prompt("  Test the backend connection now?")
        .default(true)
        .interact()
        .context("Failed to read connection test input")?;

    if check {
        match test_connection(&config).await {
            Ok(tasks) => println!("  ✓ Connected ({tasks} task(s) stored)"),
            Err(error) => println!("  ! Connection failed: {error:#}"),
        }
    }

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Run DayTracker dashboard to see today's tasks.");
    println!("──────────────────────────────────────────");

    Ok(config)
}

pub async fn test_connection(config: &Config) -> Result<usize> {
    let backend = RestBackend::from_config(config)?;
    let tasks = backend.list_tasks().await?;

    Ok(tasks.len())
}
