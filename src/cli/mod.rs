pub mod onboard;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "DayTracker",
    about = "Task lifecycle and habit streak tracker"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Doctor,
    /// Print today's tasks, habits, reminders and statistics.
    Dashboard,
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
    Reminder {
        #[command(subcommand)]
        command: ReminderCommands,
    },
    /// Delete completed tasks that are not tracked per day.
    ClearCompleted {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Write all data as JSON. `-` prints to stdout.
    Export { path: Option<PathBuf> },
    /// Replace all local data with an exported JSON document.
    Import {
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Delete tasks whose expiry has passed.
    Sweep,
    /// Run the reminder checker in the foreground.
    Watch,
    /// Run the reminder checker and the dashboard API.
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommands {
    Add {
        /// today, fullweek, fullmonth or weekdays
        category: String,
        text: String,
        /// HH:MM, 24-hour clock
        #[arg(long)]
        time: Option<String>,
        /// Track completion per calendar day
        #[arg(long, default_value_t = false)]
        daily: bool,
    },
    Toggle {
        id: i64,
    },
    Delete {
        id: i64,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    List {
        category: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum HabitCommands {
    Add {
        text: String,
        #[arg(long)]
        time: Option<String>,
    },
    Toggle {
        id: i64,
    },
    Delete {
        id: i64,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    List,
}

#[derive(Debug, Subcommand)]
pub enum ReminderCommands {
    Add {
        text: String,
        /// `YYYY-MM-DD HH:MM` local time, or RFC 3339
        at: String,
    },
    Delete {
        id: i64,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    List,
}
