use crate::backend::Backend;
use crate::config::FIXED_REMINDER_POLL_SECONDS;
use crate::model::Reminder;
use crate::store::AppStore;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{info, warn};

const NOTIFICATION_TITLE: &str = "DayTracker";

pub async fn run_reminder_checker<B: Backend>(
    store: Arc<Mutex<AppStore<B>>>,
    notify: bool,
) -> Result<()> {
    let mut ticker = interval(Duration::from_secs(FIXED_REMINDER_POLL_SECONDS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        poll_seconds = FIXED_REMINDER_POLL_SECONDS,
        notify, "reminder checker started"
    );

    loop {
        ticker.tick().await;
        check_due_reminders(&store, notify).await;
    }
}

/// Fires every reminder that became due since the last check. Purely local.
pub async fn check_due_reminders<B: Backend>(store: &Mutex<AppStore<B>>, notify: bool) -> usize {
    let due = store.lock().await.take_due_reminders();

    due.iter().for_each(|reminder| deliver(reminder, notify));
    due.len()
}

pub fn notification_message(reminder: &Reminder) -> String {
    format!("Reminder: {}", reminder.text)
}

fn deliver(reminder: &Reminder, notify: bool) {
    let message = notification_message(reminder);

    info!(id = reminder.id, trigger_at = %reminder.trigger_at, "reminder fired");
    println!("{message}");

    if notify {
        if let Err(error) = send_desktop_notification(NOTIFICATION_TITLE, &message) {
            warn!(id = reminder.id, error = %error, "desktop notification failed");
        }
    }
}

#[cfg(target_os = "macos")]
fn send_desktop_notification(title: &str, body: &str) -> std::io::Result<()> {
    let script = format!(
        "display notification {} with title {}",
        applescript_string(body),
        applescript_string(title)
    );
    let output = std::process::Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(std::io::Error::other(stderr))
    }
}

#[cfg(target_os = "linux")]
fn send_desktop_notification(title: &str, body: &str) -> std::io::Result<()> {
    let output = std::process::Command::new("notify-send")
        .arg(title)
        .arg(body)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(std::io::Error::other(stderr))
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn send_desktop_notification(_title: &str, _body: &str) -> std::io::Result<()> {
    Ok(())
}

#[cfg(target_os = "macos")]
fn applescript_string(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::{check_due_reminders, notification_message};
    use crate::backend::fake::FakeBackend;
    use crate::model::Reminder;
    use crate::store::AppStore;
    use chrono::{Duration, Local, TimeZone, Utc};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn due_reminders_fire_once() {
        let now = Local
            .with_ymd_and_hms(2026, 10, 17, 9, 0, 0)
            .single()
            .expect("local time");
        let backend = FakeBackend::default();
        backend.reminders.lock().expect("lock").extend([
            Reminder {
                id: 1,
                text: "Water the plants".to_string(),
                trigger_at: (now - Duration::minutes(1)).with_timezone(&Utc),
                completed: false,
                notified: false,
            },
            Reminder {
                id: 2,
                text: "Team sync".to_string(),
                trigger_at: (now + Duration::hours(2)).with_timezone(&Utc),
                completed: false,
                notified: false,
            },
        ]);

        let mut store = AppStore::new(backend).with_clock(Arc::new(move || now));
        store.load_all().await;
        let store = Mutex::new(store);

        assert_eq!(check_due_reminders(&store, false).await, 1);
        assert_eq!(check_due_reminders(&store, false).await, 0);
    }

    #[test]
    fn message_names_the_reminder() {
        let reminder = Reminder {
            id: 4,
            text: "Stretch".to_string(),
            trigger_at: Utc::now(),
            completed: false,
            notified: false,
        };

        assert_eq!(notification_message(&reminder), "Reminder: Stretch");
    }
}
