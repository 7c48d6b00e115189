use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

static STARTED_AT: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Pins the start time. Call once at startup, before serving requests.
pub fn mark_started() -> DateTime<Utc> {
    *STARTED_AT
}

pub fn uptime() -> Duration {
    (Utc::now() - *STARTED_AT).to_std().unwrap_or_default()
}

/// `H:MM:SS` with whole seconds; hours keep counting past a day.
pub fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
